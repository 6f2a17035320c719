use crate::{
    config::AssetsConfig,
    error::{PlayerError, Result},
    types::{AssetKind, AssetSpec},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Registry {
    pub assets: Vec<AssetSpec>,
}

const REGISTRY_JSON: &str = include_str!("../../assets/registry.json");

pub fn load_registry() -> Result<Registry> {
    let reg: Registry = serde_json::from_str(REGISTRY_JSON)?;
    Ok(reg)
}

/// Registry entries with any configured URL overrides applied.
pub fn resolve_assets(cfg: &AssetsConfig) -> Result<Vec<AssetSpec>> {
    let mut assets = load_registry()?.assets;

    for (name, url) in &cfg.urls {
        let entry = assets
            .iter_mut()
            .find(|a| &a.name == name)
            .ok_or_else(|| PlayerError::Registry(format!("Asset `{name}` not found in registry")))?;
        entry.url = url.clone();
        // A replaced URL invalidates any pinned digest.
        entry.sha256 = None;
    }

    Ok(assets)
}

pub fn find_asset<'a>(assets: &'a [AssetSpec], name: &str) -> Result<&'a AssetSpec> {
    assets
        .iter()
        .find(|a| a.name == name)
        .ok_or_else(|| PlayerError::Registry(format!("Asset `{name}` not found in registry")))
}

pub fn assets_of_kind(assets: &[AssetSpec], kind: AssetKind) -> impl Iterator<Item = &AssetSpec> {
    assets.iter().filter(move |a| a.kind == kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_registry_has_soundfont_and_two_checkpoints() {
        let assets = load_registry().unwrap().assets;
        assert_eq!(assets_of_kind(&assets, AssetKind::Soundfont).count(), 1);

        let ckpts: Vec<_> = assets_of_kind(&assets, AssetKind::Checkpoint)
            .map(|a| a.path.as_str())
            .collect();
        assert_eq!(
            ckpts,
            vec!["checkpoints/unet_big/model.onnx", "checkpoints/seg_net/model.onnx"]
        );
    }

    #[test]
    fn url_override_replaces_url() {
        let mut cfg = AssetsConfig::default();
        cfg.urls
            .insert("soundfont".into(), "http://127.0.0.1/sf.sf2".into());
        let assets = resolve_assets(&cfg).unwrap();
        let sf = find_asset(&assets, "soundfont").unwrap();
        assert_eq!(sf.url, "http://127.0.0.1/sf.sf2");
        assert!(sf.sha256.is_none());
    }

    #[test]
    fn unknown_override_is_rejected() {
        let mut cfg = AssetsConfig::default();
        cfg.urls.insert("nope".into(), "http://127.0.0.1/x".into());
        match resolve_assets(&cfg) {
            Err(PlayerError::Registry(msg)) => assert!(msg.contains("nope")),
            other => panic!("expected registry error, got {other:?}"),
        }
    }
}
