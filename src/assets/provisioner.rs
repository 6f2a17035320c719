use crate::{
    assets::registry::{assets_of_kind, resolve_assets},
    config::Config,
    error::{PlayerError, Result},
    io::{
        crypto::verify_sha256,
        net::{download_with_progress, http_client},
        progress::{ConvertProgress, Reporter},
    },
    types::{AssetKind, AssetSpec},
};

use reqwest::blocking::Client;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct AssetHandle {
    pub spec: AssetSpec,
    pub local_path: PathBuf,
    pub downloaded: bool,
}

/// Where `spec` lives on disk. Checkpoints belong inside the relocated
/// engine package; everything else sits in the data directory.
pub fn asset_path(spec: &AssetSpec, data_dir: &Path, engine_dir: &Path) -> PathBuf {
    match spec.kind {
        AssetKind::Soundfont => data_dir.join(&spec.path),
        AssetKind::Checkpoint => engine_dir.join(&spec.path),
    }
}

/// A cached file counts as present when it exists and, if the asset pins a
/// digest, matches it. Never touches the network.
pub fn is_present(spec: &AssetSpec, dest: &Path) -> bool {
    if !dest.exists() {
        return false;
    }
    match &spec.sha256 {
        None => true,
        Some(sha) => match verify_sha256(dest, sha) {
            Ok(true) => true,
            _ => {
                warn!("Cached {} does not match its checksum", dest.display());
                false
            }
        },
    }
}

pub fn ensure_asset(
    client: &Client,
    spec: &AssetSpec,
    dest: &Path,
    reporter: &Reporter,
) -> Result<AssetHandle> {
    if is_present(spec, dest) {
        return Ok(AssetHandle {
            spec: spec.clone(),
            local_path: dest.to_path_buf(),
            downloaded: false,
        });
    }

    info!("⬇️ Downloading {}...", spec.description);

    let on_progress = |done: u64, total: u64| {
        reporter(ConvertProgress::Download {
            asset: spec.name.clone(),
            done,
            total,
        });
    };

    let verify = |part: &Path| -> Result<()> {
        if let Some(sha) = &spec.sha256 {
            if !verify_sha256(part, sha)? {
                return Err(PlayerError::Checksum {
                    path: dest.display().to_string(),
                });
            }
        }
        Ok(())
    };

    download_with_progress(client, &spec.url, dest, &on_progress, &verify).map_err(|e| match e {
        PlayerError::Checksum { .. } => e,
        other => PlayerError::Download {
            name: spec.description.clone(),
            reason: other.to_string(),
        },
    })?;

    Ok(AssetHandle {
        spec: spec.clone(),
        local_path: dest.to_path_buf(),
        downloaded: true,
    })
}

/// Fetches every registry asset of `kind` that is not cached yet.
pub fn ensure_assets(cfg: &Config, kind: AssetKind, reporter: &Reporter) -> Result<Vec<AssetHandle>> {
    let assets = resolve_assets(&cfg.assets)?;
    let data_dir = cfg.data_dir()?;
    let engine_dir = cfg.engine_dir()?;
    let client = http_client(&cfg.net)?;

    assets_of_kind(&assets, kind)
        .map(|spec| {
            let dest = asset_path(spec, &data_dir, &engine_dir);
            ensure_asset(&client, spec, &dest, reporter)
        })
        .collect()
}
