//! Runtime configuration.
//!
//! Resolution order is built-in defaults, then an optional TOML file, then
//! `SHEET_PLAYER_*` environment variables.

use crate::{
    error::{PlayerError, Result},
    paths::default_data_dir,
};
use serde::Deserialize;
use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
};
use tracing::info;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub engine: EngineConfig,
    pub image: ImageConfig,
    pub audio: AudioConfig,
    pub net: NetConfig,
    pub assets: AssetsConfig,
    pub server: ServerConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Holds the soundfont, the relocated engine and the scratch directory.
    /// Falls back to the platform data dir when unset.
    pub data_dir: Option<PathBuf>,
    pub workspace: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            workspace: "temp_workspace".into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub python: String,
    pub package: String,
    pub module: String,
    pub local_dir: String,
    /// Skip the interpreter lookup and copy from here instead.
    pub source_dir: Option<PathBuf>,
    pub strip_tokens: Vec<String>,
    pub without_deskew: bool,
    pub use_tf: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            python: "python3".into(),
            package: "oemer".into(),
            module: "oemer.ete".into(),
            local_dir: "oemer_local".into(),
            source_dir: None,
            strip_tokens: vec!["CUDAExecutionProvider".into()],
            without_deskew: false,
            use_tf: false,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub pdf_dpi: u32,
    pub pdftoppm: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            pdf_dpi: 200,
            pdftoppm: "pdftoppm".into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub bitrate_kbps: u32,
    pub ffmpeg: String,
    pub download_name: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            bitrate_kbps: 128,
            ffmpeg: "ffmpeg".into(),
            download_name: "sheet_music.mp3".into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            timeout_secs: 60 * 60,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Asset name -> replacement URL.
    pub urls: HashMap<String, String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".into(),
            max_upload_mb: 50,
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => {
                let text = fs::read_to_string(p).map_err(|e| {
                    PlayerError::Config(format!("cannot read {}: {e}", p.display()))
                })?;
                let cfg = Self::from_toml(&text)?;
                info!("Loaded config from {}", p.display());
                cfg
            }
            None => Self::default(),
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| PlayerError::Config(e.to_string()))
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = env::var("SHEET_PLAYER_DATA_DIR") {
            self.paths.data_dir = Some(PathBuf::from(dir));
        }
        if let Ok(python) = env::var("SHEET_PLAYER_PYTHON") {
            self.engine.python = python;
        }
        if let Ok(bind) = env::var("SHEET_PLAYER_BIND") {
            self.server.bind = bind;
        }
        if let Ok(url) = env::var("SHEET_PLAYER_SOUNDFONT_URL") {
            self.assets.urls.insert("soundfont".into(), url);
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.paths.data_dir {
            Some(p) => Ok(p.clone()),
            None => default_data_dir(),
        }
    }

    pub fn workspace_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(&self.paths.workspace))
    }

    /// Directory put on the engine's module search path.
    pub fn engine_search_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(&self.engine.local_dir))
    }

    /// The relocated package itself, e.g. `oemer_local/oemer`.
    pub fn engine_dir(&self) -> Result<PathBuf> {
        Ok(self.engine_search_dir()?.join(&self.engine.package))
    }
}
