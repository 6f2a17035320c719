use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Where an asset lives once fetched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Relative to the data directory.
    Soundfont,
    /// Relative to the relocated engine package.
    Checkpoint,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssetSpec {
    pub name: String,
    pub description: String,
    pub kind: AssetKind,
    pub url: String,
    pub path: String,
    #[serde(default)]
    pub sha256: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ConvertResult {
    pub image_path: PathBuf,
    pub musicxml_path: PathBuf,
    pub midi_path: PathBuf,
    pub wav_path: PathBuf,
    pub mp3_path: PathBuf,
    pub duration_secs: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    Pdf,
    Png,
    Jpeg,
}
