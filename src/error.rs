use thiserror::Error;

/// Central error type for the sheet-player crate.
#[derive(Debug, Error)]
pub enum PlayerError {
    // Generic fallback (wraps anyhow)
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),

    // Asset provisioning
    #[error("Failed to download {name}: {reason}")]
    Download { name: String, reason: String },

    #[error("Checksum mismatch for {path}")]
    Checksum { path: String },

    #[error("Data dir not available")]
    CacheDirUnavailable,

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Config error: {0}")]
    Config(String),

    // Engine setup and invocation
    #[error("{0} library not found.")]
    EngineNotInstalled(String),

    #[error("OMR Crash: {0}")]
    Omr(String),

    #[error("AI failed to generate MusicXML. Try a clearer image.")]
    NoSymbolicOutput,

    // Rendering
    #[error("Could not parse music notation.")]
    NotationParse,

    #[error("SoundFont not found: {path}")]
    MissingSoundfont { path: String },

    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    #[error("Transcoding failed: {0}")]
    Transcode(String),

    // Input handling
    #[error("Unsupported file type: {0}. Upload a PDF, PNG or JPG.")]
    UnsupportedInput(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Could not run `{program}`: {reason}")]
    Tool { program: String, reason: String },
}

// --- Implement From conversions for common errors ---
impl From<std::io::Error> for PlayerError {
    fn from(e: std::io::Error) -> Self {
        PlayerError::Anyhow(e.into())
    }
}

impl From<serde_json::Error> for PlayerError {
    fn from(e: serde_json::Error) -> Self {
        PlayerError::Anyhow(e.into())
    }
}

impl From<reqwest::Error> for PlayerError {
    fn from(e: reqwest::Error) -> Self {
        PlayerError::Anyhow(e.into())
    }
}

impl From<hex::FromHexError> for PlayerError {
    fn from(e: hex::FromHexError) -> Self {
        PlayerError::Anyhow(e.into())
    }
}

impl From<image::ImageError> for PlayerError {
    fn from(e: image::ImageError) -> Self {
        PlayerError::Image(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;
