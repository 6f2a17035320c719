//! Optical music recognition: relocating the engine package and driving it.

pub mod oemer;
pub mod relocate;

use crate::error::{PlayerError, Result};
use std::path::{Path, PathBuf};

/// Options handed to the engine for a single run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OmrOptions {
    pub output_dir: PathBuf,
    pub without_deskew: bool,
    pub use_tf: bool,
}

pub trait OmrEngine: Send + Sync {
    /// Analyzes `image`, writing a MusicXML file somewhere under
    /// `options.output_dir`. Locating that file is [`discover_output`]'s job.
    fn recognize(&self, image: &Path, options: OmrOptions) -> Result<()>;
}

/// Output names the engine is known to produce, in probe order.
pub fn candidate_outputs(image: &Path) -> [PathBuf; 2] {
    let mut appended = image.as_os_str().to_os_string();
    appended.push(".musicxml");
    [PathBuf::from(appended), image.with_extension("musicxml")]
}

pub fn discover_output(image: &Path) -> Result<PathBuf> {
    candidate_outputs(image)
        .into_iter()
        .find(|p| p.exists())
        .ok_or(PlayerError::NoSymbolicOutput)
}
