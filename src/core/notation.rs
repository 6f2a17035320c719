use crate::error::{PlayerError, Result};
use std::{path::Path, process::Command};
use tracing::warn;

/// Renders a MusicXML score to a standard MIDI file.
pub trait ScoreRenderer: Send + Sync {
    fn render_midi(&self, musicxml: &Path, midi: &Path) -> Result<()>;
}

const MUSIC21_TO_MIDI: &str = "import sys
from music21 import converter
converter.parse(sys.argv[1]).write('midi', fp=sys.argv[2])";

/// music21 in a child interpreter.
pub struct Music21Renderer {
    python: String,
}

impl Music21Renderer {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }
}

impl ScoreRenderer for Music21Renderer {
    fn render_midi(&self, musicxml: &Path, midi: &Path) -> Result<()> {
        let output = Command::new(&self.python)
            .arg("-c")
            .arg(MUSIC21_TO_MIDI)
            .arg(musicxml)
            .arg(midi)
            .output();

        // Every failure reads the same to the user; keep the cause in the log.
        match output {
            Ok(out) if out.status.success() && midi.exists() => Ok(()),
            Ok(out) => {
                warn!(
                    "music21 failed on {}: {}",
                    musicxml.display(),
                    String::from_utf8_lossy(&out.stderr).trim()
                );
                Err(PlayerError::NotationParse)
            }
            Err(e) => {
                warn!("could not start {}: {e}", self.python);
                Err(PlayerError::NotationParse)
            }
        }
    }
}
