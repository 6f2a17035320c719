use crate::{
    audio::{interleave, write_audio},
    error::{PlayerError, Result},
    types::AudioData,
};
use rustysynth::{MidiFile, MidiFileSequencer, SoundFont, Synthesizer, SynthesizerSettings};
use std::{fs::File, path::Path, sync::Arc};
use tracing::info;

/// Rendered past the last MIDI event so releases can ring out.
const TAIL_SECS: f64 = 1.0;

pub trait MidiSynth: Send + Sync {
    fn synthesize(&self, midi: &Path, soundfont: &Path, wav: &Path) -> Result<()>;
}

/// In-process SF2 playback via rustysynth.
pub struct SoundfontSynth {
    sample_rate: u32,
}

impl SoundfontSynth {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl MidiSynth for SoundfontSynth {
    fn synthesize(&self, midi: &Path, soundfont: &Path, wav: &Path) -> Result<()> {
        if !soundfont.exists() {
            return Err(PlayerError::MissingSoundfont {
                path: soundfont.display().to_string(),
            });
        }

        let mut sf2 = File::open(soundfont)?;
        let sound_font = Arc::new(
            SoundFont::new(&mut sf2)
                .map_err(|e| PlayerError::Synthesis(format!("loading soundfont: {e:?}")))?,
        );

        let mut mid = File::open(midi)?;
        let midi_file = Arc::new(
            MidiFile::new(&mut mid)
                .map_err(|e| PlayerError::Synthesis(format!("reading MIDI: {e:?}")))?,
        );

        let settings = SynthesizerSettings::new(self.sample_rate as i32);
        let synthesizer = Synthesizer::new(&sound_font, &settings)
            .map_err(|e| PlayerError::Synthesis(format!("{e:?}")))?;
        let mut sequencer = MidiFileSequencer::new(synthesizer);
        sequencer.play(&midi_file, false);

        let seconds = midi_file.get_length() + TAIL_SECS;
        let frames = (self.sample_rate as f64 * seconds) as usize;
        let mut left = vec![0f32; frames];
        let mut right = vec![0f32; frames];
        sequencer.render(&mut left[..], &mut right[..]);

        info!(
            "Synthesized {:.1}s of audio from {}",
            seconds,
            midi.display()
        );

        write_audio(
            wav,
            &AudioData {
                samples: interleave(&left, &right),
                sample_rate: self.sample_rate,
                channels: 2,
            },
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_soundfont_fails_before_reading_midi() {
        let dir = tempfile::tempdir().unwrap();
        let err = SoundfontSynth::new(44_100)
            .synthesize(
                &dir.path().join("absent.mid"),
                &dir.path().join("absent.sf2"),
                &dir.path().join("out.wav"),
            )
            .unwrap_err();
        assert!(matches!(err, PlayerError::MissingSoundfont { .. }));
        assert!(!dir.path().join("out.wav").exists());
    }

    #[test]
    fn corrupt_soundfont_is_a_synthesis_error() {
        let dir = tempfile::tempdir().unwrap();
        let sf = dir.path().join("bad.sf2");
        std::fs::write(&sf, b"not a riff file").unwrap();
        let err = SoundfontSynth::new(44_100)
            .synthesize(&dir.path().join("x.mid"), &sf, &dir.path().join("out.wav"))
            .unwrap_err();
        assert!(matches!(err, PlayerError::Synthesis(_)), "got {err:?}");
    }
}
