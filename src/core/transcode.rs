use crate::error::{PlayerError, Result};
use std::{ffi::OsString, path::Path, process::Command};
use tracing::debug;

pub trait Transcoder: Send + Sync {
    fn transcode(&self, wav: &Path, mp3: &Path, bitrate_kbps: u32) -> Result<()>;
}

/// `ffmpeg` with libmp3lame. Must be on `PATH` unless configured otherwise.
pub struct FfmpegTranscoder {
    program: String,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn args(wav: &Path, mp3: &Path, bitrate_kbps: u32) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-y".into(), "-loglevel".into(), "error".into(), "-i".into()];
        args.push(wav.as_os_str().to_os_string());
        args.extend(
            ["-vn", "-codec:a", "libmp3lame", "-b:a"]
                .into_iter()
                .map(OsString::from),
        );
        args.push(format!("{bitrate_kbps}k").into());
        args.push(mp3.as_os_str().to_os_string());
        args
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, wav: &Path, mp3: &Path, bitrate_kbps: u32) -> Result<()> {
        let args = Self::args(wav, mp3, bitrate_kbps);
        debug!("Running {} {:?}", self.program, args);

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| PlayerError::Tool {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(PlayerError::Transcode(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }
}
