use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use hound::WavWriter;
use symphonia::core::{
    formats::{FormatOptions, FormatReader},
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};
use symphonia::default::get_probe;
use tracing::debug;

use crate::types::AudioData;

/// Opens `path` with symphonia's default probe, using the extension as a hint.
fn open_format(path: &Path) -> Result<Box<dyn FormatReader>> {
    let file: File =
        File::open(path).with_context(|| format!("Failed to open audio file: {:?}", path))?;

    let mss: MediaSourceStream = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint: Hint = Hint::new();

    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    Ok(probed.format)
}

pub fn write_audio<P: AsRef<Path>>(path: P, audio: &AudioData) -> Result<()> {
    let spec = hound::WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path.as_ref(), spec)
        .with_context(|| format!("Failed to create WAV: {:?}", path.as_ref()))?;
    for sample in &audio.samples {
        let s = (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        writer.write_sample(s)?;
    }

    writer.finalize()?;
    Ok(())
}

/// Playback length in seconds. Uses the container's frame count when it has
/// one and otherwise sums packet durations; nothing is decoded.
pub fn probe_duration<P: AsRef<Path>>(path: P) -> Result<f64> {
    let path: &Path = path.as_ref();
    let mut format = open_format(path)?;
    let track = format.default_track().context("No default track found")?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let frames = match params.n_frames {
        Some(n) => n,
        None => {
            let mut total: u64 = 0;
            while let Ok(packet) = format.next_packet() {
                if packet.track_id() == track_id {
                    total += packet.dur();
                }
            }
            total
        }
    };

    let secs = match (params.time_base, params.sample_rate) {
        (Some(tb), _) => {
            let t = tb.calc_time(frames);
            t.seconds as f64 + t.frac
        }
        (None, Some(rate)) if rate > 0 => frames as f64 / rate as f64,
        _ => anyhow::bail!("no timing information in {}", path.display()),
    };

    debug!("🎧 Probed {}: {} frames, {:.2}s", path.display(), frames, secs);
    Ok(secs)
}

/// Interleaves two planar channels.
pub fn interleave(left: &[f32], right: &[f32]) -> Vec<f32> {
    left.iter()
        .zip(right)
        .flat_map(|(l, r)| [*l, *r])
        .collect()
}
