//! The end-to-end conversion: upload → RGB page → MusicXML → MIDI → WAV → MP3.

use crate::{
    assets::provisioner::ensure_assets,
    audio::probe_duration,
    config::Config,
    core::{
        image::{detect_kind, normalize_image, PdfRasterizer, Pdftoppm},
        notation::{Music21Renderer, ScoreRenderer},
        synth::{MidiSynth, SoundfontSynth},
        transcode::{FfmpegTranscoder, Transcoder},
    },
    error::{PlayerError, Result},
    io::progress::{silent, ConvertProgress, Reporter, Stage},
    omr::{discover_output, oemer::OemerEngine, relocate::relocate_package, OmrEngine, OmrOptions},
    types::{AssetKind, ConvertResult},
};

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{info, warn};

/// The external engines each stage delegates to.
#[derive(Clone)]
pub struct Toolchain {
    pub rasterizer: Arc<dyn PdfRasterizer>,
    pub omr: Arc<dyn OmrEngine>,
    pub renderer: Arc<dyn ScoreRenderer>,
    pub synth: Arc<dyn MidiSynth>,
    pub transcoder: Arc<dyn Transcoder>,
}

impl Toolchain {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(Self {
            rasterizer: Arc::new(Pdftoppm::new(&cfg.image.pdftoppm)),
            omr: Arc::new(OemerEngine::new(&cfg.engine, cfg.engine_search_dir()?)),
            renderer: Arc::new(Music21Renderer::new(&cfg.engine.python)),
            synth: Arc::new(SoundfontSynth::new(cfg.audio.sample_rate)),
            transcoder: Arc::new(FfmpegTranscoder::new(&cfg.audio.ffmpeg)),
        })
    }
}

#[derive(Clone)]
pub struct MusicConverter {
    config: Arc<Config>,
    tools: Toolchain,
    reporter: Reporter,
}

/// Empties the per-run scratch directory, creating it if needed.
pub fn reset_workspace(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

impl MusicConverter {
    pub fn new(config: Arc<Config>, tools: Toolchain) -> Self {
        Self {
            config,
            tools,
            reporter: silent(),
        }
    }

    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn stage(&self, stage: Stage) {
        info!("{}", stage.label());
        (self.reporter)(ConvertProgress::stage(stage));
    }

    /// Fetches missing assets and relocates the engine. Every step is skipped
    /// when its files are already on disk. Returns the soundfont path.
    pub fn setup_environment(&self) -> Result<PathBuf> {
        self.stage(Stage::Setup);
        let cfg = &*self.config;

        let soundfont = ensure_assets(cfg, AssetKind::Soundfont, &self.reporter)?
            .into_iter()
            .next()
            .map(|h| h.local_path)
            .ok_or_else(|| PlayerError::Registry("no soundfont in registry".into()))?;

        relocate_package(&cfg.engine, &cfg.engine_search_dir()?)?;
        ensure_assets(cfg, AssetKind::Checkpoint, &self.reporter)?;

        Ok(soundfont)
    }

    pub fn prepare_image(&self, bytes: &[u8], file_name: &str, workdir: &Path) -> Result<PathBuf> {
        self.stage(Stage::ReadImage);
        normalize_image(
            bytes,
            file_name,
            workdir,
            self.tools.rasterizer.as_ref(),
            self.config.image.pdf_dpi,
        )
    }

    pub fn run_omr(&self, image_path: &Path) -> Result<PathBuf> {
        self.stage(Stage::Analyze);
        let engine = &self.config.engine;
        let options = OmrOptions {
            output_dir: image_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            without_deskew: engine.without_deskew,
            use_tf: engine.use_tf,
        };
        self.tools.omr.recognize(image_path, options)?;
        discover_output(image_path)
    }

    /// MusicXML → MIDI → WAV → MP3, each next to `xml_path`.
    pub fn generate_audio(&self, xml_path: &Path, soundfont: &Path) -> Result<[PathBuf; 3]> {
        let midi_path = xml_path.with_extension("mid");
        let wav_path = xml_path.with_extension("wav");
        let mp3_path = xml_path.with_extension("mp3");

        self.stage(Stage::Synthesize);
        self.tools.renderer.render_midi(xml_path, &midi_path)?;

        if !soundfont.exists() {
            return Err(PlayerError::MissingSoundfont {
                path: soundfont.display().to_string(),
            });
        }
        self.tools.synth.synthesize(&midi_path, soundfont, &wav_path)?;

        self.stage(Stage::Transcode);
        self.tools
            .transcoder
            .transcode(&wav_path, &mp3_path, self.config.audio.bitrate_kbps)?;

        Ok([midi_path, wav_path, mp3_path])
    }

    /// Runs the whole pipeline for one upload. The scratch directory is wiped
    /// first, so callers must not run two conversions against the same
    /// config at once.
    pub fn convert(&self, bytes: &[u8], file_name: &str) -> Result<ConvertResult> {
        let result = self.convert_inner(bytes, file_name);
        match &result {
            Ok(res) => (self.reporter)(ConvertProgress::Finished {
                duration_secs: res.duration_secs,
            }),
            Err(e) => (self.reporter)(ConvertProgress::Failed {
                message: e.to_string(),
            }),
        }
        result
    }

    fn convert_inner(&self, bytes: &[u8], file_name: &str) -> Result<ConvertResult> {
        // Refuse unknown uploads before touching the workspace or the network.
        detect_kind(bytes, file_name)?;

        let workdir = self.config.workspace_dir()?;
        reset_workspace(&workdir)?;

        let soundfont = self.setup_environment()?;
        let image_path = self.prepare_image(bytes, file_name, &workdir)?;
        let musicxml_path = self.run_omr(&image_path)?;
        let [midi_path, wav_path, mp3_path] = self.generate_audio(&musicxml_path, &soundfont)?;

        let duration_secs = match probe_duration(&mp3_path) {
            Ok(d) => Some(d),
            Err(e) => {
                warn!("Could not read back {}: {e}", mp3_path.display());
                None
            }
        };

        Ok(ConvertResult {
            image_path,
            musicxml_path,
            midi_path,
            wav_path,
            mp3_path,
            duration_secs,
        })
    }
}
