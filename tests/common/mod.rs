#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use sheet_player::{
    assets::{provisioner::asset_path, registry::resolve_assets},
    audio::{interleave, write_audio},
    core::{
        image::PdfRasterizer, notation::ScoreRenderer, synth::MidiSynth, transcode::Transcoder,
    },
    AssetKind, AudioData, Config, OmrEngine, OmrOptions, PlayerError, Result, Toolchain,
};
use std::{
    fs,
    io::Cursor,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tempfile::TempDir;

pub const PACKAGE_INIT: &str = "providers = ['CUDAExecutionProvider', 'CPUExecutionProvider']\n";

#[derive(Default)]
pub struct FakeOmr {
    pub produce: bool,
    pub calls: AtomicUsize,
}

impl OmrEngine for FakeOmr {
    fn recognize(&self, image: &Path, options: OmrOptions) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(Some(options.output_dir.as_path()), image.parent());
        if self.produce {
            let mut out = image.as_os_str().to_os_string();
            out.push(".musicxml");
            fs::write(out, "<score-partwise version=\"3.1\"/>")?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRenderer {
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl ScoreRenderer for FakeRenderer {
    fn render_midi(&self, _musicxml: &Path, midi: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PlayerError::NotationParse);
        }
        fs::write(midi, b"MThd\x00\x00\x00\x06\x00\x00\x00\x01\x01\xe0")?;
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSynth {
    pub calls: AtomicUsize,
}

impl MidiSynth for FakeSynth {
    fn synthesize(&self, _midi: &Path, _soundfont: &Path, wav: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let left: Vec<f32> = (0..4_000).map(|i| (i as f32 * 0.06).sin() * 0.2).collect();
        write_audio(
            wav,
            &AudioData {
                samples: interleave(&left, &left),
                sample_rate: 16_000,
                channels: 2,
            },
        )?;
        Ok(())
    }
}

/// Stands in for an encoder by copying the WAV bytes.
#[derive(Default)]
pub struct CopyTranscoder {
    pub bitrates: std::sync::Mutex<Vec<u32>>,
}

impl Transcoder for CopyTranscoder {
    fn transcode(&self, wav: &Path, mp3: &Path, bitrate_kbps: u32) -> Result<()> {
        if let Ok(mut b) = self.bitrates.lock() {
            b.push(bitrate_kbps);
        }
        fs::copy(wav, mp3)?;
        Ok(())
    }
}

/// Returns a fixed page and records every request.
pub struct FakeRasterizer {
    pub page: DynamicImage,
    pub requests: std::sync::Mutex<Vec<(PathBuf, u32)>>,
}

impl FakeRasterizer {
    pub fn new(page: DynamicImage) -> Self {
        Self {
            page,
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }
}

impl PdfRasterizer for FakeRasterizer {
    fn rasterize_first_page(&self, pdf: &Path, dpi: u32) -> Result<DynamicImage> {
        self.requests.lock().unwrap().push((pdf.to_path_buf(), dpi));
        Ok(self.page.clone())
    }
}

pub fn rgba_page() -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 12, Rgba([255, 255, 255, 128])))
}

pub fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

pub fn minimal_pdf() -> Vec<u8> {
    b"%PDF-1.4\n1 0 obj<</Type/Catalog>>endobj\ntrailer<</Root 1 0 R>>\n%%EOF\n".to_vec()
}

/// Writes a fake installed engine package, checkpoints included.
pub fn fake_package(root: &Path, config: &Config) -> PathBuf {
    let pkg = root.join("site-packages").join(&config.engine.package);
    fs::create_dir_all(pkg.join("inference")).unwrap();
    fs::write(pkg.join("__init__.py"), PACKAGE_INIT).unwrap();
    fs::write(
        pkg.join("inference").join("session.py"),
        "sess = ort.InferenceSession(p, providers=[\"CUDAExecutionProvider\",\"CPUExecutionProvider\"])\n",
    )
    .unwrap();
    fs::write(pkg.join("README.md"), "Uses 'CUDAExecutionProvider' when available.\n").unwrap();

    let assets = resolve_assets(&config.assets).unwrap();
    for spec in assets.iter().filter(|a| a.kind == AssetKind::Checkpoint) {
        let p = asset_path(spec, Path::new("/unused"), &pkg);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, b"onnx").unwrap();
    }
    pkg
}

pub struct Fixture {
    pub dir: TempDir,
    pub config: Arc<Config>,
    pub omr: Arc<FakeOmr>,
    pub renderer: Arc<FakeRenderer>,
    pub synth: Arc<FakeSynth>,
    pub transcoder: Arc<CopyTranscoder>,
    pub rasterizer: Arc<FakeRasterizer>,
}

impl Fixture {
    pub fn tools(&self) -> Toolchain {
        Toolchain {
            rasterizer: self.rasterizer.clone(),
            omr: self.omr.clone(),
            renderer: self.renderer.clone(),
            synth: self.synth.clone(),
            transcoder: self.transcoder.clone(),
        }
    }

    pub fn workspace(&self) -> PathBuf {
        self.config.workspace_dir().unwrap()
    }
}

/// Config whose every asset is already on disk and whose URLs point at a
/// closed port, so any download attempt fails loudly.
pub fn fixture(omr_produces: bool, renderer_fails: bool) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.paths.data_dir = Some(dir.path().join("data"));
    for name in ["soundfont", "unet_big", "seg_net"] {
        config
            .assets
            .urls
            .insert(name.into(), "http://127.0.0.1:9/never".into());
    }

    config.engine.source_dir = Some(fake_package(dir.path(), &config));

    let assets = resolve_assets(&config.assets).unwrap();
    for spec in assets.iter().filter(|a| a.kind == AssetKind::Soundfont) {
        let p = asset_path(spec, &config.data_dir().unwrap(), Path::new("/unused"));
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, b"sf2").unwrap();
    }

    Fixture {
        dir,
        config: Arc::new(config),
        omr: Arc::new(FakeOmr {
            produce: omr_produces,
            ..Default::default()
        }),
        renderer: Arc::new(FakeRenderer {
            fail: renderer_fails,
            ..Default::default()
        }),
        synth: Arc::new(FakeSynth::default()),
        transcoder: Arc::new(CopyTranscoder::default()),
        rasterizer: Arc::new(FakeRasterizer::new(rgba_page())),
    }
}
