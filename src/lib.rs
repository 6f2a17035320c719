//! # sheet-player
//!
//! Turns a PDF or photo of sheet music into an MP3: the page is normalized,
//! read by an optical music recognition engine, rendered to MIDI, played
//! through a soundfont and encoded. Recognition, notation parsing and
//! encoding are delegated to external engines; this crate stages files for
//! them, keeps their assets cached and serves the result over HTTP.

pub mod assets;
pub mod audio;
pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod omr;
pub mod paths;
pub mod server;
pub mod types;

pub use crate::{
    assets::provisioner::{ensure_asset, ensure_assets, AssetHandle},
    config::Config,
    core::converter::{reset_workspace, MusicConverter, Toolchain},
    error::{PlayerError, Result},
    io::progress::{ConvertProgress, Reporter, Stage},
    omr::{discover_output, OmrEngine, OmrOptions},
    types::{AssetKind, AssetSpec, AudioData, ConvertResult},
};
