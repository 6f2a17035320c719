//! Soundfont and model checkpoints fetched on first use.

pub mod provisioner;
pub mod registry;
