pub mod converter;
pub mod image;
pub mod notation;
pub mod synth;
pub mod transcode;
