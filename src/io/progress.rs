use serde::Serialize;
use std::sync::Arc;

/// Pipeline step, in the order a conversion passes through them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Setup,
    ReadImage,
    Analyze,
    Synthesize,
    Transcode,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Setup => "Setting up AI Engine...",
            Stage::ReadImage => "Reading image...",
            Stage::Analyze => "Analyzing notes...",
            Stage::Synthesize => "Synthesizing audio...",
            Stage::Transcode => "Encoding MP3...",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvertProgress {
    Stage { stage: Stage, label: &'static str },
    Download { asset: String, done: u64, total: u64 },
    Finished { duration_secs: Option<f64> },
    Failed { message: String },
}

impl ConvertProgress {
    pub fn stage(stage: Stage) -> Self {
        ConvertProgress::Stage {
            stage,
            label: stage.label(),
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            ConvertProgress::Stage { .. } => "stage",
            ConvertProgress::Download { .. } => "download",
            ConvertProgress::Finished { .. } => "finished",
            ConvertProgress::Failed { .. } => "failed",
        }
    }
}

pub type Reporter = Arc<dyn Fn(ConvertProgress) + Send + Sync + 'static>;

pub fn silent() -> Reporter {
    Arc::new(|_| {})
}
