use crate::{
    config::EngineConfig,
    error::{PlayerError, Result},
    omr::{relocate::python_path, OmrEngine, OmrOptions},
};
use std::{
    env,
    path::{Path, PathBuf},
    process::Command,
};
use tracing::{debug, info};

/// Runs the oemer end-to-end module in a child interpreter against the
/// relocated, CPU-only package copy.
pub struct OemerEngine {
    python: String,
    module: String,
    search_dir: PathBuf,
}

impl OemerEngine {
    pub fn new(cfg: &EngineConfig, search_dir: impl Into<PathBuf>) -> Self {
        Self {
            python: cfg.python.clone(),
            module: cfg.module.clone(),
            search_dir: search_dir.into(),
        }
    }

    pub fn command(&self, image: &Path, options: &OmrOptions) -> Result<Command> {
        let mut cmd = Command::new(&self.python);
        cmd.arg("-m")
            .arg(&self.module)
            .arg(image)
            .arg("-o")
            .arg(&options.output_dir);
        if options.without_deskew {
            cmd.arg("--without-deskew");
        }
        if options.use_tf {
            cmd.arg("--use-tf");
        }

        cmd.env(
            "PYTHONPATH",
            python_path(&self.search_dir, env::var_os("PYTHONPATH"))?,
        )
        .env("CUDA_VISIBLE_DEVICES", "-1")
        .env("ORT_TENSORRT_ENGINE_CACHE_ENABLE", "0");
        Ok(cmd)
    }
}

impl OmrEngine for OemerEngine {
    fn recognize(&self, image: &Path, options: OmrOptions) -> Result<()> {
        info!("🎵 Analyzing: {}", image.display());
        let mut cmd = self.command(image, &options)?;
        debug!("Running {:?}", cmd);

        let output = cmd.output().map_err(|e| PlayerError::Tool {
            program: self.python.clone(),
            reason: e.to_string(),
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("oemer stderr:\n{}", stderr);
        }

        if !output.status.success() {
            return Err(PlayerError::Omr(failure_message(&stderr, output.status.code())));
        }
        Ok(())
    }
}

/// Last non-empty stderr line, which for a Python traceback is the exception.
fn failure_message(stderr: &str, code: Option<i32>) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| match code {
            Some(c) => format!("exited with status {c}"),
            None => "terminated by signal".to_string(),
        })
}
