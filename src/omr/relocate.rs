//! Writable, CPU-only copy of the OMR engine package.
//!
//! The installed package may sit on a read-only filesystem and lists the CUDA
//! execution provider, which fails on hosts without a GPU. We copy it under
//! the data directory, strip the provider from its sources, and point the
//! interpreter at the copy via `PYTHONPATH`.

use crate::{
    config::EngineConfig,
    error::{PlayerError, Result},
};
use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
    process::Command,
};
use tracing::{debug, info};
use walkdir::WalkDir;

const FIND_PACKAGE: &str = "import importlib.util, os, sys
s = importlib.util.find_spec(sys.argv[1])
print(os.path.dirname(s.origin) if s is not None and s.origin else '')";

/// Asks `python` where `package` is installed.
pub fn locate_package(python: &str, package: &str) -> Result<PathBuf> {
    let out = Command::new(python)
        .arg("-c")
        .arg(FIND_PACKAGE)
        .arg(package)
        .output()
        .map_err(|e| PlayerError::Tool {
            program: python.to_string(),
            reason: e.to_string(),
        })?;

    let dir = String::from_utf8_lossy(&out.stdout).trim().to_string();
    if !out.status.success() || dir.is_empty() {
        return Err(PlayerError::EngineNotInstalled(package.to_string()));
    }
    Ok(PathBuf::from(dir))
}

/// Removes every quoted occurrence of each token, trailing comma included.
pub fn strip_tokens(text: &str, tokens: &[String]) -> String {
    let mut out = text.to_string();
    for token in tokens {
        for form in [
            format!("'{token}',"),
            format!("\"{token}\","),
            format!("'{token}'"),
            format!("\"{token}\""),
        ] {
            out = out.replace(&form, "");
        }
    }
    out
}

/// Strips `tokens` from every `.py` file under `dir`. Returns the number of
/// files rewritten; a second pass over the same tree returns 0.
pub fn patch_tree(dir: &Path, tokens: &[String]) -> Result<usize> {
    let mut patched = 0;
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| anyhow::anyhow!(e))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |e| e != "py") {
            continue;
        }

        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                debug!("Skipping {}: {e}", path.display());
                continue;
            }
        };
        if !tokens.iter().any(|t| content.contains(t.as_str())) {
            continue;
        }

        let new_content = strip_tokens(&content, tokens);
        if new_content != content {
            info!("🔧 Patching GPU code in: {}", path.display());
            fs::write(path, new_content)?;
            patched += 1;
        }
    }
    Ok(patched)
}

/// Recursive copy that merges into an existing destination.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<u64> {
    let mut files = 0;
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| anyhow::anyhow!(e))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| anyhow::anyhow!(e))?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            files += 1;
        }
    }
    Ok(files)
}

/// Makes sure a patched copy of the engine package exists under
/// `search_dir` and returns its path.
///
/// A fresh copy is assembled in a staging directory and renamed into place,
/// so two first-time initializers racing on the same `search_dir` cannot
/// observe a half-copied package. The loser drops its staging copy.
pub fn relocate_package(cfg: &EngineConfig, search_dir: &Path) -> Result<PathBuf> {
    let target = search_dir.join(&cfg.package);

    if !target.exists() {
        let source = match &cfg.source_dir {
            Some(dir) => dir.clone(),
            None => locate_package(&cfg.python, &cfg.package)?,
        };
        if !source.is_dir() {
            return Err(PlayerError::EngineNotInstalled(cfg.package.clone()));
        }

        fs::create_dir_all(search_dir)?;
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(search_dir)?;
        let staged = staging.path().join(&cfg.package);

        let files = copy_tree(&source, &staged)?;
        patch_tree(&staged, &cfg.strip_tokens)?;

        match fs::rename(&staged, &target) {
            Ok(()) => info!(
                "Relocated {} ({files} files) from {} to {}",
                cfg.package,
                source.display(),
                target.display()
            ),
            Err(_) if target.exists() => {
                info!("{} already relocated by another run", cfg.package)
            }
            Err(e) => return Err(e.into()),
        }
    }

    patch_tree(&target, &cfg.strip_tokens)?;
    Ok(target)
}

/// `PYTHONPATH` value with `search_dir` ahead of anything inherited.
pub fn python_path(search_dir: &Path, inherited: Option<OsString>) -> Result<OsString> {
    let mut dirs = vec![search_dir.to_path_buf()];
    if let Some(existing) = inherited {
        dirs.extend(std::env::split_paths(&existing).filter(|p| p != search_dir));
    }
    std::env::join_paths(dirs).map_err(|e| anyhow::anyhow!(e).into())
}
