use crate::error::{PlayerError, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub fn default_data_dir() -> Result<PathBuf> {
    let proj = ProjectDirs::from("dev", "SheetPlayer", "sheet-player")
        .ok_or(PlayerError::CacheDirUnavailable)?;
    Ok(PathBuf::from(proj.data_dir()))
}
