use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "surveillance-card";

pub fn log_path() -> Result<PathBuf> {
    scoped_path("surveillance-card.log")
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating data directory {}", parent.display()))?;
    }
    Ok(())
}

fn data_root() -> Result<PathBuf> {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .context("unable to determine user data directory")
}

pub fn scoped_path(file: &str) -> Result<PathBuf> {
    Ok(data_root()?.join(APP_DIR).join(file))
}
