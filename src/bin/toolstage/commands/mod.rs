//! Command implementations

pub mod build;
pub mod completions;
pub mod flags;
pub mod toolchain;

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::cli::GlobalArgs;
use toolstage::util::config::{global_settings_path, load_settings, Settings, SETTINGS_FILE};

/// Global settings merged with the project (or `--config`) settings.
pub fn settings(global: &GlobalArgs) -> Result<Settings> {
    let project = match &global.config {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("settings file not found: {}", path.display());
            }
            path.clone()
        }
        None => std::env::current_dir()
            .context("failed to get current directory")?
            .join(SETTINGS_FILE),
    };
    load_settings(global_settings_path().as_deref(), &project)
}

pub fn display_or_none(path: Option<PathBuf>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "not found".to_string())
}
