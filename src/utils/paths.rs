//! Cross-Platform Path Utilities
//!
//! Resolves where the auditor looks for its configuration.

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Name of the per-user application directory.
const APP_DIR_NAME: &str = "contract-auditor";

/// Get the per-user configuration directory (`<config_dir>/contract-auditor/`)
pub fn app_config_dir() -> AppResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| AppError::config("Could not determine user config directory"))
}

/// Get the default config file path (`<config_dir>/contract-auditor/config.toml`)
pub fn default_config_path() -> AppResult<PathBuf> {
    Ok(app_config_dir()?.join("config.toml"))
}

/// Artifact name for a source file: its stem, falling back to the full file name.
pub fn artifact_name(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
