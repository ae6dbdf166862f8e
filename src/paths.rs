//! Path resolution for crmform
//!
//! # Environment Variables
//!
//! - `CRMFORM_CONFIG_DIR` - Override the config directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `CRMFORM_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/crmform` (if set)
//! 3. `~/.config/crmform`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "CRMFORM_CONFIG_DIR";

/// Default stack file, relative to the working directory
pub const DEFAULT_STACK_FILE: &str = "crmform.toml";

/// Default state file, relative to the working directory
pub const DEFAULT_STATE_FILE: &str = ".crmform/state.json";

/// Get the crmform config directory path
pub fn config_dir() -> Result<PathBuf> {
    resolve_config_dir(
        std::env::var(ENV_CONFIG_DIR).ok(),
        std::env::var("XDG_CONFIG_HOME").ok(),
        dirs::home_dir().as_deref(),
    )
}

fn resolve_config_dir(
    override_dir: Option<String>,
    xdg_config: Option<String>,
    home: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(dir) = override_dir.filter(|d| !d.is_empty()) {
        let path = expand(&dir);
        log::debug!("Using config dir from {}: {}", ENV_CONFIG_DIR, path.display());
        return Ok(path);
    }

    if let Some(xdg) = xdg_config.filter(|d| !d.is_empty()) {
        let path = PathBuf::from(xdg).join("crmform");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = home.context("Could not determine home directory")?;
    let path = home.join(".config").join("crmform");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the default config file path
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
