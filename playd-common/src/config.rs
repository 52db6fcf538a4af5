//! Configuration file resolution and loading

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "PLAYD_CONFIG";

/// System-wide config file consulted after the per-user one
pub const SYSTEM_CONFIG_PATH: &str = "/etc/playd/config.toml";

/// Config file resolution, highest priority first:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. `~/.config/playd/config.toml` (if it exists)
/// 4. `/etc/playd/config.toml` (if it exists)
///
/// Returns `None` when no file is named and none of the defaults exist.
/// An explicitly named file is returned even if it does not exist, so that
/// the caller can report it.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: per-user config
    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    // Priority 4: system config
    let system_config = PathBuf::from(SYSTEM_CONFIG_PATH);
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

/// `~/.config/playd/config.toml` on Linux, the platform equivalent elsewhere
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("playd").join("config.toml"))
}

/// Parse a TOML config file into `T`
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Load `T` from `path`, or fall back to `T::default()` with a warning when
/// the file is missing. A file that exists but fails to parse is an error.
pub fn load_or_default<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    match path {
        Some(path) if path.exists() => {
            debug!("Loading configuration from {}", path.display());
            load_toml(path)
        }
        Some(path) => {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            Ok(T::default())
        }
        None => {
            warn!("No config file found, using built-in defaults");
            Ok(T::default())
        }
    }
}
