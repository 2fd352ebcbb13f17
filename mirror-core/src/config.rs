//! Config-file and argument loading.
//!
//! # Lookup order
//!
//! ```text
//! ./config.json                      (working directory)
//! <config_dir>/mirror/config.json    (platform config dir, via `dirs`)
//! ```
//!
//! # API pattern
//!
//! Lookup functions come in two forms:
//! - `fn_at(cwd: &Path, config_dir: Option<&Path>)` — explicit roots; used in tests
//! - `fn()` — derives both roots from the process environment, delegates to `_at`

use std::path::{Path, PathBuf};

use crate::error::{io_err, ConfigError};
use crate::types::SyncConfig;

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const APP_DIR_NAME: &str = "mirror";

/// Candidate config files, most specific first. Pure, no I/O.
pub fn default_config_paths_at(cwd: &Path, config_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = vec![cwd.join(CONFIG_FILE_NAME)];
    if let Some(dir) = config_dir {
        paths.push(dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME));
    }
    paths
}

/// Load the first existing default config file.
///
/// Returns `ConfigError::NotFound` naming the working-directory candidate
/// when none of them exist.
pub fn load_default_at(cwd: &Path, config_dir: Option<&Path>) -> Result<SyncConfig, ConfigError> {
    let candidates = default_config_paths_at(cwd, config_dir);
    match candidates.iter().find(|p| p.is_file()) {
        Some(path) => load_from_file(path),
        None => Err(ConfigError::NotFound {
            path: cwd.join(CONFIG_FILE_NAME),
        }),
    }
}

/// `load_default_at` using the current directory and `dirs::config_dir()`.
pub fn load_default() -> Result<SyncConfig, ConfigError> {
    let cwd = std::env::current_dir().map_err(|e| io_err(".", e))?;
    load_default_at(&cwd, dirs::config_dir().as_deref())
}

/// Load and validate a config file.
///
/// `.yaml` / `.yml` files are parsed as YAML, anything else as JSON.
pub fn load_from_file(path: &Path) -> Result<SyncConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;

    let config: SyncConfig = if is_yaml(path) {
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?
    };

    config.validate()?;
    Ok(config)
}

/// Build a config from the four positional command-line values.
pub fn from_args(
    source: &str,
    replica: &str,
    interval: &str,
    log_file: &str,
) -> Result<SyncConfig, ConfigError> {
    let interval_in_seconds = interval
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .ok_or_else(|| ConfigError::InvalidInterval {
            value: interval.to_string(),
        })?;

    let config = SyncConfig::new(source, replica, interval_in_seconds, log_file);
    config.validate()?;
    Ok(config)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}
