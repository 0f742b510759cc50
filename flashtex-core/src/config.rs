//! Optional user configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.flashtex/
//!   config.yaml   (optional, every key has a default)
//! ```
//!
//! # API pattern
//!
//! - `load_at(home)`: explicit home; used in tests with `TempDir`
//! - `load()`: derives home from `dirs::home_dir()`, delegates to `load_at`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default AnkiConnect endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8765";
/// AnkiConnect protocol version sent with every request.
pub const DEFAULT_API_VERSION: u32 = 6;
/// Note model created on first run and used for every note.
pub const DEFAULT_MODEL_NAME: &str = "texgoanki";

/// Runtime configuration, threaded explicitly into the client and pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoint: String,
    pub api_version: u32,
    pub request_timeout_secs: u64,
    pub model_name: String,
    /// Parent directory of every per-render workspace.
    pub scratch_root: PathBuf,
    /// Upper bound for each external tool invocation.
    pub tool_timeout_secs: u64,
    /// Program that turns a source document into flashcard records (JSON on stdout).
    pub extractor: String,
    pub tools: ToolsConfig,
}

/// External toolchain programs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub compiler: String,
    pub converter: String,
    pub trimmer: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_version: DEFAULT_API_VERSION,
            request_timeout_secs: 30,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            scratch_root: default_scratch_root(),
            tool_timeout_secs: 60,
            extractor: "texflash".to_string(),
            tools: ToolsConfig::default(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            compiler: "latexmk".to_string(),
            converter: "pdf2svg".to_string(),
            trimmer: "inkscape".to_string(),
        }
    }
}

impl Config {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Workspaces live in RAM where a tmpfs is guaranteed.
#[cfg(target_os = "linux")]
fn default_scratch_root() -> PathBuf {
    PathBuf::from("/dev/shm/flashtex")
}

#[cfg(not(target_os = "linux"))]
fn default_scratch_root() -> PathBuf {
    std::env::temp_dir().join("flashtex")
}

/// `<home>/.flashtex/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".flashtex").join("config.yaml")
}

/// Load the config rooted at `home`.
///
/// Returns [`Config::default`] if the file does not exist.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&home()?)
}

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(home: &Path, yaml: &str) {
        let path = config_path_at(home);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, yaml).unwrap();
    }

    #[test]
    fn missing_file_yields_defaults() {
        let home = TempDir::new().unwrap();
        let config = load_at(home.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.tools.compiler, "latexmk");
    }

    #[test]
    fn empty_file_yields_defaults() {
        let home = TempDir::new().unwrap();
        write_config(home.path(), "\n");
        assert_eq!(load_at(home.path()).unwrap(), Config::default());
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let home = TempDir::new().unwrap();
        write_config(
            home.path(),
            "endpoint: http://127.0.0.1:9999\ntool_timeout_secs: 5\ntools:\n  trimmer: /opt/inkscape/bin/inkscape\n",
        );
        let config = load_at(home.path()).unwrap();
        assert_eq!(config.endpoint, "http://127.0.0.1:9999");
        assert_eq!(config.tool_timeout(), Duration::from_secs(5));
        assert_eq!(config.tools.trimmer, "/opt/inkscape/bin/inkscape");
        assert_eq!(config.tools.converter, "pdf2svg");
        assert_eq!(config.model_name, DEFAULT_MODEL_NAME);
    }

    #[test]
    fn malformed_file_returns_parse_error_with_path() {
        let home = TempDir::new().unwrap();
        write_config(home.path(), "endpoint: [unclosed");
        let err = load_at(home.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    fn home_not_found_error_message() {
        assert!(ConfigError::HomeNotFound.to_string().contains("home directory"));
    }
}
