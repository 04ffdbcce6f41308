//! `taproot.toml` loading and the process-wide `tracing` setup.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod logging;

pub use logging::{init_tracing, LogBuffer, LoggingConfig};

/// Environment variable that points at an explicit config file.
pub const TAPROOT_CONFIG_ENV_VAR: &str = "TAPROOT_CONFIG_PATH";

/// File names looked up in a root directory, in order.
const CONFIG_FILE_NAMES: [&str; 2] = ["taproot.toml", ".taproot.toml"];

/// Top-level configuration.
///
/// ```toml
/// [logging]
/// level = "info,taproot.roots=debug"
/// json = false
///
/// [statistics]
/// sandbox = false
/// period = "weekly"
/// state_file = "/home/me/.taproot/usage.statistics.xml"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaprootConfig {
    pub logging: LoggingConfig,
    pub statistics: StatisticsConfig,
}

/// `[statistics]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatisticsConfig {
    /// Sandbox (development) instance. Reporting starts disallowed.
    pub sandbox: bool,
    /// Internal build. Reporting starts disallowed.
    pub internal: bool,
    /// Initial send period: `daily`, `weekly` or `monthly`.
    pub period: Option<String>,
    pub state_file: Option<PathBuf>,
}

impl StatisticsConfig {
    /// Whether reporting is allowed before any persisted state is loaded.
    pub fn allowed_by_default(&self) -> bool {
        !self.sandbox && !self.internal
    }

    /// `state_file`, or `<tmp>/taproot/usage.statistics.xml` when unset.
    pub fn effective_state_file(&self) -> PathBuf {
        static FALLBACK: OnceLock<PathBuf> = OnceLock::new();
        match &self.state_file {
            Some(path) => path.clone(),
            None => FALLBACK
                .get_or_init(|| std::env::temp_dir().join("taproot").join("usage.statistics.xml"))
                .clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // Display renders a source excerpt; the message alone is enough.
        Self::Toml(err.message().to_owned())
    }
}

impl TaprootConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::load_from_str(&text),
            Err(source) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(ConfigError::from)
    }
}

/// Config file for `root`: `$TAPROOT_CONFIG_PATH` (relative paths resolve
/// against `root`), else the first existing file of `taproot.toml` and
/// `.taproot.toml`.
pub fn discover_config_path(root: &Path) -> Option<PathBuf> {
    let path = match std::env::var_os(TAPROOT_CONFIG_ENV_VAR) {
        Some(explicit) => root.join(explicit),
        None => CONFIG_FILE_NAMES
            .iter()
            .map(|name| root.join(name))
            .find(|candidate| candidate.is_file())?,
    };
    Some(std::fs::canonicalize(&path).unwrap_or(path))
}

/// Defaults and `None` when `root` has no config file.
pub fn load_for_root(root: &Path) -> Result<(TaprootConfig, Option<PathBuf>), ConfigError> {
    match discover_config_path(root) {
        Some(path) => Ok((TaprootConfig::load_from_path(&path)?, Some(path))),
        None => Ok((TaprootConfig::default(), None)),
    }
}
