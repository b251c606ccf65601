//! Configuration loading from quarry.toml.

use std::path::Path;
use std::time::Duration;

use modules::HttpConfig;
use policy::Policy;
use runtime::DEFAULT_MAX_OPERATIONS;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub http: HttpSection,

    #[serde(default)]
    pub log: LogConfig,

    /// Capability policy (deny list).
    #[serde(flatten)]
    pub policy: Policy,
}

#[derive(Debug, Deserialize)]
pub struct EngineConfig {
    /// Reuse compiled rules while their inputs are unchanged.
    #[serde(default = "default_cache")]
    pub cache: bool,

    /// Operation budget per rule run. Zero disables the limit.
    #[serde(default = "default_max_operations")]
    pub max_operations: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache: default_cache(),
            max_operations: default_max_operations(),
        }
    }
}

fn default_cache() -> bool {
    true
}

fn default_max_operations() -> u64 {
    DEFAULT_MAX_OPERATIONS
}

#[derive(Debug, Default, Deserialize)]
pub struct HttpSection {
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

impl HttpSection {
    pub fn to_config(&self) -> HttpConfig {
        let defaults = HttpConfig::default();
        HttpConfig {
            timeout: self
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}
