//! Configuration for opening a [`Database`](crate::Database).

use std::path::Path;
use std::time::Duration;

use common::StorageConfig;
use serde::{Deserialize, Serialize};

use crate::codec::NumericPolicy;
use crate::error::{Error, Result};
use crate::keys::DEFAULT_ROOT;

/// Configuration for opening a [`Database`](crate::Database).
///
/// ```toml
/// root = "crm"
/// database = "sf-auth"
/// op_timeout = "10s"
/// numeric_policy = "strict"
///
/// [storage]
/// type = "InMemory"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// First segment of every key.
    #[serde(default = "default_root")]
    pub root: String,

    /// Database name, the second key segment.
    pub database: String,

    /// Upper bound on a single store round trip.
    #[serde(with = "humantime_serde", default = "default_op_timeout")]
    pub op_timeout: Duration,

    /// How malformed numeric fields are handled when decoding records.
    #[serde(default)]
    pub numeric_policy: NumericPolicy,
}

fn default_root() -> String {
    DEFAULT_ROOT.to_string()
}

fn default_op_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            root: default_root(),
            database: "sf-auth".to_string(),
            op_timeout: default_op_timeout(),
            numeric_policy: NumericPolicy::default(),
        }
    }
}

impl Config {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::InvalidInput(format!("invalid config: {}", e)))
    }

    /// Reads and parses a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidInput(format!("failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }
}

/// Per-call overrides for collection operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationOptions {
    /// Overrides [`Config::op_timeout`] for this call.
    pub timeout: Option<Duration>,
}

impl OperationOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}
