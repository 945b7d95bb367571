//! Execution configuration

use crate::{CoderunError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Limits and paths shared read-only by every pipeline invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Wall-clock limit applied to the compile phase and to the run phase
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Duration,

    /// Memory budget in bytes handed to run-command construction
    pub memory_limit: u64,

    /// Maximum captured output per stream, in characters
    pub max_output_size: usize,

    /// Parent directory of per-execution workspaces
    pub temp_root: PathBuf,

    /// How long to wait for the output drains after the child is gone
    #[serde(rename = "drain_grace_ms", with = "duration_ms")]
    pub drain_grace: Duration,

    /// Extra environment for every child process
    pub env: Vec<(String, String)>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            memory_limit: 256 * 1024 * 1024, // 256MB
            max_output_size: 64 * 1024,
            temp_root: std::env::temp_dir().join("coderun"),
            drain_grace: Duration::from_secs(1),
            env: vec![("LANG".into(), "en_US.UTF-8".into())],
        }
    }
}

impl ExecutionConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> ExecutionConfigBuilder {
        ExecutionConfigBuilder::default()
    }

    /// Apply `CODERUN_*` overrides from the process environment
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `CODERUN_*` overrides from an arbitrary lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ms) = lookup("CODERUN_TIMEOUT_MS") {
            self.timeout = Duration::from_millis(parse_number("CODERUN_TIMEOUT_MS", &ms)?);
        }
        if let Some(bytes) = lookup("CODERUN_MEMORY_LIMIT") {
            self.memory_limit = parse_number("CODERUN_MEMORY_LIMIT", &bytes)?;
        }
        if let Some(chars) = lookup("CODERUN_MAX_OUTPUT") {
            self.max_output_size = parse_number("CODERUN_MAX_OUTPUT", &chars)?;
        }
        if let Some(dir) = lookup("CODERUN_TEMP_DIR") {
            self.temp_root = PathBuf::from(dir);
        }
        Ok(self)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CoderunError::Config(format!("{key} is not a valid number: {value:?}")))
}

/// Builder for ExecutionConfig
#[derive(Debug, Default)]
pub struct ExecutionConfigBuilder {
    config: ExecutionConfig,
}

impl ExecutionConfigBuilder {
    #[must_use]
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.config.timeout = duration;
        self
    }

    #[must_use]
    pub fn timeout_ms(self, ms: u64) -> Self {
        self.timeout(Duration::from_millis(ms))
    }

    #[must_use]
    pub fn memory_limit(mut self, bytes: u64) -> Self {
        self.config.memory_limit = bytes;
        self
    }

    #[must_use]
    pub fn memory_limit_mb(self, mb: u64) -> Self {
        self.memory_limit(mb * 1024 * 1024)
    }

    #[must_use]
    pub fn max_output_size(mut self, chars: usize) -> Self {
        self.config.max_output_size = chars;
        self
    }

    #[must_use]
    pub fn temp_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.temp_root = path.into();
        self
    }

    #[must_use]
    pub fn drain_grace(mut self, duration: Duration) -> Self {
        self.config.drain_grace = duration;
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.env.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn build(self) -> ExecutionConfig {
        self.config
    }
}

/// Get default socket path from CODERUN_SOCKET env var or system default
///
/// Returns:
/// - `$CODERUN_SOCKET` if set (for development)
/// - `/run/coderun/coderun.sock` otherwise (production)
pub fn default_socket_path() -> PathBuf {
    std::env::var("CODERUN_SOCKET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/run/coderun/coderun.sock"))
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
