//! Daemon configuration

use anyhow::Context;
use coderun_core::ExecutionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Path to Unix socket
    pub socket_path: PathBuf,

    /// Executions allowed to run at the same time
    pub max_concurrent: usize,

    /// Limits applied to every execution
    pub execution: ExecutionConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: coderun_core::config::default_socket_path(),
            max_concurrent: 4,
            execution: ExecutionConfig::default(),
        }
    }
}

impl DaemonConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text).context("could not parse TOML")?;
        anyhow::ensure!(config.max_concurrent > 0, "max_concurrent must be at least 1");
        Ok(config)
    }

    /// Load from `path` when given, then apply `CODERUN_*` environment overrides
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("could not read {}", path.display()))?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        config.execution = config.execution.with_env_overrides()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = DaemonConfig::from_toml(
            r#"
socket_path = "/tmp/coderun-test.sock"
max_concurrent = 8

[execution]
timeout_ms = 5000
max_output_size = 1024
env = [["LANG", "C.UTF-8"]]
"#,
        )
        .unwrap();

        assert_eq!(config.socket_path, PathBuf::from("/tmp/coderun-test.sock"));
        assert_eq!(config.max_concurrent, 8);
        assert_eq!(config.execution.timeout, Duration::from_secs(5));
        assert_eq!(config.execution.max_output_size, 1024);
        assert_eq!(config.execution.env, vec![("LANG".to_string(), "C.UTF-8".to_string())]);
        assert_eq!(config.execution.memory_limit, ExecutionConfig::default().memory_limit);
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(DaemonConfig::from_toml("").unwrap(), DaemonConfig::default());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        assert!(DaemonConfig::from_toml("max_concurrent = 0").is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coderun.toml");
        std::fs::write(&path, "max_concurrent = 2\n").unwrap();

        let config = DaemonConfig::load(Some(&path)).unwrap();
        assert_eq!(config.max_concurrent, 2);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = DaemonConfig::load(Some(Path::new("/nonexistent/coderun.toml"))).unwrap_err();
        assert!(err.to_string().contains("could not read"));
    }
}
