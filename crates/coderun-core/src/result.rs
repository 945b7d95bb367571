//! Process result types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exit code reported for a child the runner had to kill
pub const KILLED_EXIT_CODE: i32 = -1;

/// Result of one child process invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResult {
    /// Exit code of the process, or a negative value when killed by a signal
    pub exit_code: i32,

    /// Standard output, capped at the configured size
    pub stdout: String,

    /// Standard error, capped at the configured size
    pub stderr: String,

    /// Whether stdout was cut at the cap
    pub stdout_truncated: bool,

    /// Whether stderr was cut at the cap
    pub stderr_truncated: bool,

    /// Execution duration, from spawn to confirmed exit
    pub duration: Duration,

    /// Whether the process was killed due to timeout
    pub timed_out: bool,

    /// Whether stderr carries a known allocation-failure diagnostic
    pub resource_exceeded: bool,
}

impl Default for ProcessResult {
    fn default() -> Self {
        Self {
            exit_code: KILLED_EXIT_CODE,
            stdout: String::new(),
            stderr: String::new(),
            stdout_truncated: false,
            stderr_truncated: false,
            duration: Duration::ZERO,
            timed_out: false,
            resource_exceeded: false,
        }
    }
}
