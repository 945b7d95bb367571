//! Execution outcomes and their classification

use crate::ProcessResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Appended to output cut at the configured maximum
pub const TRUNCATION_MARKER: &str = "\n... (output truncated)";

pub const TIMEOUT_MESSAGE: &str = "Execution timed out. Your program exceeded the time limit.";
pub const COMPILE_TIMEOUT_MESSAGE: &str = "Compilation timed out";
pub const MEMORY_MESSAGE: &str = "Memory limit exceeded. Your program used too much memory.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Success,
    CompileError,
    RuntimeError,
    Timeout,
    ResourceExceeded,
    InternalError,
}

impl Status {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::CompileError => "COMPILE_ERROR",
            Self::RuntimeError => "RUNTIME_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::ResourceExceeded => "RESOURCE_EXCEEDED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final result of one execution request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    pub status: Status,
    pub output: String,
    pub error: String,
    pub execution_time_ms: u64,
}

impl ExecutionOutcome {
    fn new(status: Status, output: String, error: String, elapsed: Duration) -> Self {
        Self {
            status,
            output,
            error,
            execution_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn compile_error(stderr: String, elapsed: Duration) -> Self {
        Self::new(Status::CompileError, String::new(), stderr, elapsed)
    }

    pub fn compile_timeout(elapsed: Duration) -> Self {
        Self::new(
            Status::Timeout,
            String::new(),
            COMPILE_TIMEOUT_MESSAGE.to_string(),
            elapsed,
        )
    }

    /// Error outcome for requests that never produced a measurable run
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(Status::InternalError, String::new(), message.into(), Duration::ZERO)
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, Status::Success)
    }
}

/// Map a run-phase result to its outcome. Rules apply in order.
pub fn classify(result: ProcessResult, max_output: usize) -> ExecutionOutcome {
    let elapsed = result.duration;
    let output = truncate(result.stdout, result.stdout_truncated, max_output);

    if result.timed_out {
        ExecutionOutcome::new(Status::Timeout, output, TIMEOUT_MESSAGE.to_string(), elapsed)
    } else if result.resource_exceeded {
        ExecutionOutcome::new(
            Status::ResourceExceeded,
            output,
            MEMORY_MESSAGE.to_string(),
            elapsed,
        )
    } else if result.exit_code != 0 {
        ExecutionOutcome::new(Status::RuntimeError, output, result.stderr, elapsed)
    } else {
        ExecutionOutcome::new(Status::Success, output, String::new(), elapsed)
    }
}

/// Keep the first `max` characters and mark the cut.
///
/// `already_cut` records that the producer discarded text beyond the cap.
pub fn truncate(mut text: String, already_cut: bool, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text.truncate(cut),
        None if !already_cut => return text,
        None => {}
    }
    text.push_str(TRUNCATION_MARKER);
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(exit_code: i32) -> ProcessResult {
        ProcessResult {
            exit_code,
            stdout: "out\n".into(),
            stderr: "err\n".into(),
            duration: Duration::from_millis(42),
            ..ProcessResult::default()
        }
    }

    #[test]
    fn success() {
        let outcome = classify(result(0), 100);
        assert_eq!(outcome.status, Status::Success);
        assert_eq!(outcome.output, "out\n");
        assert_eq!(outcome.error, "");
        assert_eq!(outcome.execution_time_ms, 42);
    }

    #[test]
    fn nonzero_exit_is_runtime_error_with_stderr() {
        let outcome = classify(result(2), 100);
        assert_eq!(outcome.status, Status::RuntimeError);
        assert_eq!(outcome.output, "out\n");
        assert_eq!(outcome.error, "err\n");
    }

    #[test]
    fn timeout_wins_over_everything() {
        let mut r = result(-1);
        r.timed_out = true;
        r.resource_exceeded = true;
        let outcome = classify(r, 100);
        assert_eq!(outcome.status, Status::Timeout);
        assert_eq!(outcome.output, "out\n");
        assert_eq!(outcome.error, TIMEOUT_MESSAGE);
    }

    #[test]
    fn resource_wins_over_exit_code() {
        let mut r = result(1);
        r.resource_exceeded = true;
        let outcome = classify(r, 100);
        assert_eq!(outcome.status, Status::ResourceExceeded);
        assert_eq!(outcome.error, MEMORY_MESSAGE);
    }

    #[test]
    fn resource_flag_with_zero_exit_still_reported() {
        let mut r = result(0);
        r.resource_exceeded = true;
        assert_eq!(classify(r, 100).status, Status::ResourceExceeded);
    }

    #[test]
    fn truncate_keeps_exactly_max_chars() {
        let out = truncate("abcdef".into(), false, 4);
        assert_eq!(out, format!("abcd{TRUNCATION_MARKER}"));
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let out = truncate("日本語テキスト".into(), false, 3);
        assert_eq!(out, format!("日本語{TRUNCATION_MARKER}"));
        assert_eq!(truncate("日本語".into(), false, 3), "日本語");
    }

    #[test]
    fn truncate_marks_producer_cut() {
        assert_eq!(truncate("abcd".into(), true, 4), format!("abcd{TRUNCATION_MARKER}"));
        assert_eq!(truncate("abcd".into(), false, 4), "abcd");
    }

    #[test]
    fn runtime_error_stderr_is_verbatim() {
        let mut r = result(1);
        r.stderr = "x".repeat(500);
        let outcome = classify(r, 10);
        assert_eq!(outcome.error.len(), 500);
    }

    #[test]
    fn serializes_with_wire_names() {
        let outcome = ExecutionOutcome::internal_error("Unsupported language: cobol");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "INTERNAL_ERROR");
        assert_eq!(json["executionTimeMs"], 0);
        assert_eq!(json["output"], "");
        assert_eq!(json["error"], "Unsupported language: cobol");
    }

    #[test]
    fn compile_outcomes() {
        let err = ExecutionOutcome::compile_error("main.c:1: error".into(), Duration::from_millis(7));
        assert_eq!(err.status, Status::CompileError);
        assert_eq!(err.output, "");
        assert_eq!(err.execution_time_ms, 7);

        let timeout = ExecutionOutcome::compile_timeout(Duration::from_millis(500));
        assert_eq!(timeout.status, Status::Timeout);
        assert_eq!(timeout.error, COMPILE_TIMEOUT_MESSAGE);
    }
}
