//! # coderun-core
//!
//! Runs untrusted source code in any supported language and classifies the
//! result.
//!
//! This crate provides the execution pipeline and its parts:
//! - Language profile table with per-language compile/run templates
//! - Private temporary workspaces, removed on every exit path
//! - Process runner with timeout, process-group kill and capped output drains
//! - Outcome classification and output truncation
//! - Length-prefixed MessagePack protocol and a client for the daemon
//!
//! No OS-level sandboxing is applied: children run with the privileges of
//! the calling process. Memory exhaustion is detected heuristically from
//! stderr, not enforced.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod entry;
pub mod error;
pub mod language;
pub mod outcome;
pub mod pipeline;
pub mod protocol;
pub mod result;
pub mod runner;
pub mod workspace;

pub use config::ExecutionConfig;
pub use error::CoderunError;
pub use language::{LanguageProfile, LanguageTable};
pub use outcome::{ExecutionOutcome, Status};
pub use pipeline::{ExecutionRequest, Executor};
pub use result::ProcessResult;

/// Crate-level result type
pub type Result<T> = std::result::Result<T, CoderunError>;
