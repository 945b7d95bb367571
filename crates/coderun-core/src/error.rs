//! Error types for coderun-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoderunError {
    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("failed to create workspace: {0}")]
    WorkspaceCreation(#[source] std::io::Error),

    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("empty command line")]
    EmptyCommand,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<rmp_serde::encode::Error> for CoderunError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Self::Protocol(format!("failed to encode message: {e}"))
    }
}

impl From<rmp_serde::decode::Error> for CoderunError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Self::Protocol(format!("failed to decode message: {e}"))
    }
}
