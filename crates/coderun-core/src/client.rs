//! Client for the coderun daemon

use crate::language::LanguageInfo;
use crate::outcome::ExecutionOutcome;
use crate::pipeline::ExecutionRequest;
use crate::protocol::{self, DaemonStatus, Request, Response};
use crate::{CoderunError, Result};
use std::path::Path;
use tokio::net::UnixStream;

#[derive(Debug)]
pub struct Client {
    stream: UnixStream,
}

impl Client {
    pub async fn connect(socket: impl AsRef<Path>) -> Result<Self> {
        let socket = socket.as_ref();
        let stream = UnixStream::connect(socket).await?;
        tracing::debug!(socket = %socket.display(), "connected to daemon");
        Ok(Self { stream })
    }

    /// Send one request and wait for its response
    pub async fn request(&mut self, request: &Request) -> Result<Response> {
        protocol::send(&mut self.stream, request).await?;
        protocol::recv(&mut self.stream)
            .await?
            .ok_or_else(|| CoderunError::Protocol("daemon closed the connection".into()))
    }

    pub async fn execute(&mut self, request: ExecutionRequest) -> Result<ExecutionOutcome> {
        match self.request(&Request::Execute(request)).await? {
            Response::Execute(outcome) => Ok(outcome),
            other => Err(unexpected(other)),
        }
    }

    pub async fn languages(&mut self) -> Result<Vec<LanguageInfo>> {
        match self.request(&Request::Languages).await? {
            Response::Languages { languages } => Ok(languages),
            other => Err(unexpected(other)),
        }
    }

    pub async fn status(&mut self) -> Result<DaemonStatus> {
        match self.request(&Request::Status).await? {
            Response::Status(status) => Ok(status),
            other => Err(unexpected(other)),
        }
    }

    pub async fn ping(&mut self) -> Result<()> {
        match self.request(&Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(response: Response) -> CoderunError {
    match response {
        Response::Error { message } => CoderunError::Protocol(message),
        other => CoderunError::Protocol(format!("unexpected response: {other:?}")),
    }
}
