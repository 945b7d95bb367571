//! Wire protocol for daemon communication
//!
//! Every message is a MessagePack document preceded by its length as a
//! 4-byte big-endian integer.

use crate::language::LanguageInfo;
use crate::outcome::ExecutionOutcome;
use crate::pipeline::ExecutionRequest;
use crate::{CoderunError, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest frame accepted in either direction
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Request types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Compile and run code
    Execute(ExecutionRequest),
    /// List supported languages
    Languages,
    /// Get daemon status
    Status,
    /// Ping
    Ping,
}

/// Response types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Classified execution result
    Execute(ExecutionOutcome),
    /// Supported languages in table order
    Languages { languages: Vec<LanguageInfo> },
    /// Daemon status
    Status(DaemonStatus),
    /// Pong
    Pong,
    /// Error
    Error { message: String },
}

/// Load snapshot of a running daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Maximum concurrent executions
    pub capacity: usize,
    /// Executions currently running
    pub active: usize,
    /// Executions finished since start
    pub completed: u64,
}

/// Encode a message to msgpack
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(msg)?)
}

/// Decode a message from msgpack
pub fn decode<'a, T: Deserialize<'a>>(data: &'a [u8]) -> Result<T> {
    Ok(rmp_serde::from_slice(data)?)
}

/// Read one length-prefixed frame; `Ok(None)` on clean EOF before the prefix
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(CoderunError::Protocol(format!("frame too large: {len} bytes")));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(Some(buf))
}

/// Write one length-prefixed frame
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(CoderunError::Protocol(format!(
            "frame too large: {} bytes",
            payload.len()
        )));
    }
    // Bounded by MAX_FRAME_LEN above.
    #[allow(clippy::cast_possible_truncation)]
    let len = (payload.len() as u32).to_be_bytes();
    writer.write_all(&len).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Encode and send one message
pub async fn send<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    write_frame(writer, &encode(msg)?).await
}

/// Receive and decode one message; `Ok(None)` on clean EOF
pub async fn recv<R, T>(reader: &mut R) -> Result<Option<T>>
where
    R: AsyncRead + Unpin,
    T: for<'de> Deserialize<'de>,
{
    match read_frame(reader).await? {
        Some(frame) => Ok(Some(decode(&frame)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Status;

    #[tokio::test]
    async fn request_survives_framing() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let req = Request::Execute(ExecutionRequest::new("python", "print(1)").with_stdin("7"));

        send(&mut a, &req).await.unwrap();
        send(&mut a, &Request::Ping).await.unwrap();
        drop(a);

        let got: Request = recv(&mut b).await.unwrap().unwrap();
        assert_eq!(got, req);
        let got: Request = recv(&mut b).await.unwrap().unwrap();
        assert_eq!(got, Request::Ping);
        let eof: Option<Request> = recv(&mut b).await.unwrap();
        assert!(eof.is_none());
    }

    #[tokio::test]
    async fn execute_response_keeps_outcome() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let outcome = ExecutionOutcome::internal_error("Unsupported language: cobol");

        send(&mut a, &Response::Execute(outcome.clone())).await.unwrap();

        let got: Response = recv(&mut b).await.unwrap().unwrap();
        match got {
            Response::Execute(o) => {
                assert_eq!(o, outcome);
                assert_eq!(o.status, Status::InternalError);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        let len = u32::try_from(MAX_FRAME_LEN + 1).unwrap().to_be_bytes();
        a.write_all(&len).await.unwrap();

        let err = read_frame(&mut b).await.unwrap_err();
        assert!(matches!(err, CoderunError::Protocol(_)));
    }

    #[tokio::test]
    async fn truncated_frame_is_an_error() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&10u32.to_be_bytes()).await.unwrap();
        a.write_all(b"abc").await.unwrap();
        drop(a);

        assert!(read_frame(&mut b).await.is_err());
    }

    #[test]
    fn missing_stdin_defaults_to_empty() {
        #[derive(Serialize)]
        struct Bare<'a> {
            language: &'a str,
            code: &'a str,
        }
        let bytes = encode(&Bare { language: "bash", code: "echo hi" }).unwrap();
        let req: ExecutionRequest = decode(&bytes).unwrap();
        assert_eq!(req.stdin, "");
    }
}
