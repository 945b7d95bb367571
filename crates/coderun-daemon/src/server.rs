//! Unix socket server

use crate::pool::ExecutionPool;
use coderun_core::protocol::{self, Request, Response};
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};

/// Accept connections until the listener fails, one task per connection
pub async fn run(listener: UnixListener, pool: Arc<ExecutionPool>) -> std::io::Result<()> {
    loop {
        let (stream, _) = listener.accept().await?;
        let pool = Arc::clone(&pool);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, pool).await {
                tracing::error!(error = %e, "connection error");
            }
        });
    }
}

/// Handle a single client connection
async fn handle_connection(mut stream: UnixStream, pool: Arc<ExecutionPool>) -> coderun_core::Result<()> {
    loop {
        let frame = match protocol::read_frame(&mut stream).await? {
            Some(frame) => frame,
            None => break, // Client disconnected
        };

        let response = match protocol::decode::<Request>(&frame) {
            Ok(request) => {
                tracing::debug!(?request, "received request");
                handle_request(request, &pool).await
            }
            Err(e) => {
                tracing::warn!(error = %e, "malformed request");
                Response::Error {
                    message: e.to_string(),
                }
            }
        };

        protocol::send(&mut stream, &response).await?;
    }

    Ok(())
}

/// Handle a single request
async fn handle_request(request: Request, pool: &ExecutionPool) -> Response {
    match request {
        Request::Execute(req) => Response::Execute(pool.execute(req).await),
        Request::Languages => Response::Languages {
            languages: pool.executor().languages().languages(),
        },
        Request::Status => Response::Status(pool.status()),
        Request::Ping => Response::Pong,
    }
}
