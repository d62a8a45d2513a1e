// src/core/probe/banner.rs

use super::{io_outcome, within, Outcome};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// Upper bound on the bytes read from a service greeting.
pub const BANNER_BYTE_BUDGET: usize = 1024;

/// Connects, reads the service greeting and closes the connection.
///
/// Reading stops at the first newline, at EOF or once the byte budget is
/// spent. A greeting that is empty or not valid UTF-8 is a `ParseFailure`.
pub async fn grab_banner(host: &str, port: u16, budget: Duration) -> Outcome<String> {
    within(budget, async {
        let mut stream = match TcpStream::connect((host, port)).await {
            Ok(stream) => stream,
            Err(e) => {
                debug!(host, port, error = %e, "Banner connect failed.");
                return io_outcome(&e);
            }
        };

        let mut buf = Vec::with_capacity(BANNER_BYTE_BUDGET);
        let mut chunk = [0u8; 256];
        while buf.len() < BANNER_BYTE_BUDGET {
            let n = match stream.read(&mut chunk).await {
                Ok(n) => n,
                Err(e) => {
                    debug!(host, port, error = %e, "Banner read failed.");
                    return io_outcome(&e);
                }
            };
            if n == 0 {
                break;
            }
            let take = n.min(BANNER_BYTE_BUDGET - buf.len());
            buf.extend_from_slice(&chunk[..take]);
            if chunk[..take].contains(&b'\n') {
                break;
            }
        }
        let _ = stream.shutdown().await;

        match String::from_utf8(buf) {
            Ok(text) if !text.trim().is_empty() => Outcome::Success(text.trim().to_string()),
            Ok(_) => Outcome::ParseFailure,
            Err(_) => {
                debug!(host, port, "Banner was not valid UTF-8.");
                Outcome::ParseFailure
            }
        }
    })
    .await
}
