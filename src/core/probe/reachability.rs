// src/core/probe/reachability.rs

use super::{io_outcome, within, Outcome};
use std::time::Duration;
use tokio::net::TcpStream;

/// Bare TCP connect. A completed handshake is the whole signal.
pub async fn check_reachable(host: &str, port: u16, budget: Duration) -> Outcome<()> {
    within(budget, async {
        match TcpStream::connect((host, port)).await {
            Ok(_) => Outcome::Success(()),
            Err(e) => io_outcome(&e),
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn listening_port_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let outcome = check_reachable("127.0.0.1", port, Duration::from_secs(2)).await;
        assert_eq!(outcome, Outcome::Success(()));
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        assert_eq!(check_reachable("127.0.0.1", port, Duration::from_secs(2)).await, Outcome::Unreachable);
    }
}
