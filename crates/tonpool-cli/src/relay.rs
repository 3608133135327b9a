//! Relay transport for lite-server queries
//!
//! When the node client runs with callbacks for network, it asks the
//! console to carry raw queries to a lite server. Each query is framed as a
//! big-endian `u32` length followed by the payload; the answer uses the
//! same framing.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::RemoteError;

/// Default deadline for a relayed query
pub const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_FRAME: usize = 16 << 20;

pub trait RelayTransport {
    fn send_query(&self, data: Vec<u8>, timeout: Duration) -> BoxFuture<'static, Result<Vec<u8>, RemoteError>>;
}

/// One TCP connection per query
#[derive(Debug, Clone)]
pub struct TcpRelay {
    endpoint: String,
}

impl TcpRelay {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl RelayTransport for TcpRelay {
    fn send_query(&self, data: Vec<u8>, timeout: Duration) -> BoxFuture<'static, Result<Vec<u8>, RemoteError>> {
        let endpoint = self.endpoint.clone();
        async move {
            match tokio::time::timeout(timeout, exchange(&endpoint, &data)).await {
                Ok(Ok(answer)) => Ok(answer),
                Ok(Err(err)) => Err(RemoteError::new(500, format!("relay failed: {}", err))),
                Err(_) => Err(RemoteError::new(652, "relay query timed out")),
            }
        }
        .boxed()
    }
}

async fn exchange(endpoint: &str, data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut stream = TcpStream::connect(endpoint).await?;
    stream.write_all(&(data.len() as u32).to_be_bytes()).await?;
    stream.write_all(data).await?;

    let len = stream.read_u32().await? as usize;
    if len > MAX_FRAME {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("answer of {} bytes is too large", len),
        ));
    }
    let mut answer = vec![0u8; len];
    stream.read_exact(&mut answer).await?;
    debug!(endpoint, sent = data.len(), received = len, "relayed query");
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_echo_relay() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let len = stream.read_u32().await.unwrap() as usize;
            let mut payload = vec![0u8; len];
            stream.read_exact(&mut payload).await.unwrap();
            payload.reverse();
            stream.write_all(&(len as u32).to_be_bytes()).await.unwrap();
            stream.write_all(&payload).await.unwrap();
        });

        let relay = TcpRelay::new(endpoint);
        let answer = relay.send_query(vec![1, 2, 3], DEFAULT_RELAY_TIMEOUT).await.unwrap();
        assert_eq!(answer, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_unreachable_relay_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();
        drop(listener);

        let relay = TcpRelay::new(endpoint);
        let err = relay.send_query(vec![1], DEFAULT_RELAY_TIMEOUT).await.unwrap_err();
        assert_eq!(err.code, 500);
    }
}
