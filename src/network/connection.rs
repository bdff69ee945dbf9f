//! Connection handling
//!
//! A connection owns one byte stream to the broker and carries exactly one
//! request/response exchange at a time. Frames carry no request id, so the
//! response to a request must be read completely before the next request is
//! written; `&mut self` on every exchange enforces that.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::BrokerConfig;
use crate::protocol::{unframe, FramingError, LENGTH_PREFIX_SIZE};

/// Connection errors
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Framing error: {0}")]
    Framing(FramingError),

    #[error("Connection closed")]
    Closed,

    #[error("Connection timeout")]
    Timeout,
}

pub type ConnectionResult<T> = Result<T, ConnectionError>;

impl From<FramingError> for ConnectionError {
    fn from(err: FramingError) -> Self {
        match err {
            FramingError::Io(e) => ConnectionError::Io(e),
            FramingError::Truncated { expected, read: 0 } if expected == LENGTH_PREFIX_SIZE => {
                ConnectionError::Closed
            }
            other => ConnectionError::Framing(other),
        }
    }
}

/// One framed request out, one response payload back
#[async_trait]
pub trait Transport: Send {
    /// Write a framed request and read the payload of the response frame
    async fn round_trip(&mut self, request: Bytes) -> ConnectionResult<Bytes>;

    /// Close the write side of the transport
    async fn shutdown(&mut self) -> ConnectionResult<()>;
}

/// Connection statistics
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    /// Frames written
    pub frames_sent: u64,
    /// Frames read
    pub frames_received: u64,
    /// Bytes sent
    pub bytes_sent: u64,
    /// Bytes received
    pub bytes_received: u64,
}

/// A byte stream to a broker
pub struct Connection<S = TcpStream> {
    /// Remote peer description
    peer: String,
    /// The underlying stream
    stream: S,
    /// Statistics
    stats: ConnectionStats,
}

impl Connection<TcpStream> {
    /// Open a TCP connection to `host:port`
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> ConnectionResult<Self> {
        let addr = super::resolve_host(host, port).await?;

        tracing::info!("Connecting to {}", addr);

        let stream = match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(ConnectionError::Io(e)),
            Err(_) => return Err(ConnectionError::Timeout),
        };
        stream.set_nodelay(true)?;

        Ok(Self::new(stream, addr.to_string()))
    }

    /// Open a TCP connection to the configured broker
    pub async fn open(broker: &BrokerConfig) -> ConnectionResult<Self> {
        Self::connect(&broker.host, broker.port, broker.connect_timeout()).await
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an established stream
    pub fn new(stream: S, peer: impl Into<String>) -> Self {
        Self {
            peer: peer.into(),
            stream,
            stats: ConnectionStats::default(),
        }
    }

    /// Get the remote peer description
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Get connection statistics
    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Write raw bytes, expected to already be framed
    pub async fn send_bytes(&mut self, data: &[u8]) -> ConnectionResult<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await?;

        self.stats.frames_sent += 1;
        self.stats.bytes_sent += data.len() as u64;
        tracing::debug!("Sent {} bytes to {}", data.len(), self.peer);
        Ok(())
    }

    /// Read one frame and return its payload
    pub async fn receive_frame(&mut self) -> ConnectionResult<Bytes> {
        let payload = unframe(&mut self.stream).await?;

        self.stats.frames_received += 1;
        self.stats.bytes_received += (LENGTH_PREFIX_SIZE + payload.len()) as u64;
        tracing::debug!("Received {} byte frame from {}", payload.len(), self.peer);
        Ok(payload)
    }

    /// Shut the connection down and release the stream
    pub async fn close(mut self) -> ConnectionResult<()> {
        self.shutdown().await
    }
}

#[async_trait]
impl<S> Transport for Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn round_trip(&mut self, request: Bytes) -> ConnectionResult<Bytes> {
        self.send_bytes(&request).await?;
        self.receive_frame().await
    }

    async fn shutdown(&mut self) -> ConnectionResult<()> {
        self.stream.shutdown().await?;
        tracing::info!("Closed connection to {}", self.peer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame;
    use tokio::io::{duplex, AsyncReadExt};

    #[tokio::test]
    async fn test_round_trip_over_mock_stream() {
        let request = frame(b"ping").unwrap();
        let reply = frame(b"pong").unwrap();
        let mock = tokio_test::io::Builder::new()
            .write(&request)
            .read(&reply)
            .build();

        let mut conn = Connection::new(mock, "mock");
        let payload = conn.round_trip(request.clone()).await.unwrap();

        assert_eq!(&payload[..], b"pong");
        assert_eq!(conn.stats().frames_sent, 1);
        assert_eq!(conn.stats().frames_received, 1);
        assert_eq!(conn.stats().bytes_sent, 6);
        assert_eq!(conn.stats().bytes_received, 6);
    }

    #[tokio::test]
    async fn test_short_writes_complete() {
        let (client, mut server) = duplex(3);
        let mut conn = Connection::new(client, "duplex");

        let request = frame(b"a longer request than the pipe").unwrap();
        let expected = request.clone();
        let reader = tokio::spawn(async move {
            let mut buf = vec![0u8; expected.len()];
            server.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf[..], &expected[..]);
        });

        conn.send_bytes(&request).await.unwrap();
        reader.await.unwrap();
    }

    #[tokio::test]
    async fn test_peer_closed_before_response() {
        let mock = tokio_test::io::Builder::new().write(b"\x00\x00").build();
        let mut conn = Connection::new(mock, "mock");

        let err = conn.round_trip(Bytes::from_static(b"\x00\x00")).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Closed));
    }

    #[tokio::test]
    async fn test_peer_closed_mid_frame() {
        let mock = tokio_test::io::Builder::new().read(b"\x04\x00ab").build();
        let mut conn = Connection::new(mock, "mock");

        let err = conn.receive_frame().await.unwrap_err();
        assert!(matches!(
            err,
            ConnectionError::Framing(FramingError::Truncated { expected: 4, read: 2 })
        ));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = Connection::connect("127.0.0.1", port, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ConnectionError::Io(_))));
    }
}
