//! Network module - Talks to a LucidMQ broker over TCP
//!
//! Provides:
//! - Connection carrying one framed request/response exchange at a time
//! - Role clients for topic administration, producing and consuming

mod client;
mod connection;

pub use client::*;
pub use connection::*;

use std::net::SocketAddr;

/// Resolve a hostname to a socket address
pub async fn resolve_host(host: &str, port: u16) -> std::io::Result<SocketAddr> {
    use tokio::net::lookup_host;

    let addr_string = format!("{}:{}", host, port);
    let mut addrs = lookup_host(&addr_string).await?;

    addrs.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Could not resolve host: {}", host),
        )
    })
}
