//! Name resolution.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

/// Turns a host/port pair into candidate addresses.
pub trait Resolver {
    /// Resolve `host:port` into candidate endpoints, in preference order.
    fn resolve(&self, host: &str, port: &str) -> impl Future<Output = io::Result<Vec<SocketAddr>>>;
}

/// Resolver backed by the system's `getaddrinfo` via Tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl Resolver for SystemResolver {
    async fn resolve(&self, host: &str, port: &str) -> io::Result<Vec<SocketAddr>> {
        let port = service_port(port).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("unknown service {:?}", port))
        })?;

        let candidates: Vec<SocketAddr> = tokio::net::lookup_host((host, port)).await?.collect();
        tracing::debug!(host, port, candidates = candidates.len(), "Resolved target");
        Ok(candidates)
    }
}

/// Map a port string to a number. Accepts digits or a well-known service name.
pub fn service_port(port: &str) -> Option<u16> {
    match port {
        "http" | "ws" => Some(80),
        "https" | "wss" => Some(443),
        digits => digits.parse().ok(),
    }
}
