//! Raw byte-stream connections.
//!
//! # Responsibilities
//! - Open a TCP stream to one candidate address
//! - Walk the candidate set in order until one connects
//! - Keep every per-candidate failure for the final report

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::session::error::{CandidateFailure, ConnectFailure};

/// Opens raw byte streams.
pub trait Transport {
    type Stream: AsyncRead + AsyncWrite + Unpin;

    fn connect(&self, addr: SocketAddr) -> impl Future<Output = io::Result<Self::Stream>>;
}

/// Plain TCP with Nagle disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

impl Transport for TcpTransport {
    type Stream = TcpStream;

    async fn connect(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

/// Try each candidate in order, returning the first stream that connects.
pub async fn connect_any<T: Transport>(
    transport: &T,
    candidates: &[SocketAddr],
) -> Result<(T::Stream, SocketAddr), ConnectFailure> {
    let mut attempts = Vec::with_capacity(candidates.len());

    for &addr in candidates {
        match transport.connect(addr).await {
            Ok(stream) => {
                tracing::debug!(peer_addr = %addr, failed_before = attempts.len(), "Connected");
                return Ok((stream, addr));
            }
            Err(source) => {
                tracing::debug!(peer_addr = %addr, error = %source, "Candidate failed");
                attempts.push(CandidateFailure { addr, source });
            }
        }
    }

    Err(ConnectFailure::Exhausted(attempts))
}
