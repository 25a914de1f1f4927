//! WebSocket upgrade handshake and message reads.
//!
//! # Data Flow
//! ```text
//! TLS stream
//!     → build_request (resource path, host header, negotiation headers)
//!     → handshake (bounded by the stream profile's handshake timeout)
//!     → MessageReader::next_message (idle/ping policy) in a loop
//!     → close (explicit close sequence)
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;

use crate::resilience::timeouts::StreamTimeouts;
use crate::session::error::{ReadFailure, UpgradeFailure};

/// Client identification sent in place of any configured `User-Agent`.
pub const USER_AGENT: &str = concat!("stream-client/", env!("CARGO_PKG_VERSION"), " websocket-client-async-tls");

#[derive(Debug, Error)]
#[error("invalid header {name:?}: {reason}")]
pub struct HeaderError {
    pub name: String,
    pub reason: String,
}

/// Headers attached to the upgrade request. Fixed once built.
#[derive(Debug, Clone)]
pub struct NegotiationHeaders {
    headers: HeaderMap,
}

impl NegotiationHeaders {
    /// Parse configured headers, then force the client `User-Agent`.
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, HeaderError> {
        let mut headers = HeaderMap::with_capacity(map.len() + 1);
        for (name, value) in map {
            let invalid = |reason: String| HeaderError { name: name.clone(), reason };
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
            let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
            headers.insert(header_name, header_value);
        }
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        Ok(Self { headers })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.headers.iter()
    }
}

impl Default for NegotiationHeaders {
    fn default() -> Self {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        Self { headers }
    }
}

/// `Host` header value for a connected endpoint. IPv6 literals are bracketed.
pub fn host_header(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Build the upgrade request for `path` on `host_header`.
pub fn build_request(host_header: &str, path: &str, headers: &NegotiationHeaders) -> Result<Request, UpgradeFailure> {
    let mut request = format!("wss://{}{}", host_header, path)
        .into_client_request()
        .map_err(UpgradeFailure::Rejected)?;

    let target = HeaderValue::from_str(host_header)
        .map_err(|e| UpgradeFailure::InvalidRequest(format!("host {:?}: {}", host_header, e)))?;

    let request_headers = request.headers_mut();
    for (name, value) in headers.iter() {
        request_headers.insert(name.clone(), value.clone());
    }
    request_headers.insert(header::HOST, target);

    Ok(request)
}

/// Run the client upgrade handshake on an established secure stream.
pub async fn handshake<S>(
    stream: S,
    request: Request,
    timeouts: &StreamTimeouts,
    max_message_size: Option<usize>,
) -> Result<WebSocketStream<S>, UpgradeFailure>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let config = WebSocketConfig::default().max_message_size(max_message_size);
    let upgrade = tokio_tungstenite::client_async_with_config(request, stream, Some(config));

    let (ws, response) = tokio::time::timeout(timeouts.handshake, upgrade)
        .await
        .map_err(|_| UpgradeFailure::TimedOut(timeouts.handshake))?
        .map_err(UpgradeFailure::Rejected)?;

    tracing::debug!(status = %response.status(), "Upgrade accepted");
    Ok(ws)
}

/// Reads messages while enforcing the stream's idle and ping policy.
#[derive(Debug)]
pub struct MessageReader {
    timeouts: StreamTimeouts,
    ping_outstanding: bool,
}

impl MessageReader {
    pub fn new(timeouts: StreamTimeouts) -> Self {
        Self { timeouts, ping_outstanding: false }
    }

    /// Next frame from the peer, or `None` once the stream has ended.
    ///
    /// With an idle timeout and pings enabled, a Ping goes out after half
    /// the idle period of silence; the read fails if the second half also
    /// passes without traffic.
    pub async fn next_message<S>(&mut self, ws: &mut WebSocketStream<S>) -> Result<Option<Message>, ReadFailure>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let Some(idle) = self.timeouts.idle else {
            return ws.next().await.transpose().map_err(ReadFailure::Protocol);
        };

        loop {
            let wait = match (self.timeouts.keep_alive_pings, self.ping_outstanding) {
                (true, false) => idle / 2,
                (true, true) => idle - idle / 2,
                (false, _) => idle,
            };

            match tokio::time::timeout(wait, ws.next()).await {
                Ok(item) => {
                    self.ping_outstanding = false;
                    return item.transpose().map_err(ReadFailure::Protocol);
                }
                Err(_) if self.timeouts.keep_alive_pings && !self.ping_outstanding => {
                    tracing::trace!("Stream quiet, sending keep-alive ping");
                    ws.send(Message::Ping(Default::default())).await.map_err(ReadFailure::Protocol)?;
                    self.ping_outstanding = true;
                }
                Err(_) => return Err(ReadFailure::IdleTimeout(idle)),
            }
        }
    }
}

/// Send a Close frame and wait for the peer to finish the close handshake.
pub async fn close<S>(ws: &mut WebSocketStream<S>, limit: Duration) -> Result<(), tungstenite::Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match ws.close(None).await {
        Ok(()) | Err(tungstenite::Error::ConnectionClosed) => {}
        Err(e) => return Err(e),
    }
    finish(ws, limit).await
}

/// Drain the stream after a Close frame so the close reply is flushed.
pub async fn finish<S>(ws: &mut WebSocketStream<S>, limit: Duration) -> Result<(), tungstenite::Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let drain = async {
        while let Some(item) = ws.next().await {
            match item {
                Ok(_) => continue,
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    };

    tokio::time::timeout(limit, drain)
        .await
        .unwrap_or_else(|_| Err(tungstenite::Error::Io(std::io::ErrorKind::TimedOut.into())))
}
