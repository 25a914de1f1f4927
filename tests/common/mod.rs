//! Shared doubles for session integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

use stream_client::lifecycle::Shutdown;
use stream_client::net::{Resolver, SecureChannel, Transport};
use stream_client::session::{Reporter, SessionEvent, SessionSettings, SessionState};

pub fn addr(s: &str) -> SocketAddr {
    s.parse().unwrap()
}

/// Collects every event a session reports.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<SessionEvent>>>,
    shutdown_on_bytes: Option<Shutdown>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger `shutdown` as soon as the first message is reported.
    pub fn shutdown_on_bytes(shutdown: Shutdown) -> Self {
        Self { events: Arc::default(), shutdown_on_bytes: Some(shutdown) }
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn stages(&self) -> Vec<SessionState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::StageEntered { stage } => Some(stage),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<(&'static str, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::StageFailed { label, message } => Some((label, message)),
                _ => None,
            })
            .collect()
    }

    pub fn byte_reports(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::BytesReceived { bytes } => Some(bytes),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: &SessionEvent) {
        self.events.lock().unwrap().push(event.clone());
        if let (SessionEvent::BytesReceived { .. }, Some(shutdown)) = (event, &self.shutdown_on_bytes) {
            shutdown.trigger();
        }
    }
}

/// Resolver returning a fixed answer.
pub struct StaticResolver {
    answer: Option<Result<Vec<SocketAddr>, io::ErrorKind>>,
    pub calls: Arc<AtomicUsize>,
}

impl StaticResolver {
    pub fn ok(candidates: &[&str]) -> Self {
        Self { answer: Some(Ok(candidates.iter().map(|a| addr(a)).collect())), calls: Arc::default() }
    }

    pub fn fail(kind: io::ErrorKind) -> Self {
        Self { answer: Some(Err(kind)), calls: Arc::default() }
    }

    /// A lookup that never answers.
    pub fn hang() -> Self {
        Self { answer: None, calls: Arc::default() }
    }
}

impl Resolver for StaticResolver {
    async fn resolve(&self, _host: &str, _port: &str) -> io::Result<Vec<SocketAddr>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Some(answer) => answer.clone().map_err(io::Error::from),
            None => std::future::pending().await,
        }
    }
}

/// What the next connect attempt does.
pub enum Connect {
    Refuse,
    Accept(DuplexStream),
    AcceptAfter(Duration, DuplexStream),
    Hang,
}

/// Transport that plays back a connect plan, one entry per attempt.
pub struct ScriptedTransport {
    plan: Mutex<VecDeque<Connect>>,
    pub attempts: Arc<Mutex<Vec<SocketAddr>>>,
}

impl ScriptedTransport {
    pub fn new(plan: Vec<Connect>) -> Self {
        Self { plan: Mutex::new(plan.into()), attempts: Arc::default() }
    }

    pub fn attempts(&self) -> Arc<Mutex<Vec<SocketAddr>>> {
        Arc::clone(&self.attempts)
    }
}

impl Transport for ScriptedTransport {
    type Stream = DuplexStream;

    async fn connect(&self, addr: SocketAddr) -> io::Result<DuplexStream> {
        self.attempts.lock().unwrap().push(addr);
        let next = self.plan.lock().unwrap().pop_front().unwrap_or(Connect::Refuse);
        match next {
            Connect::Refuse => Err(io::ErrorKind::ConnectionRefused.into()),
            Connect::Accept(stream) => Ok(stream),
            Connect::AcceptAfter(delay, stream) => {
                tokio::time::sleep(delay).await;
                Ok(stream)
            }
            Connect::Hang => std::future::pending().await,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum TlsBehavior {
    /// Handshake succeeds; bytes pass through unencrypted.
    PassThrough,
    /// Peer certificate does not chain to a trusted root.
    RejectCertificate,
    /// Peer never answers.
    Hang,
}

/// Secure channel double. Uses the real SNI rules.
pub struct FakeTls {
    behavior: TlsBehavior,
    pub handshakes: Arc<AtomicUsize>,
}

impl FakeTls {
    pub fn new(behavior: TlsBehavior) -> Self {
        Self { behavior, handshakes: Arc::default() }
    }
}

impl<S> SecureChannel<S> for FakeTls
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    type Stream = S;

    async fn handshake(&self, _server_name: ServerName<'static>, stream: S) -> io::Result<S> {
        self.handshakes.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            TlsBehavior::PassThrough => Ok(stream),
            TlsBehavior::RejectCertificate => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                rustls::Error::InvalidCertificate(rustls::CertificateError::UnknownIssuer),
            )),
            TlsBehavior::Hang => std::future::pending().await,
        }
    }
}

/// What the peer saw in the upgrade request.
#[derive(Debug, Clone, Default)]
pub struct UpgradeSeen {
    pub path: String,
    pub host: Option<String>,
    pub user_agent: Option<String>,
    pub headers: Vec<(String, String)>,
}

/// One step of the peer's script.
pub enum PeerAction {
    Send(Message),
    /// Keep reading (and answering pings) for this long.
    Idle(Duration),
    /// Start the close handshake and wait for the reply.
    Close,
    /// Drop the connection without a Close frame.
    Hangup,
    /// Read until the client closes.
    AwaitClose,
}

/// Accept the upgrade on `stream` and play `script`.
pub fn spawn_peer(stream: DuplexStream, script: Vec<PeerAction>) -> JoinHandle<UpgradeSeen> {
    tokio::spawn(async move {
        let mut seen = UpgradeSeen::default();
        let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
            seen.path = req.uri().path().to_string();
            seen.host = header("host");
            seen.user_agent = header("user-agent");
            seen.headers = req
                .headers()
                .iter()
                .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string()))
                .collect();
            Ok(resp)
        };
        let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback).await.unwrap();

        for action in script {
            match action {
                PeerAction::Send(message) => ws.send(message).await.unwrap(),
                PeerAction::Idle(duration) => {
                    let _ = tokio::time::timeout(duration, async {
                        while let Some(Ok(_)) = ws.next().await {}
                    })
                    .await;
                }
                PeerAction::Close => {
                    ws.close(None).await.unwrap();
                    while let Some(Ok(_)) = ws.next().await {}
                }
                PeerAction::Hangup => {
                    drop(ws);
                    return seen;
                }
                PeerAction::AwaitClose => while let Some(Ok(_)) = ws.next().await {},
            }
        }
        seen
    })
}

/// A peer that answers the upgrade request with `status_line` instead of 101.
pub fn spawn_rejecting_peer(mut stream: DuplexStream, status_line: &'static str) -> JoinHandle<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    tokio::spawn(async move {
        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&chunk[..n]);
        }
        let response = format!("{}\r\nContent-Length: 0\r\n\r\n", status_line);
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.flush().await.unwrap();
    })
}

pub fn settings() -> SessionSettings {
    SessionSettings::default()
}

pub fn binary(len: usize) -> Message {
    Message::Binary(vec![0xAB; len].into())
}
