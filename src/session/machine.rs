//! The session state machine.

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::net::resolver::Resolver;
use crate::net::tls::SecureChannel;
use crate::net::transport::{connect_any, Transport};
use crate::net::upgrade::{self, MessageReader, NegotiationHeaders};
use crate::observability::metrics;
use crate::resilience::timeouts::{Deadline, StreamTimeouts};
use crate::session::error::{ConnectFailure, ReadFailure, SessionError, TlsFailure};
use crate::session::report::{Reporter, SessionEvent};
use crate::session::state::{SessionId, SessionState};

/// Fixed per-session parameters.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Length of each pre-upgrade deadline window.
    pub deadline: Duration,
    /// Resource path requested in the upgrade handshake.
    pub path: String,
    pub headers: NegotiationHeaders,
    pub stream: StreamTimeouts,
    pub max_message_size: Option<usize>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(30),
            path: "/events".to_string(),
            headers: NegotiationHeaders::default(),
            stream: StreamTimeouts::default(),
            max_message_size: None,
        }
    }
}

/// Target as given to [`Session::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: String,
}

enum Step {
    Read(Result<Option<Message>, ReadFailure>),
    Shutdown,
}

/// A single outbound streaming session.
///
/// One governing task drives the session step by step; each stage
/// finishes before the next is issued, so the session never has two
/// operations in flight.
pub struct Session<R, T, C> {
    id: SessionId,
    resolver: R,
    transport: T,
    secure: C,
    settings: SessionSettings,
    reporter: Box<dyn Reporter>,
    shutdown: Option<broadcast::Receiver<()>>,

    state: SessionState,
    target: Option<Target>,
    /// `host:port` of the connected endpoint, sent as the upgrade `Host` header.
    host_header: Option<String>,
    buffer: Vec<u8>,
    buffer_taken: bool,
    deadline: Deadline,
}

impl<R, T, C> Session<R, T, C>
where
    R: Resolver,
    T: Transport,
    C: SecureChannel<T::Stream>,
{
    pub fn new(resolver: R, transport: T, secure: C, settings: SessionSettings, reporter: impl Reporter + 'static) -> Self {
        Self {
            id: SessionId::new(),
            resolver,
            transport,
            secure,
            settings,
            reporter: Box::new(reporter),
            shutdown: None,
            state: SessionState::Created,
            target: None,
            host_header: None,
            buffer: Vec::new(),
            buffer_taken: false,
            deadline: Deadline::never(),
        }
    }

    /// Abort the session when `shutdown` fires. A pending stage fails with
    /// [`SessionError::Interrupted`]; a live stream is closed cleanly.
    pub fn with_shutdown(mut self, shutdown: broadcast::Receiver<()>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    pub fn host_header(&self) -> Option<&str> {
        self.host_header.as_deref()
    }

    /// Bytes read so far.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// The final buffer contents. Available once, after a clean close.
    pub fn take_buffer(&mut self) -> Option<Vec<u8>> {
        if self.state != SessionState::Closed || self.buffer_taken {
            return None;
        }
        self.buffer_taken = true;
        Some(std::mem::take(&mut self.buffer))
    }

    /// Run the session against `host:port` until it closes or fails.
    ///
    /// Returns `Ok` once the stream is closed cleanly. Any stage failure is
    /// reported, leaves the session `Failed` and is returned. A session can
    /// only be started once; later calls return
    /// [`SessionError::AlreadyStarted`] and change nothing.
    pub async fn start(&mut self, host: &str, port: &str) -> Result<(), SessionError> {
        if self.state != SessionState::Created {
            tracing::warn!(session = %self.id, state = %self.state, "Session already started");
            return Err(SessionError::AlreadyStarted(self.state));
        }

        self.target = Some(Target { host: host.to_string(), port: port.to_string() });
        tracing::info!(session = %self.id, host, port, path = %self.settings.path, "Session starting");

        match self.run(host, port).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    async fn run(&mut self, host: &str, port: &str) -> Result<(), SessionError> {
        let window = self.settings.deadline;

        self.enter(SessionState::Resolving);
        self.deadline.expires_after(window);
        let candidates = interruptible(&mut self.shutdown, self.deadline.run(self.resolver.resolve(host, port)))
            .await
            .ok_or(SessionError::Interrupted(SessionState::Resolving))?
            .map_err(|_| SessionError::resolve_timeout(host, port, window))?
            .map_err(|source| SessionError::Resolve { host: host.to_string(), port: port.to_string(), source })?;
        if candidates.is_empty() {
            return Err(SessionError::Resolve {
                host: host.to_string(),
                port: port.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"),
            });
        }

        self.enter(SessionState::Connecting);
        self.deadline.expires_after(window);
        let (stream, peer) = interruptible(&mut self.shutdown, self.deadline.run(connect_any(&self.transport, &candidates)))
            .await
            .ok_or(SessionError::Interrupted(SessionState::Connecting))?
            .map_err(|_| SessionError::Connect(ConnectFailure::TimedOut(window)))?
            .map_err(SessionError::Connect)?;
        drop(candidates);

        self.enter(SessionState::TlsHandshaking);
        self.deadline.expires_after(window);
        let server_name = self
            .secure
            .server_name(host)
            .map_err(|source| SessionError::SniConfiguration { host: host.to_string(), source })?;
        let host_header = upgrade::host_header(host, peer.port());
        self.host_header = Some(host_header.clone());
        let secure = interruptible(&mut self.shutdown, self.deadline.run(self.secure.handshake(server_name, stream)))
            .await
            .ok_or(SessionError::Interrupted(SessionState::TlsHandshaking))?
            .map_err(|_| SessionError::TlsHandshake(TlsFailure::TimedOut(window)))?
            .map_err(|e| SessionError::TlsHandshake(TlsFailure::from(e)))?;

        // The upgraded stream polices its own liveness from here on.
        self.deadline.expires_never();

        self.enter(SessionState::UpgradeHandshaking);
        let request = upgrade::build_request(&host_header, &self.settings.path, &self.settings.headers)
            .map_err(SessionError::UpgradeHandshake)?;
        let handshake = upgrade::handshake(secure, request, &self.settings.stream, self.settings.max_message_size);
        let mut ws = interruptible(&mut self.shutdown, handshake)
            .await
            .ok_or(SessionError::Interrupted(SessionState::UpgradeHandshaking))?
            .map_err(SessionError::UpgradeHandshake)?;

        self.enter(SessionState::Streaming);
        self.stream(&mut ws).await
    }

    async fn stream<S>(&mut self, ws: &mut WebSocketStream<S>) -> Result<(), SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut reader = MessageReader::new(self.settings.stream);
        let mut shutdown = self.shutdown.take();

        loop {
            let step = tokio::select! {
                biased;
                _ = cancelled(&mut shutdown) => Step::Shutdown,
                read = reader.next_message(ws) => Step::Read(read),
            };

            let message = match step {
                Step::Shutdown => {
                    tracing::info!(session = %self.id, "Shutdown requested, closing stream");
                    upgrade::close(ws, self.settings.stream.handshake)
                        .await
                        .map_err(SessionError::Close)?;
                    self.closed();
                    return Ok(());
                }
                Step::Read(read) => read.map_err(SessionError::Read)?,
            };

            match message {
                Some(message @ (Message::Text(_) | Message::Binary(_))) => {
                    let payload = message.into_data();
                    self.buffer.extend_from_slice(&payload);
                    metrics::record_bytes_received(payload.len());
                    self.emit(SessionEvent::BytesReceived { bytes: payload.len() });
                }
                Some(Message::Close(frame)) => {
                    tracing::info!(session = %self.id, frame = ?frame, "Peer closed stream");
                    upgrade::finish(ws, self.settings.stream.handshake)
                        .await
                        .map_err(SessionError::Close)?;
                    self.closed();
                    return Ok(());
                }
                Some(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                None => return Err(SessionError::Read(ReadFailure::UnexpectedEof)),
            }
        }
    }

    fn enter(&mut self, next: SessionState) {
        debug_assert!(self.state.can_transition_to(next), "{} -> {}", self.state, next);
        tracing::debug!(session = %self.id, from = %self.state, to = %next, "Stage transition");
        self.state = next;
        metrics::record_transition(next);
        self.emit(SessionEvent::StageEntered { stage: next });
    }

    fn closed(&mut self) {
        self.enter(SessionState::Closed);
        tracing::info!(session = %self.id, buffered = self.buffer.len(), "Session closed");
        self.emit(SessionEvent::Closed { buffered: self.buffer.len() });
    }

    fn fail(&mut self, err: &SessionError) {
        let label = err.label();
        tracing::error!(
            session = %self.id,
            stage = label,
            state = %self.state,
            timeout = err.is_timeout(),
            certificate = err.is_certificate_failure(),
            cause_code = ?err.cause_code(),
            error = %err,
            "Session failed"
        );
        metrics::record_failure(label);
        self.deadline.expires_never();
        self.emit(SessionEvent::StageFailed { label, message: err.to_string() });
        self.enter(SessionState::Failed);
    }

    fn emit(&self, event: SessionEvent) {
        self.reporter.report(&event);
    }
}

/// Drive `fut` unless shutdown is requested first, in which case `None`.
async fn interruptible<F: Future>(shutdown: &mut Option<broadcast::Receiver<()>>, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancelled(shutdown) => None,
        output = fut => Some(output),
    }
}

/// Resolves when shutdown is requested. Never resolves without a receiver
/// or once every sender is gone.
async fn cancelled(shutdown: &mut Option<broadcast::Receiver<()>>) {
    match shutdown {
        Some(rx) => match rx.recv().await {
            Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => {
                *shutdown = None;
                std::future::pending::<()>().await
            }
        },
        None => std::future::pending::<()>().await,
    }
}
