//! Session error taxonomy.
//!
//! Every variant is terminal for the session. Each carries the message and
//! the source error of the layer it came from; the session only logs them.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use rustls::pki_types::InvalidDnsNameError;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::session::state::SessionState;

/// Errors that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{host}:{port}: {source}")]
    Resolve {
        host: String,
        port: String,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Connect(ConnectFailure),

    #[error("cannot use {host:?} as server name: {source}")]
    SniConfiguration {
        host: String,
        #[source]
        source: InvalidDnsNameError,
    },

    #[error("{0}")]
    TlsHandshake(TlsFailure),

    #[error("{0}")]
    UpgradeHandshake(UpgradeFailure),

    #[error("{0}")]
    Read(ReadFailure),

    #[error("{0}")]
    Close(#[source] tungstenite::Error),

    /// Shutdown was requested before the stream was established.
    #[error("interrupted during {0}")]
    Interrupted(SessionState),

    /// `start` was called on a session that already ran.
    #[error("session already started (state: {0})")]
    AlreadyStarted(SessionState),
}

impl SessionError {
    /// Label used in `<label>: <message>` failure reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Resolve { .. } => "resolve",
            Self::Connect(_) => "connect",
            Self::SniConfiguration { .. } => "sni",
            Self::TlsHandshake(_) => "tls_handshake",
            Self::UpgradeHandshake(_) => "upgrade_handshake",
            Self::Read(_) => "read",
            Self::Close(_) => "close",
            Self::Interrupted(_) => "shutdown",
            Self::AlreadyStarted(_) => "start",
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Resolve { source, .. } => source.kind() == io::ErrorKind::TimedOut,
            Self::Connect(ConnectFailure::TimedOut(_))
            | Self::TlsHandshake(TlsFailure::TimedOut(_))
            | Self::UpgradeHandshake(UpgradeFailure::TimedOut(_))
            | Self::Read(ReadFailure::IdleTimeout(_)) => true,
            _ => false,
        }
    }

    pub fn is_certificate_failure(&self) -> bool {
        matches!(self, Self::TlsHandshake(TlsFailure::CertificateVerification { .. }))
    }

    /// OS error code of the underlying I/O failure, if there was one.
    pub fn cause_code(&self) -> Option<i32> {
        match self {
            Self::Resolve { source, .. } => source.raw_os_error(),
            Self::Connect(ConnectFailure::Exhausted(attempts)) => attempts.last()?.source.raw_os_error(),
            Self::TlsHandshake(TlsFailure::Io(source)) => source.raw_os_error(),
            Self::Read(ReadFailure::Protocol(tungstenite::Error::Io(source))) => source.raw_os_error(),
            _ => None,
        }
    }

    pub(crate) fn resolve_timeout(host: &str, port: &str, after: Duration) -> Self {
        Self::Resolve {
            host: host.to_string(),
            port: port.to_string(),
            source: io::Error::new(io::ErrorKind::TimedOut, format!("timed out after {:?}", after)),
        }
    }
}

/// One address that refused or failed to connect.
#[derive(Debug)]
pub struct CandidateFailure {
    pub addr: SocketAddr,
    pub source: io::Error,
}

#[derive(Debug, Error)]
pub enum ConnectFailure {
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    /// Every candidate was tried and none connected.
    #[error("{}", describe_attempts(.0))]
    Exhausted(Vec<CandidateFailure>),
}

fn describe_attempts(attempts: &[CandidateFailure]) -> String {
    match attempts {
        [] => "no candidates".to_string(),
        [only] => format!("{}: {}", only.addr, only.source),
        [.., last] => format!("{} candidates failed, last {}: {}", attempts.len(), last.addr, last.source),
    }
}

#[derive(Debug, Error)]
pub enum TlsFailure {
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    /// The peer sent no certificate or one that does not validate.
    #[error("certificate verification failed: {reason}")]
    CertificateVerification { reason: rustls::Error },

    #[error("{0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for TlsFailure {
    /// Split certificate problems out of the handshake's I/O error.
    fn from(err: io::Error) -> Self {
        let rejected = err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<rustls::Error>())
            .filter(|e| {
                matches!(
                    e,
                    rustls::Error::InvalidCertificate(_) | rustls::Error::NoCertificatesPresented
                )
            })
            .cloned();

        match rejected {
            Some(reason) => Self::CertificateVerification { reason },
            None => Self::Io(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum UpgradeFailure {
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("invalid upgrade request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Rejected(#[source] tungstenite::Error),
}

#[derive(Debug, Error)]
pub enum ReadFailure {
    #[error("no traffic for {0:?}")]
    IdleTimeout(Duration),

    /// The transport ended without a Close frame.
    #[error("stream ended without a close frame")]
    UnexpectedEof,

    #[error("{0}")]
    Protocol(#[source] tungstenite::Error),
}
