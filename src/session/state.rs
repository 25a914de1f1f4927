//! Session identity and lifecycle states.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Global atomic counter for session IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a session, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Generate a new unique session ID.
    pub fn new() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Lifecycle state of a session.
///
/// ```text
/// Created → Resolving → Connecting → TlsHandshaking → UpgradeHandshaking → Streaming → Closed
///               └───────────┴─────────────┴────────────────┴───────────────┴──→ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    Resolving,
    Connecting,
    TlsHandshaking,
    UpgradeHandshaking,
    Streaming,
    Closed,
    Failed,
}

impl SessionState {
    /// The next state on success, if any.
    pub fn successor(self) -> Option<SessionState> {
        use SessionState::*;
        match self {
            Created => Some(Resolving),
            Resolving => Some(Connecting),
            Connecting => Some(TlsHandshaking),
            TlsHandshaking => Some(UpgradeHandshaking),
            UpgradeHandshaking => Some(Streaming),
            Streaming => Some(Closed),
            Closed | Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }

    /// Whether `self → next` is an allowed transition.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        match next {
            SessionState::Failed => !self.is_terminal(),
            _ => self.successor() == Some(next),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Created => "created",
            SessionState::Resolving => "resolving",
            SessionState::Connecting => "connecting",
            SessionState::TlsHandshaking => "tls_handshaking",
            SessionState::UpgradeHandshaking => "upgrade_handshaking",
            SessionState::Streaming => "streaming",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
