//! Outbound streaming session.
//!
//! # Data Flow
//! ```text
//! start(host, port)
//!     → Resolver        host:port → candidate addresses      [deadline window]
//!     → Transport       first candidate that connects        [deadline window]
//!     → SecureChannel   SNI + verified TLS handshake         [deadline window]
//!     → upgrade         WebSocket handshake on /path         [stream profile]
//!     → read loop       one report per message, until close/error/shutdown
//! ```
//!
//! # Design Decisions
//! - One state object driven by one task; no shared ownership
//! - Every failure is terminal: no retry, no fallback, no re-entry
//! - The DNS host and the upgrade `Host` header are separate fields
//! - Stage changes are visible only through [`report::Reporter`]

pub mod error;
pub mod machine;
pub mod report;
pub mod state;

pub use error::SessionError;
pub use machine::{Session, SessionSettings, Target};
pub use report::{ConsoleReporter, Reporter, SessionEvent};
pub use state::{SessionId, SessionState};

use crate::config::{ClientConfig, ConfigError};
use crate::config::validation::ValidationError;
use crate::net::upgrade::NegotiationHeaders;

impl SessionSettings {
    /// Derive session settings from a loaded config.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        let headers = NegotiationHeaders::from_map(&config.upgrade.headers)
            .map_err(|e| ConfigError::Validation(vec![ValidationError::InvalidHeader(e.to_string())]))?;

        Ok(Self {
            deadline: config.timeouts.deadline(),
            path: config.target.path.clone(),
            headers,
            stream: config.stream.timeouts(),
            max_message_size: config.stream.max_message_size,
        })
    }
}
