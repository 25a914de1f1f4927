//! Timeout enforcement.
//!
//! # Responsibilities
//! - Coarse deadline for the pre-upgrade stages (resolve, connect, TLS)
//! - Suggested liveness profile for the upgraded stream
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - The deadline is re-armed per stage, never cumulative
//! - Once the TLS handshake completes the deadline is disarmed and the
//!   stream profile owns liveness

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{error::Elapsed, Instant};

/// A re-armable deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline {
    expires_at: Option<Instant>,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn never() -> Self {
        Self { expires_at: None }
    }

    /// Arm a fresh window starting now. A window past the clock's range
    /// leaves the deadline disarmed.
    pub fn expires_after(&mut self, window: Duration) {
        self.expires_at = Instant::now().checked_add(window);
    }

    /// Disarm the deadline.
    pub fn expires_never(&mut self) {
        self.expires_at = None;
    }

    pub fn is_armed(&self) -> bool {
        self.expires_at.is_some()
    }

    /// Drive `fut` to completion unless the deadline passes first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Elapsed> {
        match self.expires_at {
            Some(at) => tokio::time::timeout_at(at, fut).await,
            None => Ok(fut.await),
        }
    }
}

/// Which side of the upgraded stream a profile is tuned for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Client,
    Server,
}

/// Liveness settings for the upgraded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamTimeouts {
    /// Limit on the upgrade handshake itself.
    pub handshake: Duration,
    /// Silence allowed before the stream is considered dead.
    pub idle: Option<Duration>,
    /// Send a Ping halfway through the idle period.
    pub keep_alive_pings: bool,
}

impl StreamTimeouts {
    /// The stock profile for `role`.
    ///
    /// Clients rely on the server to police idleness, so only the
    /// handshake is bounded. Servers drop silent peers after five
    /// minutes and probe them with pings first.
    pub fn suggested(role: Role) -> Self {
        match role {
            Role::Client => Self {
                handshake: Duration::from_secs(30),
                idle: None,
                keep_alive_pings: false,
            },
            Role::Server => Self {
                handshake: Duration::from_secs(30),
                idle: Some(Duration::from_secs(300)),
                keep_alive_pings: true,
            },
        }
    }
}

impl Default for StreamTimeouts {
    fn default() -> Self {
        Self::suggested(Role::Client)
    }
}
