//! Secure WebSocket streaming client library.

pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod session;

pub use config::ClientConfig;
pub use lifecycle::Shutdown;
pub use session::{Session, SessionError, SessionState};
