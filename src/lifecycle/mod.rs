//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build trust store → Assemble session
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Session sends Close → Peer acknowledges → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and happens before any I/O
//! - Shutdown is only honoured once the session is streaming; earlier
//!   stages are bounded by their deadline instead

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
