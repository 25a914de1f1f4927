//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Session stage before the upgrade:
//!     → timeouts.rs Deadline (fresh window per stage)
//!     → expiry fails the stage with a timeout cause
//!
//! After the upgrade:
//!     → timeouts.rs StreamTimeouts (handshake limit, idle/ping policy)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every pre-upgrade network call has a deadline
//! - No retries: a failed stage is terminal for the session

pub mod timeouts;
