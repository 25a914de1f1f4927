//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Session produces:
//!     → logging.rs (structured log events on stderr)
//!     → metrics.rs (stage transitions, failures, bytes received)
//!
//! Consumers:
//!     → Log aggregation (stderr)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Logs go to stderr so stdout only carries session reports
//! - Session ID flows through every log line
//! - Metrics are cheap (atomic increments) and no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
