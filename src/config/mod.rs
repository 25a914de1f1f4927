//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → CLI overrides applied once in main.rs
//!     → handed to the session and the trust store loader
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a session never sees it change
//! - All fields have defaults so an empty file is a valid config
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::ClientConfig;
pub use schema::ObservabilityConfig;
pub use schema::ReportFormat;
pub use schema::StreamConfig;
pub use schema::TargetConfig;
pub use schema::TimeoutConfig;
pub use schema::TlsConfig;
pub use schema::UpgradeConfig;
