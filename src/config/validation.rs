//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (deadline > 0, path is absolute)
//! - Check that upgrade headers are valid HTTP header names/values
//! - Check that at least one trust anchor source is enabled
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ClientConfig;
use crate::net::upgrade::NegotiationHeaders;

/// A single semantic problem found in a config.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("target.host must not be empty")]
    EmptyHost,

    #[error("target.port must not be empty")]
    EmptyPort,

    #[error("target.path must start with '/': {0:?}")]
    RelativePath(String),

    #[error("timeouts.deadline_secs must be greater than zero")]
    ZeroDeadline,

    #[error("stream.handshake_timeout_secs must be greater than zero")]
    ZeroHandshakeTimeout,

    #[error("upgrade.headers: {0}")]
    InvalidHeader(String),

    #[error("tls: no trust anchor source enabled")]
    NoTrustAnchors,

    #[error("observability.metrics_address is not a socket address: {0:?}")]
    MetricsAddress(String),
}

/// Check a parsed config for semantic errors.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.target.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if config.target.port.trim().is_empty() {
        errors.push(ValidationError::EmptyPort);
    }
    if !config.target.path.starts_with('/') {
        errors.push(ValidationError::RelativePath(config.target.path.clone()));
    }
    if config.timeouts.deadline_secs == 0 {
        errors.push(ValidationError::ZeroDeadline);
    }
    if config.stream.handshake_timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroHandshakeTimeout);
    }
    if let Err(e) = NegotiationHeaders::from_map(&config.upgrade.headers) {
        errors.push(ValidationError::InvalidHeader(e.to_string()));
    }

    let tls = &config.tls;
    if !tls.native_roots && !tls.webpki_roots && tls.extra_ca_files.is_empty() {
        errors.push(ValidationError::NoTrustAnchors);
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
