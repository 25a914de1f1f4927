//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::timeouts::{Role, StreamTimeouts};

/// Root configuration for the streaming client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Remote endpoint to stream from.
    pub target: TargetConfig,

    /// Pre-upgrade deadline settings.
    pub timeouts: TimeoutConfig,

    /// Post-upgrade stream profile.
    pub stream: StreamConfig,

    /// Trust anchor sources.
    pub tls: TlsConfig,

    /// Upgrade handshake headers.
    pub upgrade: UpgradeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Remote endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Hostname or literal address. Also used as the SNI value.
    pub host: String,

    /// Numeric port or service name (`https`, `wss`, ...).
    pub port: String,

    /// Resource path requested in the upgrade handshake.
    pub path: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: "ws.backpack.tf".to_string(),
            port: "443".to_string(),
            path: "/events".to_string(),
        }
    }
}

/// Deadline applied to each stage before the upgrade handshake.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Length of each pre-upgrade window in seconds.
    pub deadline_secs: u64,
}

impl TimeoutConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { deadline_secs: 30 }
    }
}

/// Stream profile applied once the upgrade layer owns liveness.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Base profile the overrides below are applied to.
    pub profile: Role,

    /// Upgrade handshake timeout override in seconds.
    pub handshake_timeout_secs: Option<u64>,

    /// Idle timeout override in seconds (0 disables it).
    pub idle_timeout_secs: Option<u64>,

    /// Keep-alive ping override.
    pub keep_alive_pings: Option<bool>,

    /// Largest inbound message accepted, in bytes.
    pub max_message_size: Option<usize>,
}

impl StreamConfig {
    /// Resolve the suggested profile with any overrides applied.
    pub fn timeouts(&self) -> StreamTimeouts {
        let mut timeouts = StreamTimeouts::suggested(self.profile);
        if let Some(secs) = self.handshake_timeout_secs {
            timeouts.handshake = Duration::from_secs(secs);
        }
        if let Some(secs) = self.idle_timeout_secs {
            timeouts.idle = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(pings) = self.keep_alive_pings {
            timeouts.keep_alive_pings = pings;
        }
        timeouts
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            profile: Role::Client,
            handshake_timeout_secs: None,
            idle_timeout_secs: None,
            keep_alive_pings: None,
            max_message_size: Some(64 << 20),
        }
    }
}

/// Trust anchor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Load the platform's native trust store.
    pub native_roots: bool,

    /// Add the bundled Mozilla root set.
    pub webpki_roots: bool,

    /// Additional PEM bundles to trust.
    pub extra_ca_files: Vec<String>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            native_roots: true,
            webpki_roots: true,
            extra_ca_files: Vec::new(),
        }
    }
}

/// Headers sent with the upgrade request.
///
/// `User-Agent` is always replaced by the client's own version string.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpgradeConfig {
    pub headers: BTreeMap<String, String>,
}

/// How session reports are written to stdout/stderr.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// `128 bytes received` / `connect: connection refused`
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Format of the per-event reports.
    pub report_format: ReportFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            report_format: ReportFormat::Text,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
