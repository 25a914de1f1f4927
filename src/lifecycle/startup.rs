//! Startup orchestration.
//!
//! # Responsibilities
//! - Apply command line overrides to the loaded configuration
//! - Build the trust store and TLS client
//! - Assemble a session wired to the real network layers

use thiserror::Error;

use crate::config::{ClientConfig, ConfigError};
use crate::lifecycle::shutdown::Shutdown;
use crate::net::resolver::SystemResolver;
use crate::net::tls::{load_trust_store, RustlsChannel, TrustConfigurationError};
use crate::net::transport::TcpTransport;
use crate::session::{ConsoleReporter, Session, SessionSettings};

/// A session over TCP, rustls and the system resolver.
pub type NetworkSession = Session<SystemResolver, TcpTransport, RustlsChannel>;

/// Errors that stop the client before the session starts.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("trust configuration: {0}")]
    Trust(#[from] TrustConfigurationError),
}

/// Target overrides given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<String>,
    pub path: Option<String>,
}

impl Overrides {
    pub fn apply(self, config: &mut ClientConfig) {
        if let Some(host) = self.host {
            config.target.host = host;
        }
        if let Some(port) = self.port {
            config.target.port = port;
        }
        if let Some(path) = self.path {
            config.target.path = path;
        }
    }
}

/// Assemble a session for `config`. Fails before any network I/O.
pub fn build_session(config: &ClientConfig, shutdown: &Shutdown) -> Result<NetworkSession, StartupError> {
    let settings = SessionSettings::from_config(config)?;
    let roots = load_trust_store(&config.tls)?;
    let secure = RustlsChannel::new(roots)?;
    let reporter = ConsoleReporter::new(config.observability.report_format);

    Ok(Session::new(SystemResolver, TcpTransport, secure, settings, reporter).with_shutdown(shutdown.subscribe()))
}
