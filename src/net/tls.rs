//! TLS configuration, trust store loading and the client handshake.
//!
//! # Responsibilities
//! - Build the trust store from native roots, the Mozilla bundle and
//!   operator-supplied PEM files
//! - Produce the SNI value for a host
//! - Run the client handshake with mandatory peer verification

use std::fs::File;
use std::future::Future;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::pki_types::{InvalidDnsNameError, ServerName};
use rustls::{ClientConfig, RootCertStore};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use crate::config::TlsConfig;

/// Startup-time failure to build the trust configuration.
#[derive(Debug, Error)]
pub enum TrustConfigurationError {
    #[error("failed to read CA bundle {path:?}: {source}")]
    ReadBundle { path: PathBuf, source: io::Error },

    #[error("CA bundle {path:?} contains no certificates")]
    EmptyBundle { path: PathBuf },

    #[error("certificate in {path:?} rejected: {source}")]
    InvalidCertificate { path: PathBuf, source: rustls::Error },

    #[error("trust store is empty")]
    NoAnchors,

    #[error("TLS client configuration failed: {0}")]
    Client(#[from] rustls::Error),
}

/// Secure channel established over a raw stream.
pub trait SecureChannel<S> {
    type Stream: AsyncRead + AsyncWrite + Unpin;

    /// Server name indication value for `host`.
    fn server_name(&self, host: &str) -> Result<ServerName<'static>, InvalidDnsNameError> {
        ServerName::try_from(host.to_owned())
    }

    /// Client-side handshake. Must fail unless the peer presents a
    /// certificate that validates for `server_name`.
    fn handshake(&self, server_name: ServerName<'static>, stream: S) -> impl Future<Output = io::Result<Self::Stream>>;
}

/// Load trust anchors from every source enabled in `config`.
pub fn load_trust_store(config: &TlsConfig) -> Result<RootCertStore, TrustConfigurationError> {
    let mut roots = RootCertStore::empty();

    if config.native_roots {
        let native = rustls_native_certs::load_native_certs();
        for error in &native.errors {
            tracing::warn!(error = %error, "Native trust store partially unreadable");
        }
        let (added, ignored) = roots.add_parsable_certificates(native.certs);
        tracing::debug!(added, ignored, "Loaded native trust anchors");
    }

    if config.webpki_roots {
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    for path in &config.extra_ca_files {
        add_pem_bundle(&mut roots, Path::new(path))?;
    }

    if roots.is_empty() {
        return Err(TrustConfigurationError::NoAnchors);
    }

    tracing::info!(anchors = roots.len(), "Trust store ready");
    Ok(roots)
}

fn add_pem_bundle(roots: &mut RootCertStore, path: &Path) -> Result<(), TrustConfigurationError> {
    let read_err = |source| TrustConfigurationError::ReadBundle { path: path.to_path_buf(), source };

    let mut reader = BufReader::new(File::open(path).map_err(read_err)?);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_err)?;

    if certs.is_empty() {
        return Err(TrustConfigurationError::EmptyBundle { path: path.to_path_buf() });
    }

    for cert in certs {
        roots.add(cert).map_err(|source| TrustConfigurationError::InvalidCertificate {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// rustls-backed secure channel.
#[derive(Clone)]
pub struct RustlsChannel {
    connector: TlsConnector,
}

impl RustlsChannel {
    /// Client configuration verifying peers against `roots`.
    ///
    /// TLS 1.2 and 1.3 are offered. The webpki verifier rejects a peer
    /// that presents no certificate or one that does not chain to `roots`.
    pub fn new(roots: RootCertStore) -> Result<Self, TrustConfigurationError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider)
            .with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])?
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(Self { connector: TlsConnector::from(Arc::new(config)) })
    }
}

impl std::fmt::Debug for RustlsChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RustlsChannel").finish_non_exhaustive()
    }
}

impl<S> SecureChannel<S> for RustlsChannel
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    type Stream = TlsStream<S>;

    async fn handshake(&self, server_name: ServerName<'static>, stream: S) -> io::Result<TlsStream<S>> {
        self.connector.connect(server_name, stream).await
    }
}
