//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! host, port
//!     → resolver.rs (candidate addresses)
//!     → transport.rs (first candidate that connects)
//!     → tls.rs (SNI, verified client handshake)
//!     → upgrade.rs (WebSocket handshake, message reads, close)
//!     → hand messages to the session read loop
//! ```
//!
//! # Design Decisions
//! - Resolver, Transport and SecureChannel are traits so the session can
//!   be driven by test doubles
//! - Peer verification cannot be turned off
//! - The candidate walk is sequential; the first success wins

pub mod resolver;
pub mod tls;
pub mod transport;
pub mod upgrade;

pub use resolver::{Resolver, SystemResolver};
pub use tls::{RustlsChannel, SecureChannel};
pub use transport::{TcpTransport, Transport};
