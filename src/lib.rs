//! tlscore
//!
//! Protocol core for SSL 3.0 through TLS 1.3, with DTLS 1.0 through 1.3
//! framing. The crate negotiates a connection one handshake message at a
//! time and protects records with the derived keys. It never opens sockets:
//! bytes come from and go to a [`Transport`], certificate chains are judged by
//! a [`CertificateValidator`].
//!
//! A [`NegotiationContext`] holds the state of one side of a connection.
//! Hellos are built from the cipher suites and [extensions](extension) in the
//! [`Config`]. What each side offered and what was agreed on is kept apart as
//! *negotiable* and *negotiated* [properties](context::property).
//!
//! ```no_run
//! use std::sync::Arc;
//! use tlscore::{Config, Mode, NegotiationContext};
//!
//! let config = Arc::new(Config::default());
//! let mut client = NegotiationContext::new(Mode::Client, config);
//! let hello = client.client_hello().unwrap();
//! // hand `hello` to the transport
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]
// #![deny(missing_docs)]

#[macro_use]
extern crate log;

pub mod alert;
mod auth;
mod buffer;
pub mod config;
pub mod context;
pub mod crypto;
mod error;
pub mod extension;
pub mod kx;
pub mod message;
pub mod record;
pub mod secret;
pub mod suite;
pub mod transport;
pub mod types;
mod util;

pub use alert::{Alert, AlertDescription, AlertLevel};
pub use config::{Config, ConfigBuilder, Psk};
pub use context::{Mode, NegotiationContext};
pub use error::Error;
pub use record::{Record, RecordLayer};
pub use suite::CipherSuite;
pub use transport::{Address, CertificateValidator, Transport};
pub use types::{ContentType, Protocol, ProtocolVersion};
