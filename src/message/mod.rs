//! Wire framing: record and handshake headers, hellos, certificates and key
//! exchange bodies.
//!
//! Parsers are built on `nom` and take the [`Protocol`](crate::types::Protocol)
//! where TLS and DTLS framing differ.

mod certificate;
mod client_hello;
mod client_key_exchange;
pub mod extension;
pub mod handshake;
mod id;
mod next_protocol;
mod random;
pub mod record;
mod server_hello;
mod server_key_exchange;

pub use certificate::CertificateList;
pub use client_hello::ClientHello;
pub use client_key_exchange::ClientKeyExchange;
pub use extension::Extension;
pub use handshake::{Header, MessageType};
pub use id::{Cookie, InvalidLength, SessionId};
pub use next_protocol::NextProtocol;
pub use random::{Random, DOWNGRADE_TLS11, DOWNGRADE_TLS12};
pub use record::RecordHeader;
pub use server_hello::ServerHello;
pub use server_key_exchange::{signature_scheme, KxParams, ServerKeyExchange};
