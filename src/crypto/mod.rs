//! Cryptographic primitives below the record layer.
//!
//! * [`engine`] raw block and stream ciphers.
//! * [`mode`] record protection built on engines.
//! * [`hash`], [`prf`] and [`hkdf`] for MACs and key derivation.
//! * [`signing`] for ServerKeyExchange signatures.

pub mod engine;
pub mod hash;
pub mod hkdf;
pub mod mode;
pub mod prf;
pub mod signing;
