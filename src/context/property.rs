//! Typed, named negotiation slots.
//!
//! A [`Property<I, O>`] names one thing the two sides agree on. `I` is what a
//! side offers (the negotiable value, usually a preference list) and `O` the
//! single value both settled on (the negotiated value).

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use crate::extension::MaxFragmentLength;
use crate::suite::CipherSuite;
use crate::types::{
    CompressionMethod, EcPointFormat, NamedGroup, ProtocolVersion, PskKeyExchangeMode,
    SignatureScheme,
};

pub struct Property<I, O> {
    name: &'static str,
    _types: PhantomData<fn() -> (I, O)>,
}

impl<I, O> Property<I, O> {
    pub const fn new(name: &'static str) -> Self {
        Property {
            name,
            _types: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<I, O> fmt::Debug for Property<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Property({})", self.name)
    }
}

/// A public key offered or selected through key_share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyShareEntry {
    pub group: NamedGroup,
    pub public: Vec<u8>,
}

pub const VERSION: Property<Vec<ProtocolVersion>, ProtocolVersion> = Property::new("version");
pub const CIPHER: Property<Vec<u16>, &'static CipherSuite> = Property::new("cipher");
pub const COMPRESSION: Property<Vec<CompressionMethod>, CompressionMethod> =
    Property::new("compression");
pub const SERVER_NAME: Property<String, String> = Property::new("server_name");
pub const MAX_FRAGMENT_LENGTH: Property<MaxFragmentLength, MaxFragmentLength> =
    Property::new("max_fragment_length");
pub const SUPPORTED_GROUPS: Property<Vec<NamedGroup>, NamedGroup> =
    Property::new("supported_groups");
pub const EC_POINT_FORMATS: Property<Vec<EcPointFormat>, EcPointFormat> =
    Property::new("ec_point_formats");
/// Negotiated value is the peer's list, used when choosing a signature.
pub const SIGNATURE_ALGORITHMS: Property<Vec<SignatureScheme>, Vec<SignatureScheme>> =
    Property::new("signature_algorithms");
pub const ALPN: Property<Vec<String>, String> = Property::new("alpn");
pub const NPN: Property<Vec<String>, String> = Property::new("npn");
pub const ENCRYPT_THEN_MAC: Property<bool, bool> = Property::new("encrypt_then_mac");
pub const EXTENDED_MASTER_SECRET: Property<bool, bool> = Property::new("extended_master_secret");
pub const POST_HANDSHAKE_AUTH: Property<bool, bool> = Property::new("post_handshake_auth");
/// RFC 5746, signalled by renegotiation_info or the SCSV.
pub const SECURE_RENEGOTIATION: Property<bool, bool> = Property::new("secure_renegotiation");
/// Negotiable is the groups we sent shares for, negotiated the peer's share.
pub const KEY_SHARE: Property<Vec<NamedGroup>, KeyShareEntry> = Property::new("key_share");
pub const PSK_KEY_EXCHANGE_MODES: Property<Vec<PskKeyExchangeMode>, PskKeyExchangeMode> =
    Property::new("psk_key_exchange_modes");

/// Heterogeneous map from property name to value.
#[derive(Default)]
pub struct PropertyMap {
    values: HashMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Insert, returning whether a value was already present.
    pub fn insert<T: Any + Send + Sync>(&mut self, name: &'static str, value: T) -> bool {
        self.values.insert(name, Box::new(value)).is_some()
    }

    /// `None` when absent or stored with another type.
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.values.get(name)?.downcast_ref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for PropertyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.values.keys().collect();
        names.sort();
        f.debug_set().entries(names).finish()
    }
}
