//! Protocol enumerations shared by framing, extensions and negotiation.

mod ctype;
pub use ctype::ContentType;

mod version;
pub use version::{Protocol, ProtocolVersion};

mod group;
pub use group::NamedGroup;

mod signature;
pub use signature::SignatureScheme;

mod ext;
pub use ext::ExtensionType;

mod misc;
pub use misc::{CompressionMethod, EcPointFormat, PskKeyExchangeMode};

pub mod grease;
