use nom::number::complete::be_u16;
use nom::IResult;

use super::grease;

/// Key exchange groups (RFC 8422, RFC 7919, RFC 8446).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedGroup {
    Secp256r1,
    Secp384r1,
    Secp521r1,
    X25519,
    X448,
    Ffdhe2048,
    Ffdhe3072,
    Ffdhe4096,
    Ffdhe6144,
    Ffdhe8192,
    Unknown(u16),
}

impl NamedGroup {
    pub fn from_u16(value: u16) -> Self {
        use NamedGroup::*;
        match value {
            0x0017 => Secp256r1,
            0x0018 => Secp384r1,
            0x0019 => Secp521r1,
            0x001D => X25519,
            0x001E => X448,
            0x0100 => Ffdhe2048,
            0x0101 => Ffdhe3072,
            0x0102 => Ffdhe4096,
            0x0103 => Ffdhe6144,
            0x0104 => Ffdhe8192,
            _ => Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        use NamedGroup::*;
        match self {
            Secp256r1 => 0x0017,
            Secp384r1 => 0x0018,
            Secp521r1 => 0x0019,
            X25519 => 0x001D,
            X448 => 0x001E,
            Ffdhe2048 => 0x0100,
            Ffdhe3072 => 0x0101,
            Ffdhe4096 => 0x0102,
            Ffdhe6144 => 0x0103,
            Ffdhe8192 => 0x0104,
            Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], NamedGroup> {
        let (input, value) = be_u16(input)?;
        Ok((input, Self::from_u16(value)))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.as_u16().to_be_bytes());
    }

    pub fn is_ecdhe(&self) -> bool {
        use NamedGroup::*;
        matches!(self, Secp256r1 | Secp384r1 | Secp521r1 | X25519 | X448)
    }

    pub fn is_ffdhe(&self) -> bool {
        use NamedGroup::*;
        matches!(
            self,
            Ffdhe2048 | Ffdhe3072 | Ffdhe4096 | Ffdhe6144 | Ffdhe8192
        )
    }

    pub fn is_grease(&self) -> bool {
        matches!(self, NamedGroup::Unknown(v) if grease::is_grease(*v))
    }

    /// Groups this crate can generate ephemeral key pairs for.
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            NamedGroup::X25519 | NamedGroup::Secp256r1 | NamedGroup::Secp384r1
        )
    }

    /// Default preference order.
    pub fn supported() -> &'static [NamedGroup] {
        &[NamedGroup::X25519, NamedGroup::Secp256r1, NamedGroup::Secp384r1]
    }
}
