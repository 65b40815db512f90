use std::cmp::Ordering;
use std::fmt;

use nom::number::complete::be_u16;
use nom::IResult;

use super::grease;

/// Stream (TLS) or datagram (DTLS) flavour of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tls,
    Dtls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    Ssl3_0,
    Tls1_0,
    Tls1_1,
    Tls1_2,
    Tls1_3,
    Dtls1_0,
    Dtls1_2,
    Dtls1_3,
    Unknown(u16),
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::Unknown(0)
    }
}

impl ProtocolVersion {
    pub const ALL: &'static [ProtocolVersion] = &[
        ProtocolVersion::Ssl3_0,
        ProtocolVersion::Tls1_0,
        ProtocolVersion::Tls1_1,
        ProtocolVersion::Tls1_2,
        ProtocolVersion::Tls1_3,
        ProtocolVersion::Dtls1_0,
        ProtocolVersion::Dtls1_2,
        ProtocolVersion::Dtls1_3,
    ];

    pub fn from_u16(value: u16) -> Self {
        use ProtocolVersion::*;
        match value {
            0x0300 => Ssl3_0,
            0x0301 => Tls1_0,
            0x0302 => Tls1_1,
            0x0303 => Tls1_2,
            0x0304 => Tls1_3,
            0xFEFF => Dtls1_0,
            0xFEFD => Dtls1_2,
            0xFEFC => Dtls1_3,
            _ => Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        use ProtocolVersion::*;
        match self {
            Ssl3_0 => 0x0300,
            Tls1_0 => 0x0301,
            Tls1_1 => 0x0302,
            Tls1_2 => 0x0303,
            Tls1_3 => 0x0304,
            Dtls1_0 => 0xFEFF,
            Dtls1_2 => 0xFEFD,
            Dtls1_3 => 0xFEFC,
            Unknown(value) => *value,
        }
    }

    pub fn major(&self) -> u8 {
        (self.as_u16() >> 8) as u8
    }

    pub fn minor(&self) -> u8 {
        self.as_u16() as u8
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ProtocolVersion> {
        let (input, version) = be_u16(input)?;
        Ok((input, Self::from_u16(version)))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.as_u16().to_be_bytes());
    }

    pub fn protocol(&self) -> Protocol {
        use ProtocolVersion::*;
        match self {
            Dtls1_0 | Dtls1_2 | Dtls1_3 => Protocol::Dtls,
            _ => Protocol::Tls,
        }
    }

    pub fn is_dtls(&self) -> bool {
        self.protocol() == Protocol::Dtls
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ProtocolVersion::Unknown(_))
    }

    pub fn is_grease(&self) -> bool {
        matches!(self, ProtocolVersion::Unknown(v) if grease::is_grease(*v))
    }

    /// Position on the shared TLS timeline.
    ///
    /// DTLS1.0 sits on TLS1.1, DTLS1.2 on TLS1.2 and DTLS1.3 on TLS1.3.
    pub fn rank(&self) -> u8 {
        use ProtocolVersion::*;
        match self {
            Ssl3_0 => 1,
            Tls1_0 => 2,
            Tls1_1 | Dtls1_0 => 3,
            Tls1_2 | Dtls1_2 => 4,
            Tls1_3 | Dtls1_3 => 5,
            Unknown(_) => 0,
        }
    }

    /// TLS1.3 and DTLS1.3.
    pub fn is_tls13(&self) -> bool {
        self.rank() == 5
    }

    /// Versions that use the suite hash for the PRF (TLS1.2, DTLS1.2).
    pub fn uses_suite_prf(&self) -> bool {
        self.rank() >= 4
    }

    /// CBC records carry an explicit IV from TLS1.1/DTLS1.0 onwards.
    pub fn has_explicit_cbc_iv(&self) -> bool {
        self.rank() >= 3
    }

    /// The version written in the legacy `version` field of records and hellos.
    pub fn legacy(&self) -> ProtocolVersion {
        match self {
            ProtocolVersion::Tls1_3 => ProtocolVersion::Tls1_2,
            ProtocolVersion::Dtls1_3 => ProtocolVersion::Dtls1_2,
            v => *v,
        }
    }
}

impl PartialOrd for ProtocolVersion {
    /// Versions of different protocols are not comparable.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }
        if self.protocol() != other.protocol() || !self.is_known() || !other.is_known() {
            return None;
        }
        Some(self.rank().cmp(&other.rank()))
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ProtocolVersion::*;
        match self {
            Ssl3_0 => write!(f, "SSL 3.0"),
            Tls1_0 => write!(f, "TLS 1.0"),
            Tls1_1 => write!(f, "TLS 1.1"),
            Tls1_2 => write!(f, "TLS 1.2"),
            Tls1_3 => write!(f, "TLS 1.3"),
            Dtls1_0 => write!(f, "DTLS 1.0"),
            Dtls1_2 => write!(f, "DTLS 1.2"),
            Dtls1_3 => write!(f, "DTLS 1.3"),
            Unknown(v) => write!(f, "Unknown(0x{:04x})", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values() {
        for v in ProtocolVersion::ALL {
            assert_eq!(ProtocolVersion::from_u16(v.as_u16()), *v);
        }
        assert_eq!(ProtocolVersion::Dtls1_2.major(), 0xFE);
        assert_eq!(ProtocolVersion::Dtls1_2.minor(), 0xFD);
    }

    #[test]
    fn ordering_within_protocol() {
        assert!(ProtocolVersion::Tls1_3 > ProtocolVersion::Tls1_2);
        assert!(ProtocolVersion::Dtls1_0 < ProtocolVersion::Dtls1_2);
        assert_eq!(
            ProtocolVersion::Tls1_2.partial_cmp(&ProtocolVersion::Dtls1_2),
            None
        );
    }

    #[test]
    fn grease_versions() {
        assert!(ProtocolVersion::from_u16(0x7A7A).is_grease());
        assert!(!ProtocolVersion::from_u16(0x7A7B).is_grease());
    }
}
