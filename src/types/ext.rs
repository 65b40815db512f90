use nom::number::complete::be_u16;
use nom::IResult;

use super::grease;

/// Extension type registry (IANA "TLS ExtensionType Values").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionType {
    ServerName,
    MaxFragmentLength,
    StatusRequest,
    SupportedGroups,
    EcPointFormats,
    SignatureAlgorithms,
    UseSrtp,
    Heartbeat,
    ApplicationLayerProtocolNegotiation,
    Padding,
    EncryptThenMac,
    ExtendedMasterSecret,
    SessionTicket,
    PreSharedKey,
    EarlyData,
    SupportedVersions,
    Cookie,
    PskKeyExchangeModes,
    CertificateAuthorities,
    PostHandshakeAuth,
    SignatureAlgorithmsCert,
    KeyShare,
    NextProtocolNegotiation,
    RenegotiationInfo,
    Unknown(u16),
}

impl ExtensionType {
    pub fn from_u16(value: u16) -> Self {
        use ExtensionType::*;
        match value {
            0x0000 => ServerName,
            0x0001 => MaxFragmentLength,
            0x0005 => StatusRequest,
            0x000A => SupportedGroups,
            0x000B => EcPointFormats,
            0x000D => SignatureAlgorithms,
            0x000E => UseSrtp,
            0x000F => Heartbeat,
            0x0010 => ApplicationLayerProtocolNegotiation,
            0x0015 => Padding,
            0x0016 => EncryptThenMac,
            0x0017 => ExtendedMasterSecret,
            0x0023 => SessionTicket,
            0x0029 => PreSharedKey,
            0x002A => EarlyData,
            0x002B => SupportedVersions,
            0x002C => Cookie,
            0x002D => PskKeyExchangeModes,
            0x002F => CertificateAuthorities,
            0x0031 => PostHandshakeAuth,
            0x0032 => SignatureAlgorithmsCert,
            0x0033 => KeyShare,
            0x3374 => NextProtocolNegotiation,
            0xFF01 => RenegotiationInfo,
            _ => Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        use ExtensionType::*;
        match self {
            ServerName => 0x0000,
            MaxFragmentLength => 0x0001,
            StatusRequest => 0x0005,
            SupportedGroups => 0x000A,
            EcPointFormats => 0x000B,
            SignatureAlgorithms => 0x000D,
            UseSrtp => 0x000E,
            Heartbeat => 0x000F,
            ApplicationLayerProtocolNegotiation => 0x0010,
            Padding => 0x0015,
            EncryptThenMac => 0x0016,
            ExtendedMasterSecret => 0x0017,
            SessionTicket => 0x0023,
            PreSharedKey => 0x0029,
            EarlyData => 0x002A,
            SupportedVersions => 0x002B,
            Cookie => 0x002C,
            PskKeyExchangeModes => 0x002D,
            CertificateAuthorities => 0x002F,
            PostHandshakeAuth => 0x0031,
            SignatureAlgorithmsCert => 0x0032,
            KeyShare => 0x0033,
            NextProtocolNegotiation => 0x3374,
            RenegotiationInfo => 0xFF01,
            Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ExtensionType> {
        let (input, value) = be_u16(input)?;
        Ok((input, Self::from_u16(value)))
    }

    pub fn is_grease(&self) -> bool {
        matches!(self, ExtensionType::Unknown(v) if grease::is_grease(*v))
    }
}
