use nom::number::complete::be_u16;
use nom::IResult;

/// Signature schemes (RFC 8446 section 4.2.3).
///
/// TLS1.2 hash/signature pairs share the same code points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureScheme {
    RsaPkcs1Sha1,
    EcdsaSha1,
    RsaPkcs1Sha256,
    RsaPkcs1Sha384,
    RsaPkcs1Sha512,
    EcdsaSecp256r1Sha256,
    EcdsaSecp384r1Sha384,
    EcdsaSecp521r1Sha512,
    RsaPssRsaeSha256,
    RsaPssRsaeSha384,
    RsaPssRsaeSha512,
    Ed25519,
    Ed448,
    RsaPssPssSha256,
    RsaPssPssSha384,
    RsaPssPssSha512,
    DsaSha256,
    Unknown(u16),
}

impl SignatureScheme {
    pub fn from_u16(value: u16) -> Self {
        use SignatureScheme::*;
        match value {
            0x0201 => RsaPkcs1Sha1,
            0x0203 => EcdsaSha1,
            0x0401 => RsaPkcs1Sha256,
            0x0501 => RsaPkcs1Sha384,
            0x0601 => RsaPkcs1Sha512,
            0x0403 => EcdsaSecp256r1Sha256,
            0x0503 => EcdsaSecp384r1Sha384,
            0x0603 => EcdsaSecp521r1Sha512,
            0x0804 => RsaPssRsaeSha256,
            0x0805 => RsaPssRsaeSha384,
            0x0806 => RsaPssRsaeSha512,
            0x0807 => Ed25519,
            0x0808 => Ed448,
            0x0809 => RsaPssPssSha256,
            0x080A => RsaPssPssSha384,
            0x080B => RsaPssPssSha512,
            0x0402 => DsaSha256,
            _ => Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        use SignatureScheme::*;
        match self {
            RsaPkcs1Sha1 => 0x0201,
            EcdsaSha1 => 0x0203,
            RsaPkcs1Sha256 => 0x0401,
            RsaPkcs1Sha384 => 0x0501,
            RsaPkcs1Sha512 => 0x0601,
            EcdsaSecp256r1Sha256 => 0x0403,
            EcdsaSecp384r1Sha384 => 0x0503,
            EcdsaSecp521r1Sha512 => 0x0603,
            RsaPssRsaeSha256 => 0x0804,
            RsaPssRsaeSha384 => 0x0805,
            RsaPssRsaeSha512 => 0x0806,
            Ed25519 => 0x0807,
            Ed448 => 0x0808,
            RsaPssPssSha256 => 0x0809,
            RsaPssPssSha384 => 0x080A,
            RsaPssPssSha512 => 0x080B,
            DsaSha256 => 0x0402,
            Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], SignatureScheme> {
        let (input, value) = be_u16(input)?;
        Ok((input, Self::from_u16(value)))
    }

    /// Default advertised list, strongest first.
    pub fn defaults() -> &'static [SignatureScheme] {
        use SignatureScheme::*;
        &[
            EcdsaSecp256r1Sha256,
            EcdsaSecp384r1Sha384,
            RsaPssRsaeSha256,
            RsaPssRsaeSha384,
            RsaPkcs1Sha256,
            RsaPkcs1Sha384,
            Ed25519,
            RsaPkcs1Sha1,
        ]
    }
}
