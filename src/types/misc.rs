use nom::number::complete::be_u8;
use nom::IResult;

/// Record compression (RFC 3749). Only `Null` is ever offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionMethod {
    #[default]
    Null,
    Deflate,
    Unknown(u8),
}

impl CompressionMethod {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => CompressionMethod::Null,
            0x01 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            CompressionMethod::Null => 0x00,
            CompressionMethod::Deflate => 0x01,
            CompressionMethod::Unknown(value) => *value,
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, CompressionMethod::Null)
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], CompressionMethod> {
        let (input, value) = be_u8(input)?;
        Ok((input, Self::from_u8(value)))
    }
}

/// EC point formats (RFC 8422 section 5.1.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EcPointFormat {
    #[default]
    Uncompressed,
    AnsiX962CompressedPrime,
    AnsiX962CompressedChar2,
    Unknown(u8),
}

impl EcPointFormat {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => EcPointFormat::Uncompressed,
            1 => EcPointFormat::AnsiX962CompressedPrime,
            2 => EcPointFormat::AnsiX962CompressedChar2,
            _ => EcPointFormat::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            EcPointFormat::Uncompressed => 0,
            EcPointFormat::AnsiX962CompressedPrime => 1,
            EcPointFormat::AnsiX962CompressedChar2 => 2,
            EcPointFormat::Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], EcPointFormat> {
        let (input, value) = be_u8(input)?;
        Ok((input, Self::from_u8(value)))
    }
}

/// TLS1.3 PSK key exchange modes (RFC 8446 section 4.2.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PskKeyExchangeMode {
    PskKe,
    PskDheKe,
    Unknown(u8),
}

impl PskKeyExchangeMode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => PskKeyExchangeMode::PskKe,
            1 => PskKeyExchangeMode::PskDheKe,
            _ => PskKeyExchangeMode::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            PskKeyExchangeMode::PskKe => 0,
            PskKeyExchangeMode::PskDheKe => 1,
            PskKeyExchangeMode::Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], PskKeyExchangeMode> {
        let (input, value) = be_u8(input)?;
        Ok((input, Self::from_u8(value)))
    }
}
