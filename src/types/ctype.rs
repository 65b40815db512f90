use std::fmt;

use nom::number::complete::be_u8;
use nom::IResult;

/// Record layer content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    ChangeCipherSpec,
    Alert,
    Handshake,
    ApplicationData,
    Heartbeat,
    Ack,
    Unknown(u8),
}

impl ContentType {
    pub fn from_u8(value: u8) -> Self {
        use ContentType::*;
        match value {
            20 => ChangeCipherSpec,
            21 => Alert,
            22 => Handshake,
            23 => ApplicationData,
            24 => Heartbeat,
            26 => Ack,
            _ => Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        use ContentType::*;
        match self {
            ChangeCipherSpec => 20,
            Alert => 21,
            Handshake => 22,
            ApplicationData => 23,
            Heartbeat => 24,
            Ack => 26,
            Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ContentType> {
        let (input, byte) = be_u8(input)?;
        Ok((input, Self::from_u8(byte)))
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
