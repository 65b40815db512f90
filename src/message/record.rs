use nom::bytes::complete::take;
use nom::number::complete::be_u16;
use nom::IResult;

use crate::types::{ContentType, Protocol, ProtocolVersion};
use crate::util::be_u48;

/// Largest plaintext fragment (2^14).
pub const MAX_FRAGMENT_LEN: usize = 16384;

/// Largest protected fragment, plaintext plus 2048 bytes of expansion.
pub const MAX_CIPHERTEXT_LEN: usize = MAX_FRAGMENT_LEN + 2048;

/// Record header.
///
/// TLS records are `type, version, length`. DTLS inserts a 2-byte epoch and
/// 6-byte sequence number before the length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub content_type: ContentType,
    pub version: ProtocolVersion,
    pub epoch: u16,
    pub sequence_number: u64,
    pub length: u16,
}

impl RecordHeader {
    pub const TLS_LEN: usize = 5;
    pub const DTLS_LEN: usize = 13;

    pub fn len(protocol: Protocol) -> usize {
        match protocol {
            Protocol::Tls => Self::TLS_LEN,
            Protocol::Dtls => Self::DTLS_LEN,
        }
    }

    /// Epoch and sequence as the 8 bytes the authenticator consumes.
    pub fn explicit_sequence(&self) -> [u8; 8] {
        let mut out = self.sequence_number.to_be_bytes();
        out[..2].copy_from_slice(&self.epoch.to_be_bytes());
        out
    }

    pub fn parse(input: &[u8], protocol: Protocol) -> IResult<&[u8], RecordHeader> {
        let (input, content_type) = ContentType::parse(input)?;
        let (input, version) = ProtocolVersion::parse(input)?;
        let (input, epoch, sequence_number) = match protocol {
            Protocol::Tls => (input, 0, 0),
            Protocol::Dtls => {
                let (input, epoch) = be_u16(input)?;
                let (input, seq) = be_u48(input)?;
                (input, epoch, seq)
            }
        };
        let (input, length) = be_u16(input)?;
        Ok((
            input,
            RecordHeader {
                content_type,
                version,
                epoch,
                sequence_number,
                length,
            },
        ))
    }

    pub fn serialize(&self, protocol: Protocol, output: &mut Vec<u8>) {
        output.push(self.content_type.as_u8());
        self.version.serialize(output);
        if protocol == Protocol::Dtls {
            output.extend_from_slice(&self.epoch.to_be_bytes());
            output.extend_from_slice(&self.sequence_number.to_be_bytes()[2..]);
        }
        output.extend_from_slice(&self.length.to_be_bytes());
    }
}

/// Parse one record, returning its header and fragment.
pub fn parse_record(input: &[u8], protocol: Protocol) -> IResult<&[u8], (RecordHeader, &[u8])> {
    let (input, header) = RecordHeader::parse(input, protocol)?;
    let (input, fragment) = take(header.length)(input)?;
    Ok((input, (header, fragment)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DTLS_RECORD: &[u8] = &[
        0x16, // ContentType::Handshake
        0xFE, 0xFD, // ProtocolVersion::Dtls1_2
        0x00, 0x01, // epoch
        0x00, 0x00, 0x00, 0x00, 0x00, 0x05, // sequence_number
        0x00, 0x02, // length
        0x01, 0x02, // fragment
    ];

    #[test]
    fn dtls_roundtrip() {
        let (rest, (header, fragment)) = parse_record(DTLS_RECORD, Protocol::Dtls).unwrap();
        assert!(rest.is_empty());
        assert_eq!(header.epoch, 1);
        assert_eq!(header.sequence_number, 5);
        assert_eq!(fragment, &[1, 2]);
        assert_eq!(header.explicit_sequence(), [0, 1, 0, 0, 0, 0, 0, 5]);

        let mut out = Vec::new();
        header.serialize(Protocol::Dtls, &mut out);
        out.extend_from_slice(fragment);
        assert_eq!(out, DTLS_RECORD);
    }

    #[test]
    fn tls_header() {
        let data = [0x17, 0x03, 0x03, 0x00, 0x01, 0xFF];
        let (_, (header, fragment)) = parse_record(&data, Protocol::Tls).unwrap();
        assert_eq!(header.content_type, ContentType::ApplicationData);
        assert_eq!(header.version, ProtocolVersion::Tls1_2);
        assert_eq!(fragment, &[0xFF]);
    }

    #[test]
    fn truncated_fragment_is_incomplete() {
        let data = [0x17, 0x03, 0x03, 0x00, 0x05, 0xFF];
        assert!(parse_record(&data, Protocol::Tls).is_err());
    }
}
