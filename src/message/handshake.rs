use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u24, be_u8};
use nom::IResult;

use crate::types::Protocol;
use crate::Error;

/// Handshake message types across SSL3.0 to TLS1.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    HelloRequest,
    ClientHello,
    ServerHello,
    HelloVerifyRequest,
    NewSessionTicket,
    EndOfEarlyData,
    EncryptedExtensions,
    Certificate,
    ServerKeyExchange,
    CertificateRequest,
    ServerHelloDone,
    CertificateVerify,
    ClientKeyExchange,
    Finished,
    KeyUpdate,
    NextProtocol,
    MessageHash,
    Unknown(u8),
}

impl Default for MessageType {
    fn default() -> Self {
        Self::Unknown(0)
    }
}

impl MessageType {
    pub fn from_u8(value: u8) -> Self {
        use MessageType::*;
        match value {
            0 => HelloRequest,
            1 => ClientHello,
            2 => ServerHello,
            3 => HelloVerifyRequest,
            4 => NewSessionTicket,
            5 => EndOfEarlyData,
            8 => EncryptedExtensions,
            11 => Certificate,
            12 => ServerKeyExchange,
            13 => CertificateRequest,
            14 => ServerHelloDone,
            15 => CertificateVerify,
            16 => ClientKeyExchange,
            20 => Finished,
            24 => KeyUpdate,
            67 => NextProtocol,
            254 => MessageHash,
            _ => Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        use MessageType::*;
        match self {
            HelloRequest => 0,
            ClientHello => 1,
            ServerHello => 2,
            HelloVerifyRequest => 3,
            NewSessionTicket => 4,
            EndOfEarlyData => 5,
            EncryptedExtensions => 8,
            Certificate => 11,
            ServerKeyExchange => 12,
            CertificateRequest => 13,
            ServerHelloDone => 14,
            CertificateVerify => 15,
            ClientKeyExchange => 16,
            Finished => 20,
            KeyUpdate => 24,
            NextProtocol => 67,
            MessageHash => 254,
            Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], MessageType> {
        let (input, byte) = be_u8(input)?;
        Ok((input, Self::from_u8(byte)))
    }
}

/// Handshake message header.
///
/// TLS carries type and a 24-bit length. DTLS adds message sequence and
/// fragment offset/length so messages can be reassembled from datagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub msg_type: MessageType,
    pub length: u32,
    pub message_seq: u16,
    pub fragment_offset: u32,
    pub fragment_length: u32,
}

impl Header {
    pub const TLS_LEN: usize = 4;
    pub const DTLS_LEN: usize = 12;
    /// Largest body a 24-bit length can describe.
    pub const MAX_LENGTH: usize = 0xFF_FFFF;

    pub fn new(msg_type: MessageType, length: u32, message_seq: u16) -> Self {
        Header {
            msg_type,
            length,
            message_seq,
            fragment_offset: 0,
            fragment_length: length,
        }
    }

    /// Header for an unfragmented body of `body_len` bytes.
    pub fn for_body(msg_type: MessageType, body_len: usize, message_seq: u16) -> Result<Self, Error> {
        if body_len > Self::MAX_LENGTH {
            return Err(Error::internal(format!(
                "{:?} body of {} bytes does not fit a handshake header",
                msg_type, body_len
            )));
        }
        Ok(Header::new(msg_type, body_len as u32, message_seq))
    }

    pub fn len(protocol: Protocol) -> usize {
        match protocol {
            Protocol::Tls => Self::TLS_LEN,
            Protocol::Dtls => Self::DTLS_LEN,
        }
    }

    pub fn is_fragment(&self) -> bool {
        self.fragment_offset > 0 || self.fragment_length < self.length
    }

    pub fn parse(input: &[u8], protocol: Protocol) -> IResult<&[u8], Header> {
        let (input, msg_type) = MessageType::parse(input)?;
        let (input, length) = be_u24(input)?;
        if protocol == Protocol::Tls {
            return Ok((input, Header::new(msg_type, length, 0)));
        }
        let (input, message_seq) = be_u16(input)?;
        let (input, fragment_offset) = be_u24(input)?;
        let (input, fragment_length) = be_u24(input)?;
        Ok((
            input,
            Header {
                msg_type,
                length,
                message_seq,
                fragment_offset,
                fragment_length,
            },
        ))
    }

    pub fn serialize(&self, protocol: Protocol, output: &mut Vec<u8>) {
        output.push(self.msg_type.as_u8());
        output.extend_from_slice(&self.length.to_be_bytes()[1..]);
        if protocol == Protocol::Dtls {
            output.extend_from_slice(&self.message_seq.to_be_bytes());
            output.extend_from_slice(&self.fragment_offset.to_be_bytes()[1..]);
            output.extend_from_slice(&self.fragment_length.to_be_bytes()[1..]);
        }
    }
}

/// Frame a complete, unfragmented handshake message.
pub fn wrap(
    msg_type: MessageType,
    protocol: Protocol,
    message_seq: u16,
    body: &[u8],
) -> Result<Vec<u8>, Error> {
    let header = Header::for_body(msg_type, body.len(), message_seq)?;
    let mut out = Vec::with_capacity(Header::len(protocol) + body.len());
    header.serialize(protocol, &mut out);
    out.extend_from_slice(body);
    Ok(out)
}

/// Split one complete handshake message off the front of `input`.
///
/// Fragmented DTLS messages fail the parse; reassembly is left to the caller.
pub fn unwrap(input: &[u8], protocol: Protocol) -> IResult<&[u8], (Header, &[u8])> {
    let (rest, header) = Header::parse(input, protocol)?;
    if header.is_fragment() {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::LengthValue,
        )));
    }
    let (rest, body) = take(header.length)(rest)?;
    Ok((rest, (header, body)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DTLS_MESSAGE: &[u8] = &[
        0x01, // ClientHello
        0x00, 0x00, 0x03, // length
        0x00, 0x02, // message_seq
        0x00, 0x00, 0x00, // fragment_offset
        0x00, 0x00, 0x03, // fragment_length
        0xAA, 0xBB, 0xCC, // body
    ];

    #[test]
    fn tls_header() {
        let framed = wrap(MessageType::ServerHelloDone, Protocol::Tls, 0, &[]).unwrap();
        assert_eq!(framed, vec![0x0E, 0x00, 0x00, 0x00]);

        let framed = wrap(MessageType::Finished, Protocol::Tls, 0, &[1, 2]).unwrap();
        let (rest, (header, body)) = unwrap(&framed, Protocol::Tls).unwrap();
        assert!(rest.is_empty());
        assert_eq!(header.msg_type, MessageType::Finished);
        assert_eq!(body, &[1, 2]);
    }

    #[test]
    fn dtls_roundtrip() {
        let framed = wrap(MessageType::ClientHello, Protocol::Dtls, 2, &[0xAA, 0xBB, 0xCC]).unwrap();
        assert_eq!(framed, DTLS_MESSAGE);

        let (_, (header, body)) = unwrap(DTLS_MESSAGE, Protocol::Dtls).unwrap();
        assert_eq!(header.message_seq, 2);
        assert_eq!(body, &[0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn oversized_body_is_refused() {
        let body = vec![0; Header::MAX_LENGTH + 1];
        let err = wrap(MessageType::Certificate, Protocol::Tls, 0, &body).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));

        let header = Header::for_body(MessageType::Certificate, Header::MAX_LENGTH, 0).unwrap();
        assert_eq!(header.length, 0xFF_FFFF);
    }

    #[test]
    fn dtls_fragment_rejected() {
        let mut message = DTLS_MESSAGE.to_vec();
        message[11] = 0x02; // fragment_length shorter than length
        assert!(unwrap(&message, Protocol::Dtls).is_err());
    }
}
