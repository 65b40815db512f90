use nom::number::complete::be_u16;
use nom::IResult;
use tinyvec::ArrayVec;

use super::extension::{parse_block, serialize_block, Extension};
use super::{Cookie, Random, SessionId};
use crate::types::{CompressionMethod, ExtensionType, Protocol, ProtocolVersion};
use crate::util::{all_of, exhausted, many1, u16_prefixed, u8_prefixed};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    pub client_version: ProtocolVersion,
    pub random: Random,
    pub session_id: SessionId,
    /// Present exactly when the hello is sent over DTLS.
    pub cookie: Option<Cookie>,
    pub cipher_suites: Vec<u16>,
    pub compression_methods: ArrayVec<[CompressionMethod; 8]>,
    pub extensions: Option<Vec<Extension>>,
}

impl ClientHello {
    pub fn new(
        client_version: ProtocolVersion,
        random: Random,
        session_id: SessionId,
        cipher_suites: Vec<u16>,
    ) -> Self {
        let cookie = client_version.is_dtls().then(Cookie::empty);
        let mut compression_methods = ArrayVec::new();
        compression_methods.push(CompressionMethod::Null);
        ClientHello {
            client_version,
            random,
            session_id,
            cookie,
            cipher_suites,
            compression_methods,
            extensions: None,
        }
    }

    pub fn extension(&self, extension_type: ExtensionType) -> Option<&Extension> {
        self.extensions
            .as_ref()?
            .iter()
            .find(|e| e.extension_type == extension_type)
    }

    pub fn parse(input: &[u8], protocol: Protocol) -> IResult<&[u8], ClientHello> {
        let (input, client_version) = ProtocolVersion::parse(input)?;
        let (input, random) = Random::parse(input)?;
        let (input, session_id) = SessionId::parse(input)?;
        let (input, cookie) = match protocol {
            Protocol::Tls => (input, None),
            Protocol::Dtls => {
                let (input, cookie) = Cookie::parse(input)?;
                (input, Some(cookie))
            }
        };

        let (input, suites) = u16_prefixed(input)?;
        if suites.is_empty() || suites.len() % 2 != 0 {
            return Err(nom::Err::Failure(nom::error::Error::new(
                suites,
                nom::error::ErrorKind::LengthValue,
            )));
        }
        let (_, cipher_suites) = all_of(be_u16)(suites)?;

        let (input, methods) = u8_prefixed(input)?;
        let (rest, compression_methods) = many1(CompressionMethod::parse)(methods)?;
        exhausted(rest)?;

        let (input, extensions) = parse_block(input)?;

        Ok((
            input,
            ClientHello {
                client_version,
                random,
                session_id,
                cookie,
                cipher_suites,
                compression_methods,
                extensions,
            },
        ))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        self.client_version.serialize(output);
        self.random.serialize(output);
        self.session_id.serialize(output);
        if let Some(cookie) = &self.cookie {
            cookie.serialize(output);
        }
        output.extend_from_slice(&(self.cipher_suites.len() as u16 * 2).to_be_bytes());
        for id in &self.cipher_suites {
            output.extend_from_slice(&id.to_be_bytes());
        }
        output.push(self.compression_methods.len() as u8);
        for method in &self.compression_methods {
            output.push(method.as_u8());
        }
        serialize_block(self.extensions.as_deref(), output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite;

    const MESSAGE: &[u8] = &[
        0xFE, 0xFD, // ProtocolVersion::Dtls1_2
        // Random
        0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
        0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x1B, 0x1C, 0x1D, 0x1E,
        0x1F, 0x20, //
        0x01, // SessionId length
        0xAA, // SessionId
        0x01, // Cookie length
        0xBB, // Cookie
        0x00, 0x04, // CipherSuites length
        0xC0, 0x2F, // TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256
        0xC0, 0x30, // TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384
        0x01, // CompressionMethods length
        0x00, // CompressionMethod::Null
    ];

    fn sample() -> ClientHello {
        let random = Random::parse(&MESSAGE[2..34]).unwrap().1;
        let mut hello = ClientHello::new(
            ProtocolVersion::Dtls1_2,
            random,
            SessionId::try_new(&[0xAA]).unwrap(),
            vec![0xC02F, 0xC030],
        );
        hello.cookie = Some(Cookie::try_new(&[0xBB]).unwrap());
        hello
    }

    #[test]
    fn roundtrip() {
        let hello = sample();
        let mut serialized = Vec::new();
        hello.serialize(&mut serialized);
        assert_eq!(serialized, MESSAGE);

        let (rest, parsed) = ClientHello::parse(&serialized, Protocol::Dtls).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, hello);
        assert!(parsed.extensions.is_none());
    }

    #[test]
    fn every_catalog_id_roundtrips() {
        let ids: Vec<u16> = suite::catalog().map(|e| e.id()).collect();
        let mut hello = ClientHello::new(
            ProtocolVersion::Tls1_2,
            Random([7; 32]),
            SessionId::empty(),
            ids.clone(),
        );
        hello.extensions = Some(vec![]);

        let mut out = Vec::new();
        hello.serialize(&mut out);
        let (_, parsed) = ClientHello::parse(&out, Protocol::Tls).unwrap();
        assert_eq!(parsed.cipher_suites, ids);
        assert_eq!(parsed.extensions, Some(vec![]));
    }

    #[test]
    fn odd_cipher_suite_length() {
        let mut message = MESSAGE.to_vec();
        message[39] = 0x03;
        assert!(ClientHello::parse(&message, Protocol::Dtls).is_err());
    }

    #[test]
    fn session_id_too_long() {
        let mut message = MESSAGE.to_vec();
        message[34] = 0x21;
        assert!(ClientHello::parse(&message, Protocol::Dtls).is_err());
    }

    #[test]
    fn empty_compression_rejected() {
        let mut message = MESSAGE.to_vec();
        message[44] = 0x00;
        message.pop();
        assert!(ClientHello::parse(&message, Protocol::Dtls).is_err());
    }
}
