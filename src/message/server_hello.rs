use nom::number::complete::be_u16;
use nom::IResult;

use super::extension::{parse_block, serialize_block, Extension};
use super::{Random, SessionId};
use crate::types::{CompressionMethod, ExtensionType, ProtocolVersion};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHello {
    pub server_version: ProtocolVersion,
    pub random: Random,
    pub session_id: SessionId,
    pub cipher_suite: u16,
    pub compression_method: CompressionMethod,
    pub extensions: Option<Vec<Extension>>,
}

impl ServerHello {
    pub fn new(
        server_version: ProtocolVersion,
        random: Random,
        session_id: SessionId,
        cipher_suite: u16,
    ) -> Self {
        ServerHello {
            server_version,
            random,
            session_id,
            cipher_suite,
            compression_method: CompressionMethod::Null,
            extensions: None,
        }
    }

    pub fn extension(&self, extension_type: ExtensionType) -> Option<&Extension> {
        self.extensions
            .as_ref()?
            .iter()
            .find(|e| e.extension_type == extension_type)
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ServerHello> {
        let (input, server_version) = ProtocolVersion::parse(input)?;
        let (input, random) = Random::parse(input)?;
        let (input, session_id) = SessionId::parse(input)?;
        let (input, cipher_suite) = be_u16(input)?;
        let (input, compression_method) = CompressionMethod::parse(input)?;
        let (input, extensions) = parse_block(input)?;

        Ok((
            input,
            ServerHello {
                server_version,
                random,
                session_id,
                cipher_suite,
                compression_method,
                extensions,
            },
        ))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        self.server_version.serialize(output);
        self.random.serialize(output);
        self.session_id.serialize(output);
        output.extend_from_slice(&self.cipher_suite.to_be_bytes());
        output.push(self.compression_method.as_u8());
        serialize_block(self.extensions.as_deref(), output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &[u8] = &[
        0x03, 0x03, // ProtocolVersion::Tls1_2
        // Random
        0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
        0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x1B, 0x1C, 0x1D, 0x1E,
        0x1F, 0x20, //
        0x01, // SessionId length
        0xAA, // SessionId
        0xC0, 0x2F, // TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256
        0x00, // CompressionMethod::Null
        0x00, 0x04, // Extensions length
        0x00, 0x17, 0x00, 0x00, // ExtendedMasterSecret
    ];

    #[test]
    fn roundtrip() {
        let random = Random::parse(&MESSAGE[2..34]).unwrap().1;
        let mut hello = ServerHello::new(
            ProtocolVersion::Tls1_2,
            random,
            SessionId::try_new(&[0xAA]).unwrap(),
            0xC02F,
        );
        hello.extensions = Some(vec![Extension::new(
            ExtensionType::ExtendedMasterSecret,
            vec![],
        )]);

        let mut serialized = Vec::new();
        hello.serialize(&mut serialized);
        assert_eq!(serialized, MESSAGE);

        let (rest, parsed) = ServerHello::parse(&serialized).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, hello);
        assert!(parsed.extension(ExtensionType::ExtendedMasterSecret).is_some());
    }

    #[test]
    fn ssl3_hello_without_extensions() {
        let (_, parsed) = ServerHello::parse(&MESSAGE[..38]).unwrap();
        assert!(parsed.extensions.is_none());
    }
}
