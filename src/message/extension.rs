use nom::IResult;

use crate::types::ExtensionType;
use crate::util::{all_of, exhausted, u16_prefixed};

/// One raw extension as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub extension_type: ExtensionType,
    pub data: Vec<u8>,
}

impl Extension {
    pub fn new(extension_type: ExtensionType, data: Vec<u8>) -> Self {
        Extension {
            extension_type,
            data,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], Extension> {
        let (input, extension_type) = ExtensionType::parse(input)?;
        let (input, data) = u16_prefixed(input)?;
        Ok((input, Extension::new(extension_type, data.to_vec())))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.extension_type.as_u16().to_be_bytes());
        output.extend_from_slice(&(self.data.len() as u16).to_be_bytes());
        output.extend_from_slice(&self.data);
    }

    /// Bytes on the wire including the 4 byte type/length prefix.
    pub fn wire_len(&self) -> usize {
        4 + self.data.len()
    }
}

/// Parse the optional trailing extension block of a hello.
///
/// `None` when the message ends before the block (SSL3 and early TLS1.0
/// hellos). A block with the same type twice is rejected.
pub fn parse_block(input: &[u8]) -> IResult<&[u8], Option<Vec<Extension>>> {
    if input.is_empty() {
        return Ok((input, None));
    }
    let (rest, block) = u16_prefixed(input)?;
    let (tail, extensions) = all_of(Extension::parse)(block)?;
    exhausted(tail)?;

    for (i, a) in extensions.iter().enumerate() {
        if extensions[..i].iter().any(|b| b.extension_type == a.extension_type) {
            return Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Verify,
            )));
        }
    }

    Ok((rest, Some(extensions)))
}

/// Serialize an extension block. `None` writes nothing at all.
pub fn serialize_block(extensions: Option<&[Extension]>, output: &mut Vec<u8>) {
    let Some(extensions) = extensions else {
        return;
    };
    let len: usize = extensions.iter().map(|e| e.wire_len()).sum();
    output.extend_from_slice(&(len as u16).to_be_bytes());
    for e in extensions {
        e.serialize(output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: &[u8] = &[
        0x00, 0x0E, // block length
        0x00, 0x0A, // ExtensionType::SupportedGroups
        0x00, 0x06, // Extension length
        0x00, 0x04, 0x00, 0x1D, 0x00, 0x17, // Extension data
        0x00, 0x17, // ExtensionType::ExtendedMasterSecret
        0x00, 0x00, // empty
    ];

    #[test]
    fn block_roundtrip() {
        let (rest, parsed) = parse_block(BLOCK).unwrap();
        assert!(rest.is_empty());
        let parsed = parsed.unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].extension_type, ExtensionType::SupportedGroups);
        assert_eq!(parsed[1].extension_type, ExtensionType::ExtendedMasterSecret);

        let mut out = Vec::new();
        serialize_block(Some(&parsed), &mut out);
        assert_eq!(out, BLOCK);
    }

    #[test]
    fn missing_block_is_none() {
        let (_, parsed) = parse_block(&[]).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn duplicate_rejected() {
        let data = [0x00, 0x08, 0x00, 0x17, 0x00, 0x00, 0x00, 0x17, 0x00, 0x00];
        assert!(parse_block(&data).is_err());
    }
}
