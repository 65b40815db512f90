use nom::IResult;

use crate::util::{exhausted, push_u8_prefixed, u8_prefixed};

/// NextProtocol body: the selected protocol, padded so the body length is a
/// multiple of 32 and does not leak the name length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextProtocol {
    pub selected: String,
}

impl NextProtocol {
    pub fn new(selected: impl Into<String>) -> Self {
        NextProtocol {
            selected: selected.into(),
        }
    }

    fn padding_len(selected_len: usize) -> usize {
        32 - ((selected_len + 2) % 32)
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], NextProtocol> {
        let (input, selected) = u8_prefixed(input)?;
        let (input, _padding) = u8_prefixed(input)?;
        let selected = String::from_utf8(selected.to_vec()).map_err(|_| {
            nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Char))
        })?;
        Ok((input, NextProtocol { selected }))
    }

    /// Parse a whole body, rejecting trailing bytes.
    pub fn parse_complete(input: &[u8]) -> IResult<&[u8], NextProtocol> {
        let (rest, np) = Self::parse(input)?;
        exhausted(rest)?;
        Ok((rest, np))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        push_u8_prefixed(output, self.selected.as_bytes());
        let padding = Self::padding_len(self.selected.len());
        push_u8_prefixed(output, &[0u8; 32][..padding]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_to_32() {
        let mut out = Vec::new();
        NextProtocol::new("h2").serialize(&mut out);
        assert_eq!(out.len(), 32);
        assert_eq!(&out[..4], &[0x02, b'h', b'2', 28]);

        let (_, parsed) = NextProtocol::parse_complete(&out).unwrap();
        assert_eq!(parsed.selected, "h2");
    }

    #[test]
    fn name_of_30_gets_full_block() {
        let mut out = Vec::new();
        NextProtocol::new("a".repeat(30)).serialize(&mut out);
        // 1 + 30 + 1 + 32
        assert_eq!(out.len(), 64);
    }
}
