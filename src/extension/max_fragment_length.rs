use nom::number::complete::be_u8;

use super::{decode, illegal_parameter, versions, ConfigurableExtension, ConfiguredExtension};
use crate::context::property::MAX_FRAGMENT_LENGTH;
use crate::context::{Mode, NegotiationContext};
use crate::types::{ExtensionType, ProtocolVersion};
use crate::Error;

/// Negotiated plaintext fragment limit (RFC 6066 section 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaxFragmentLength {
    L512,
    L1024,
    L2048,
    L4096,
}

impl MaxFragmentLength {
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::L512),
            2 => Some(Self::L1024),
            3 => Some(Self::L2048),
            4 => Some(Self::L4096),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            Self::L512 => 1,
            Self::L1024 => 2,
            Self::L2048 => 3,
            Self::L4096 => 4,
        }
    }

    /// Limit in bytes.
    pub fn length(&self) -> usize {
        1 << (8 + self.as_u8() as usize)
    }
}

#[derive(Debug)]
pub struct MaxFragmentLengthExtension;

#[derive(Debug)]
struct Limit(MaxFragmentLength);

impl ConfigurableExtension for MaxFragmentLengthExtension {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::MaxFragmentLength
    }

    fn versions(&self) -> &'static [ProtocolVersion] {
        versions::TLS10_UP
    }

    fn configure(
        &self,
        ctx: &mut NegotiationContext,
        _message_len: usize,
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        let limit = match ctx.mode() {
            Mode::Client => {
                let Some(limit) = ctx.config().max_fragment_length() else {
                    return Ok(None);
                };
                ctx.add_negotiable(&MAX_FRAGMENT_LENGTH, limit);
                limit
            }
            Mode::Server => match ctx.negotiated(&MAX_FRAGMENT_LENGTH) {
                Some(limit) => *limit,
                None => return Ok(None),
            },
        };
        Ok(Some(Box::new(Limit(limit))))
    }

    fn deserialize(
        &self,
        _ctx: &NegotiationContext,
        _source: Mode,
        payload: &[u8],
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        Ok(Some(Box::new(Limit(parse_limit(payload)?))))
    }
}

fn parse_limit(payload: &[u8]) -> Result<MaxFragmentLength, Error> {
    let code = decode(payload, be_u8)?;
    MaxFragmentLength::from_u8(code).ok_or_else(|| {
        warn!("Unknown max_fragment_length code {}", code);
        illegal_parameter()
    })
}

impl ConfiguredExtension for Limit {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::MaxFragmentLength
    }

    fn payload_length(&self) -> usize {
        1
    }

    fn serialize_payload(&self, output: &mut Vec<u8>) {
        output.push(self.0.as_u8());
    }

    fn apply(&self, ctx: &mut NegotiationContext, source: Mode) -> Result<(), Error> {
        // The server must echo exactly what was requested.
        if source == Mode::Server && ctx.negotiable(&MAX_FRAGMENT_LENGTH) != Some(&self.0) {
            warn!("Server answered max_fragment_length {:?}", self.0);
            return Err(illegal_parameter());
        }
        ctx.add_negotiated(&MAX_FRAGMENT_LENGTH, self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_lengths() {
        assert_eq!(MaxFragmentLength::L512.length(), 512);
        assert_eq!(MaxFragmentLength::L4096.length(), 4096);
        for code in 1..=4 {
            assert_eq!(MaxFragmentLength::from_u8(code).unwrap().as_u8(), code);
        }
        assert_eq!(MaxFragmentLength::from_u8(0), None);
        assert_eq!(MaxFragmentLength::from_u8(5), None);
    }

    #[test]
    fn unknown_code_is_illegal_parameter() {
        assert_eq!(parse_limit(&[2]).unwrap(), MaxFragmentLength::L1024);
        assert!(parse_limit(&[2, 0]).is_err());
        let err = parse_limit(&[7]).unwrap_err();
        assert_eq!(
            err.alert().description,
            crate::alert::AlertDescription::IllegalParameter
        );
    }
}
