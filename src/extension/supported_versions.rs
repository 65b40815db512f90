use nom::number::complete::be_u16;

use super::{decode, decode_error, illegal_parameter, versions};
use super::{ConfigurableExtension, ConfiguredExtension};
use crate::alert::AlertDescription;
use crate::context::property::VERSION;
use crate::context::{Mode, NegotiationContext};
use crate::types::{grease, ExtensionType, ProtocolVersion};
use crate::util::{all_of, u8_prefixed};
use crate::Error;

fn parse_offer(input: &[u8]) -> nom::IResult<&[u8], Vec<ProtocolVersion>> {
    let (rest, list) = u8_prefixed(input)?;
    let (_, offer) = all_of(ProtocolVersion::parse)(list)?;
    Ok((rest, offer))
}

/// supported_versions (RFC 8446 section 4.2.1).
///
/// Only sent when a 1.3 version is on offer. The client lists every version
/// it accepts, the server answers with the single one it picked.
#[derive(Debug)]
pub struct SupportedVersionsExtension;

#[derive(Debug)]
enum Versions {
    Offer(Vec<ProtocolVersion>),
    Selected(ProtocolVersion),
}

impl ConfigurableExtension for SupportedVersionsExtension {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::SupportedVersions
    }

    fn versions(&self) -> &'static [ProtocolVersion] {
        versions::TLS13
    }

    fn configure(
        &self,
        ctx: &mut NegotiationContext,
        _message_len: usize,
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        let out = match ctx.mode() {
            Mode::Client => {
                let mut offer = Vec::new();
                if ctx.config().grease() {
                    offer.push(ProtocolVersion::Unknown(grease::random()));
                }
                offer.extend(ctx.candidate_versions());
                Versions::Offer(offer)
            }
            Mode::Server => match ctx.version() {
                Some(v) if v.is_tls13() => Versions::Selected(v),
                _ => return Ok(None),
            },
        };
        Ok(Some(Box::new(out)))
    }

    fn deserialize(
        &self,
        _ctx: &NegotiationContext,
        source: Mode,
        payload: &[u8],
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        let out = match source {
            Mode::Client => {
                let offer = decode(payload, parse_offer)?;
                if offer.is_empty() {
                    return Err(decode_error());
                }
                Versions::Offer(offer)
            }
            Mode::Server => Versions::Selected(decode(payload, be_u16).map(ProtocolVersion::from_u16)?),
        };
        Ok(Some(Box::new(out)))
    }
}

impl ConfiguredExtension for Versions {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::SupportedVersions
    }

    fn payload_length(&self) -> usize {
        match self {
            Versions::Offer(v) => 1 + 2 * v.len(),
            Versions::Selected(_) => 2,
        }
    }

    fn serialize_payload(&self, output: &mut Vec<u8>) {
        match self {
            Versions::Offer(offer) => {
                output.push((2 * offer.len()) as u8);
                for v in offer {
                    v.serialize(output);
                }
            }
            Versions::Selected(v) => v.serialize(output),
        }
    }

    fn apply(&self, ctx: &mut NegotiationContext, _source: Mode) -> Result<(), Error> {
        match self {
            Versions::Offer(offer) => {
                let chosen = ctx
                    .config()
                    .versions()
                    .iter()
                    .find(|v| offer.contains(v))
                    .copied();
                let Some(version) = chosen else {
                    warn!("No supported version in {:?}", offer);
                    return Err(Error::fatal(AlertDescription::ProtocolVersion));
                };
                debug!("Selected {} from supported_versions", version);
                ctx.add_negotiated(&VERSION, version)
            }
            Versions::Selected(version) => {
                let offered = ctx
                    .negotiable(&VERSION)
                    .map(|o| o.contains(version))
                    .unwrap_or(false);
                if !offered || !version.is_tls13() {
                    warn!("Server selected {} through supported_versions", version);
                    return Err(illegal_parameter());
                }
                ctx.add_negotiated(&VERSION, *version)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_payload() {
        let ext = Versions::Offer(vec![ProtocolVersion::Tls1_3, ProtocolVersion::Tls1_2])
            .to_extension();
        assert_eq!(ext.data, vec![0x04, 0x03, 0x04, 0x03, 0x03]);
        assert_eq!(
            decode(&ext.data, parse_offer).unwrap(),
            vec![ProtocolVersion::Tls1_3, ProtocolVersion::Tls1_2]
        );
    }

    #[test]
    fn selected_payload() {
        let ext = Versions::Selected(ProtocolVersion::Dtls1_3).to_extension();
        assert_eq!(ext.data, vec![0xFE, 0xFC]);
    }
}
