use nom::number::complete::be_u8;

use super::{decode, decode_error, illegal_parameter, versions};
use super::{ConfigurableExtension, ConfiguredExtension};
use crate::context::property::{EC_POINT_FORMATS, SUPPORTED_GROUPS};
use crate::context::{Mode, NegotiationContext};
use crate::types::{grease, EcPointFormat, ExtensionType, NamedGroup, ProtocolVersion};
use crate::util::{all_of, u16_prefixed, u8_prefixed};
use crate::Error;

fn parse_groups(input: &[u8]) -> nom::IResult<&[u8], Vec<NamedGroup>> {
    let (rest, list) = u16_prefixed(input)?;
    let (_, groups) = all_of(NamedGroup::parse)(list)?;
    Ok((rest, groups))
}

fn parse_formats(input: &[u8]) -> nom::IResult<&[u8], Vec<EcPointFormat>> {
    let (rest, list) = u8_prefixed(input)?;
    let (_, formats) = all_of(be_u8)(list)?;
    Ok((rest, formats.into_iter().map(EcPointFormat::from_u8).collect()))
}

/// supported_groups (RFC 8422 section 5.1.1, RFC 8446 section 4.2.7).
#[derive(Debug)]
pub struct SupportedGroupsExtension;

#[derive(Debug)]
struct Groups(Vec<NamedGroup>);

impl ConfigurableExtension for SupportedGroupsExtension {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::SupportedGroups
    }

    fn versions(&self) -> &'static [ProtocolVersion] {
        versions::TLS10_UP
    }

    fn configure(
        &self,
        ctx: &mut NegotiationContext,
        _message_len: usize,
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        if ctx.mode() != Mode::Client {
            return Ok(None);
        }
        let offer = ctx.config().supported_groups().to_vec();
        if offer.is_empty() {
            return Ok(None);
        }
        ctx.add_negotiable(&SUPPORTED_GROUPS, offer.clone());

        let mut groups = Vec::with_capacity(offer.len() + 1);
        if ctx.config().grease() {
            groups.push(NamedGroup::Unknown(grease::random()));
        }
        groups.extend(offer);
        Ok(Some(Box::new(Groups(groups))))
    }

    fn deserialize(
        &self,
        _ctx: &NegotiationContext,
        source: Mode,
        payload: &[u8],
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        let groups = decode(payload, parse_groups)?;
        if groups.is_empty() {
            return Err(decode_error());
        }
        // A TLS 1.3 server may list its groups, which is informational only.
        if source == Mode::Server {
            debug!("Server groups {:?}", groups);
            return Ok(None);
        }
        Ok(Some(Box::new(Groups(groups))))
    }
}

impl ConfiguredExtension for Groups {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::SupportedGroups
    }

    fn payload_length(&self) -> usize {
        2 + 2 * self.0.len()
    }

    fn serialize_payload(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&((2 * self.0.len()) as u16).to_be_bytes());
        for g in &self.0 {
            g.serialize(output);
        }
    }

    fn apply(&self, ctx: &mut NegotiationContext, _source: Mode) -> Result<(), Error> {
        ctx.remote_mut().groups = self.0.clone();
        let chosen = ctx
            .config()
            .supported_groups()
            .iter()
            .find(|g| g.is_supported() && self.0.contains(g))
            .copied();
        match chosen {
            Some(group) => {
                debug!("Selected group {:?}", group);
                ctx.add_negotiated(&SUPPORTED_GROUPS, group)
            }
            None => {
                debug!("No group in common with {:?}", self.0);
                Ok(())
            }
        }
    }
}

/// ec_point_formats (RFC 8422 section 5.1.2). Only uncompressed points are
/// used, and both sides must list them.
#[derive(Debug)]
pub struct EcPointFormatsExtension;

#[derive(Debug)]
struct Formats(Vec<EcPointFormat>);

impl ConfigurableExtension for EcPointFormatsExtension {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::EcPointFormats
    }

    fn versions(&self) -> &'static [ProtocolVersion] {
        versions::TLS10_TO_12
    }

    fn configure(
        &self,
        ctx: &mut NegotiationContext,
        _message_len: usize,
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        let send = match ctx.mode() {
            Mode::Client => {
                ctx.add_negotiable(&EC_POINT_FORMATS, vec![EcPointFormat::Uncompressed]);
                true
            }
            Mode::Server => {
                ctx.is_negotiated(&EC_POINT_FORMATS)
                    && ctx.cipher().map(|c| c.key_exchange.is_ecc()).unwrap_or(false)
            }
        };
        Ok(send.then(|| {
            Box::new(Formats(vec![EcPointFormat::Uncompressed])) as Box<dyn ConfiguredExtension>
        }))
    }

    fn deserialize(
        &self,
        _ctx: &NegotiationContext,
        _source: Mode,
        payload: &[u8],
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        let formats = decode(payload, parse_formats)?;
        if !formats.contains(&EcPointFormat::Uncompressed) {
            warn!("Peer does not accept uncompressed points: {:?}", formats);
            return Err(illegal_parameter());
        }
        Ok(Some(Box::new(Formats(formats))))
    }
}

impl ConfiguredExtension for Formats {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::EcPointFormats
    }

    fn payload_length(&self) -> usize {
        1 + self.0.len()
    }

    fn serialize_payload(&self, output: &mut Vec<u8>) {
        output.push(self.0.len() as u8);
        output.extend(self.0.iter().map(|f| f.as_u8()));
    }

    fn apply(&self, ctx: &mut NegotiationContext, _source: Mode) -> Result<(), Error> {
        ctx.add_negotiated(&EC_POINT_FORMATS, EcPointFormat::Uncompressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_payload() {
        let ext = Groups(vec![NamedGroup::X25519, NamedGroup::Secp256r1]).to_extension();
        assert_eq!(ext.data, vec![0x00, 0x04, 0x00, 0x1D, 0x00, 0x17]);
        assert_eq!(
            decode(&ext.data, parse_groups).unwrap(),
            vec![NamedGroup::X25519, NamedGroup::Secp256r1]
        );
    }

    #[test]
    fn point_formats_payload() {
        let ext = Formats(vec![EcPointFormat::Uncompressed]).to_extension();
        assert_eq!(ext.data, vec![0x01, 0x00]);
        assert_eq!(
            decode(&[0x02, 0x01, 0x00], parse_formats).unwrap(),
            vec![
                EcPointFormat::AnsiX962CompressedPrime,
                EcPointFormat::Uncompressed
            ]
        );
    }

    #[test]
    fn truncated_groups_rejected() {
        assert!(decode(&[0x00, 0x04, 0x00, 0x1D], parse_groups).is_err());
    }
}
