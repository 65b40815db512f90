//! Application protocol selection: ALPN (RFC 7301) and the older NPN draft.

use super::{decode, decode_error, illegal_parameter, versions};
use super::{ConfigurableExtension, ConfiguredExtension};
use crate::alert::AlertDescription;
use crate::context::property::{ALPN, NPN};
use crate::context::{Mode, NegotiationContext};
use crate::types::{ExtensionType, ProtocolVersion};
use crate::util::{all_of, u16_prefixed, u8_prefixed};
use crate::Error;

fn parse_names(input: &[u8]) -> nom::IResult<&[u8], Vec<String>> {
    let (rest, names) = all_of(u8_prefixed)(input)?;
    let names = names
        .into_iter()
        .map(|n| String::from_utf8_lossy(n).into_owned())
        .collect();
    Ok((rest, names))
}

/// A `ProtocolNameList`. Empty names and empty lists are decode errors.
fn parse_protocol_list(input: &[u8]) -> nom::IResult<&[u8], Vec<String>> {
    let (rest, list) = u16_prefixed(input)?;
    let (_, names) = parse_names(list)?;
    Ok((rest, names))
}

fn serialize_names(names: &[String], output: &mut Vec<u8>) {
    for n in names {
        output.push(n.len() as u8);
        output.extend_from_slice(n.as_bytes());
    }
}

fn names_len(names: &[String]) -> usize {
    names.iter().map(|n| 1 + n.len()).sum()
}

fn valid(names: &[String]) -> bool {
    !names.is_empty() && names.iter().all(|n| !n.is_empty() && n.len() <= 255)
}

#[derive(Debug)]
pub struct AlpnExtension;

#[derive(Debug)]
struct ProtocolNames(Vec<String>);

impl ConfigurableExtension for AlpnExtension {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::ApplicationLayerProtocolNegotiation
    }

    fn versions(&self) -> &'static [ProtocolVersion] {
        versions::TLS10_UP
    }

    fn configure(
        &self,
        ctx: &mut NegotiationContext,
        _message_len: usize,
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        let names = match ctx.mode() {
            Mode::Client => {
                let offer = ctx.config().alpn_protocols().to_vec();
                if offer.is_empty() {
                    return Ok(None);
                }
                ctx.add_negotiable(&ALPN, offer.clone());
                offer
            }
            Mode::Server => match ctx.negotiated(&ALPN) {
                Some(chosen) => vec![chosen.clone()],
                None => return Ok(None),
            },
        };
        Ok(Some(Box::new(ProtocolNames(names))))
    }

    fn deserialize(
        &self,
        _ctx: &NegotiationContext,
        source: Mode,
        payload: &[u8],
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        let names = decode(payload, parse_protocol_list)?;
        if !valid(&names) {
            return Err(decode_error());
        }
        if source == Mode::Server && names.len() != 1 {
            warn!("Server selected {} application protocols", names.len());
            return Err(decode_error());
        }
        Ok(Some(Box::new(ProtocolNames(names))))
    }
}

impl ConfiguredExtension for ProtocolNames {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::ApplicationLayerProtocolNegotiation
    }

    fn payload_length(&self) -> usize {
        2 + names_len(&self.0)
    }

    fn serialize_payload(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&(names_len(&self.0) as u16).to_be_bytes());
        serialize_names(&self.0, output);
    }

    fn apply(&self, ctx: &mut NegotiationContext, source: Mode) -> Result<(), Error> {
        match source {
            Mode::Client => {
                let ours = ctx.config().alpn_protocols();
                if ours.is_empty() {
                    return Ok(());
                }
                let Some(chosen) = ours.iter().find(|p| self.0.contains(p)).cloned() else {
                    warn!("No common application protocol in {:?}", self.0);
                    return Err(Error::fatal(AlertDescription::NoApplicationProtocol));
                };
                debug!("Selected application protocol {}", chosen);
                ctx.add_negotiated(&ALPN, chosen)
            }
            Mode::Server => {
                let chosen = &self.0[0];
                let offered = ctx.negotiable(&ALPN).map(|o| o.contains(chosen)).unwrap_or(false);
                if !offered {
                    warn!("Server selected unoffered application protocol {}", chosen);
                    return Err(illegal_parameter());
                }
                ctx.add_negotiated(&ALPN, chosen.clone())
            }
        }
    }
}

/// next_protocol_negotiation. The client sends it empty, the server answers
/// with its list and the client announces its pick in a NextProtocol message.
#[derive(Debug)]
pub struct NpnExtension;

#[derive(Debug)]
struct NpnPayload(Vec<String>);

impl ConfigurableExtension for NpnExtension {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::NextProtocolNegotiation
    }

    fn versions(&self) -> &'static [ProtocolVersion] {
        versions::TLS10_TO_12
    }

    fn configure(
        &self,
        ctx: &mut NegotiationContext,
        _message_len: usize,
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        match ctx.mode() {
            Mode::Client => {
                let offer = ctx.config().npn_protocols().to_vec();
                if offer.is_empty() {
                    return Ok(None);
                }
                ctx.add_negotiable(&NPN, offer);
                Ok(Some(Box::new(NpnPayload(Vec::new()))))
            }
            Mode::Server => {
                // ALPN wins when both were offered.
                if ctx.is_negotiated(&ALPN) {
                    return Ok(None);
                }
                Ok(ctx
                    .negotiable(&NPN)
                    .map(|list| Box::new(NpnPayload(list.clone())) as Box<dyn ConfiguredExtension>))
            }
        }
    }

    fn deserialize(
        &self,
        _ctx: &NegotiationContext,
        source: Mode,
        payload: &[u8],
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        match source {
            Mode::Client if !payload.is_empty() => Err(decode_error()),
            Mode::Client => Ok(Some(Box::new(NpnPayload(Vec::new())))),
            Mode::Server => {
                let names = decode(payload, parse_names)?;
                Ok(Some(Box::new(NpnPayload(names))))
            }
        }
    }
}

impl ConfiguredExtension for NpnPayload {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::NextProtocolNegotiation
    }

    fn payload_length(&self) -> usize {
        names_len(&self.0)
    }

    fn serialize_payload(&self, output: &mut Vec<u8>) {
        serialize_names(&self.0, output);
    }

    fn apply(&self, ctx: &mut NegotiationContext, source: Mode) -> Result<(), Error> {
        match source {
            Mode::Client => {
                let ours = ctx.config().npn_protocols().to_vec();
                if !ours.is_empty() {
                    ctx.add_negotiable(&NPN, ours);
                }
                Ok(())
            }
            Mode::Server => {
                let ours = ctx.negotiable(&NPN).cloned().unwrap_or_default();
                // Without overlap the client falls back to its first choice.
                let chosen = ours
                    .iter()
                    .find(|p| self.0.contains(p))
                    .or_else(|| ours.first())
                    .cloned()
                    .ok_or_else(|| Error::internal("NPN answered but nothing offered"))?;
                debug!("Selected next protocol {}", chosen);
                ctx.add_negotiated(&NPN, chosen)
            }
        }
    }
}
