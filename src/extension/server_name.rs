use nom::number::complete::be_u8;
use nom::IResult;

use super::{decode, versions, ConfigurableExtension, ConfiguredExtension};
use crate::context::property::SERVER_NAME;
use crate::context::{Mode, NegotiationContext};
use crate::types::{ExtensionType, ProtocolVersion};
use crate::util::{all_of, u16_prefixed};
use crate::Error;

const HOST_NAME: u8 = 0;

/// server_name (RFC 6066 section 3).
#[derive(Debug)]
pub struct ServerNameExtension;

#[derive(Debug)]
struct ServerName {
    /// `None` for the server's empty acknowledgement.
    name: Option<String>,
}

fn parse_entry(input: &[u8]) -> IResult<&[u8], (u8, &[u8])> {
    let (input, name_type) = be_u8(input)?;
    let (input, name) = u16_prefixed(input)?;
    Ok((input, (name_type, name)))
}

fn parse_list(input: &[u8]) -> IResult<&[u8], Vec<(u8, &[u8])>> {
    let (rest, list) = u16_prefixed(input)?;
    let (_, entries) = all_of(parse_entry)(list)?;
    Ok((rest, entries))
}

/// A hostname usable in SNI: not empty, not an IP literal, no trailing dot.
fn usable_host(host: &str) -> Option<String> {
    let host = host.trim_end_matches('.');
    if host.is_empty() || host.parse::<std::net::IpAddr>().is_ok() {
        return None;
    }
    Some(host.to_ascii_lowercase())
}

impl ConfigurableExtension for ServerNameExtension {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::ServerName
    }

    fn versions(&self) -> &'static [ProtocolVersion] {
        versions::TLS10_UP
    }

    fn configure(
        &self,
        ctx: &mut NegotiationContext,
        _message_len: usize,
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        match ctx.mode() {
            Mode::Client => {
                let host = ctx
                    .config()
                    .server_name()
                    .map(str::to_string)
                    .or_else(|| ctx.address().map(|a| a.host().to_string()));
                let Some(name) = host.as_deref().and_then(usable_host) else {
                    return Ok(None);
                };
                ctx.add_negotiable(&SERVER_NAME, name.clone());
                Ok(Some(Box::new(ServerName { name: Some(name) })))
            }
            Mode::Server => {
                let acknowledge = ctx.is_negotiated(&SERVER_NAME)
                    && !ctx.version().map(|v| v.is_tls13()).unwrap_or(false);
                Ok(acknowledge.then(|| Box::new(ServerName { name: None }) as Box<dyn ConfiguredExtension>))
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
            Mode::Server => {
                if !payload.is_empty() {
                    return Err(super::decode_error());
                }
                Ok(Some(Box::new(ServerName { name: None })))
            }
            Mode::Client => {
                let entries = decode(payload, parse_list)?;
                let name = entries
                    .iter()
                    .find(|(t, _)| *t == HOST_NAME)
                    .map(|(_, n)| String::from_utf8_lossy(n).into_owned());
                Ok(name.map(|n| Box::new(ServerName { name: Some(n) }) as Box<dyn ConfiguredExtension>))
            }
        }
    }
}

impl ConfiguredExtension for ServerName {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::ServerName
    }

    fn payload_length(&self) -> usize {
        self.name.as_ref().map(|n| 2 + 1 + 2 + n.len()).unwrap_or(0)
    }

    fn serialize_payload(&self, output: &mut Vec<u8>) {
        let Some(name) = &self.name else {
            return;
        };
        output.extend_from_slice(&((3 + name.len()) as u16).to_be_bytes());
        output.push(HOST_NAME);
        output.extend_from_slice(&(name.len() as u16).to_be_bytes());
        output.extend_from_slice(name.as_bytes());
    }

    fn apply(&self, ctx: &mut NegotiationContext, source: Mode) -> Result<(), Error> {
        let name = match (source, &self.name) {
            (Mode::Client, Some(name)) => name.clone(),
            _ => ctx.negotiable(&SERVER_NAME).cloned().unwrap_or_default(),
        };
        ctx.add_negotiated(&SERVER_NAME, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_com_payload() {
        let ext = ServerName {
            name: Some("example.com".to_string()),
        }
        .to_extension();
        assert_eq!(ext.extension_type, ExtensionType::ServerName);

        let mut out = Vec::new();
        ext.serialize(&mut out);
        assert_eq!(
            out,
            vec![
                0x00, 0x00, // server_name
                0x00, 0x10, // extension length
                0x00, 0x0E, // server name list length
                0x00, // host_name
                0x00, 0x0B, // name length
                0x65, 0x78, 0x61, 0x6D, 0x70, 0x6C, 0x65, 0x2E, 0x63, 0x6F, 0x6D,
            ]
        );
    }

    #[test]
    fn ip_literals_are_not_sent() {
        assert_eq!(usable_host("10.0.0.1"), None);
        assert_eq!(usable_host("::1"), None);
        assert_eq!(usable_host("Example.COM."), Some("example.com".to_string()));
    }

    #[test]
    fn parse_host_name_list() {
        let payload = [0x00, 0x06, 0x00, 0x00, 0x03, b'a', b'b', b'c'];
        let entries = decode(&payload, parse_list).unwrap();
        assert_eq!(entries, vec![(0, &b"abc"[..])]);
    }
}
