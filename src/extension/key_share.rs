//! TLS 1.3 key_share (RFC 8446 section 4.2.8) and psk_key_exchange_modes.
//!
//! HelloRetryRequest is not supported. A server that finds no usable share
//! does not negotiate one, and the handshake later fails.

use nom::number::complete::be_u8;
use nom::IResult;

use super::{decode, decode_error, illegal_parameter, versions};
use crate::alert::AlertDescription;
use super::{ConfigurableExtension, ConfiguredExtension, Dependencies};
use crate::context::property::{KeyShareEntry, KEY_SHARE, PSK_KEY_EXCHANGE_MODES};
use crate::context::{Mode, NegotiationContext};
use crate::kx::KeyShare;
use crate::types::{ExtensionType, NamedGroup, ProtocolVersion, PskKeyExchangeMode};
use crate::util::{all_of, u16_prefixed, u8_prefixed};
use crate::Error;

fn parse_entry(input: &[u8]) -> IResult<&[u8], KeyShareEntry> {
    let (input, group) = NamedGroup::parse(input)?;
    let (input, public) = u16_prefixed(input)?;
    Ok((
        input,
        KeyShareEntry {
            group,
            public: public.to_vec(),
        },
    ))
}

fn parse_client_shares(input: &[u8]) -> IResult<&[u8], Vec<KeyShareEntry>> {
    let (rest, list) = u16_prefixed(input)?;
    let (_, entries) = all_of(parse_entry)(list)?;
    Ok((rest, entries))
}

fn entry_len(e: &KeyShareEntry) -> usize {
    4 + e.public.len()
}

fn serialize_entry(e: &KeyShareEntry, output: &mut Vec<u8>) {
    e.group.serialize(output);
    output.extend_from_slice(&(e.public.len() as u16).to_be_bytes());
    output.extend_from_slice(&e.public);
}

#[derive(Debug)]
pub struct KeyShareExtension;

#[derive(Debug)]
enum Shares {
    Client(Vec<KeyShareEntry>),
    Server(KeyShareEntry),
}

impl ConfigurableExtension for KeyShareExtension {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::KeyShare
    }

    fn versions(&self) -> &'static [ProtocolVersion] {
        versions::TLS13
    }

    fn dependencies(&self) -> Dependencies {
        Dependencies::Some(vec![
            ExtensionType::SupportedGroups,
            ExtensionType::SupportedVersions,
        ])
    }

    fn configure(
        &self,
        ctx: &mut NegotiationContext,
        _message_len: usize,
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        match ctx.mode() {
            Mode::Client => {
                let groups = ctx.config().key_share_groups().to_vec();
                let mut entries = Vec::with_capacity(groups.len());
                for group in &groups {
                    let share = KeyShare::generate(*group)?;
                    entries.push(KeyShareEntry {
                        group: *group,
                        public: share.public_key().to_vec(),
                    });
                    ctx.local_mut().key_shares.push(share);
                }
                ctx.add_negotiable(&KEY_SHARE, groups);
                Ok(Some(Box::new(Shares::Client(entries))))
            }
            Mode::Server => {
                let Some(group) = ctx.negotiated(&KEY_SHARE).map(|e| e.group) else {
                    return Ok(None);
                };
                let public = ctx
                    .local()
                    .public_key
                    .clone()
                    .ok_or_else(|| Error::internal("Key share selected without a public key"))?;
                Ok(Some(Box::new(Shares::Server(KeyShareEntry { group, public }))))
            }
        }
    }

    fn deserialize(
        &self,
        _ctx: &NegotiationContext,
        source: Mode,
        payload: &[u8],
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        let shares = match source {
            Mode::Client => {
                let entries = decode(payload, parse_client_shares)?;
                for (i, e) in entries.iter().enumerate() {
                    if entries[..i].iter().any(|p| p.group == e.group) {
                        warn!("Duplicate key share for {:?}", e.group);
                        return Err(illegal_parameter());
                    }
                }
                Shares::Client(entries)
            }
            Mode::Server => Shares::Server(decode(payload, parse_entry)?),
        };
        Ok(Some(Box::new(shares)))
    }
}

impl ConfiguredExtension for Shares {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::KeyShare
    }

    fn payload_length(&self) -> usize {
        match self {
            Shares::Client(entries) => 2 + entries.iter().map(entry_len).sum::<usize>(),
            Shares::Server(entry) => entry_len(entry),
        }
    }

    fn serialize_payload(&self, output: &mut Vec<u8>) {
        match self {
            Shares::Client(entries) => {
                let len: usize = entries.iter().map(entry_len).sum();
                output.extend_from_slice(&(len as u16).to_be_bytes());
                for e in entries {
                    serialize_entry(e, output);
                }
            }
            Shares::Server(entry) => serialize_entry(entry, output),
        }
    }

    fn apply(&self, ctx: &mut NegotiationContext, _source: Mode) -> Result<(), Error> {
        match self {
            Shares::Client(entries) => select_share(ctx, entries),
            Shares::Server(entry) => {
                let offered = ctx
                    .negotiable(&KEY_SHARE)
                    .map(|g| g.contains(&entry.group))
                    .unwrap_or(false);
                let share = match ctx.local_mut().take_key_share(Some(entry.group)) {
                    Some(share) if offered => share,
                    _ => {
                        warn!("Server key share for unoffered group {:?}", entry.group);
                        return Err(illegal_parameter());
                    }
                };
                let shared = share.agree(&entry.public)?;
                ctx.local_mut().key_shares.clear();
                ctx.local_mut().pre_master = Some(shared);
                ctx.remote_mut().public_key = Some(entry.public.clone());
                ctx.add_negotiated(&KEY_SHARE, entry.clone())
            }
        }
    }
}

/// Server side: pick the first of our groups that the client both lists in
/// supported_groups and sent a share for, answer with our own and compute the
/// shared secret.
fn select_share(ctx: &mut NegotiationContext, entries: &[KeyShareEntry]) -> Result<(), Error> {
    if !ctx.version().map(|v| v.is_tls13()).unwrap_or(false) {
        return Ok(());
    }
    let listed = ctx.remote().map(|r| r.groups.clone()).unwrap_or_default();
    if listed.is_empty() {
        warn!("key_share without supported_groups");
        return Err(Error::fatal(AlertDescription::MissingExtension));
    }
    let chosen = ctx
        .config()
        .supported_groups()
        .iter()
        .filter(|g| g.is_supported() && listed.contains(g))
        .find_map(|g| entries.iter().find(|e| e.group == *g))
        .cloned();
    let Some(entry) = chosen else {
        debug!("No usable key share among {:?}", entries.iter().map(|e| e.group).collect::<Vec<_>>());
        return Ok(());
    };

    let share = KeyShare::generate(entry.group)?;
    let public = share.public_key().to_vec();
    let shared = share.agree(&entry.public)?;
    debug!("Agreed key share on {:?}", entry.group);

    ctx.local_mut().public_key = Some(public);
    ctx.local_mut().pre_master = Some(shared);
    ctx.remote_mut().public_key = Some(entry.public.clone());
    ctx.add_negotiated(&KEY_SHARE, entry)
}

/// psk_key_exchange_modes. Only `psk_dhe_ke` is offered.
#[derive(Debug)]
pub struct PskKeyExchangeModesExtension;

#[derive(Debug)]
struct Modes(Vec<PskKeyExchangeMode>);

fn parse_modes(input: &[u8]) -> IResult<&[u8], Vec<PskKeyExchangeMode>> {
    let (rest, list) = u8_prefixed(input)?;
    let (_, modes) = all_of(be_u8)(list)?;
    Ok((rest, modes.into_iter().map(PskKeyExchangeMode::from_u8).collect()))
}

impl ConfigurableExtension for PskKeyExchangeModesExtension {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::PskKeyExchangeModes
    }

    fn versions(&self) -> &'static [ProtocolVersion] {
        versions::TLS13
    }

    fn configure(
        &self,
        ctx: &mut NegotiationContext,
        _message_len: usize,
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        if ctx.mode() != Mode::Client {
            return Ok(None);
        }
        let modes = vec![PskKeyExchangeMode::PskDheKe];
        ctx.add_negotiable(&PSK_KEY_EXCHANGE_MODES, modes.clone());
        Ok(Some(Box::new(Modes(modes))))
    }

    fn deserialize(
        &self,
        _ctx: &NegotiationContext,
        source: Mode,
        payload: &[u8],
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        if source == Mode::Server {
            return Err(Error::fatal(AlertDescription::UnsupportedExtension));
        }
        let modes = decode(payload, parse_modes)?;
        if modes.is_empty() {
            return Err(decode_error());
        }
        Ok(Some(Box::new(Modes(modes))))
    }
}

impl ConfiguredExtension for Modes {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::PskKeyExchangeModes
    }

    fn payload_length(&self) -> usize {
        1 + self.0.len()
    }

    fn serialize_payload(&self, output: &mut Vec<u8>) {
        output.push(self.0.len() as u8);
        output.extend(self.0.iter().map(|m| m.as_u8()));
    }

    fn apply(&self, ctx: &mut NegotiationContext, _source: Mode) -> Result<(), Error> {
        if self.0.contains(&PskKeyExchangeMode::PskDheKe) {
            ctx.add_negotiated(&PSK_KEY_EXCHANGE_MODES, PskKeyExchangeMode::PskDheKe)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::Config;
    use crate::context::property::VERSION;

    fn tls13_server(listed: &[NamedGroup]) -> NegotiationContext {
        let mut ctx = NegotiationContext::new(Mode::Server, Arc::new(Config::default()));
        ctx.add_negotiated(&VERSION, ProtocolVersion::Tls1_3).unwrap();
        ctx.remote_mut().groups = listed.to_vec();
        ctx
    }

    fn entry(group: NamedGroup) -> KeyShareEntry {
        KeyShareEntry {
            group,
            public: KeyShare::generate(group).unwrap().public_key().to_vec(),
        }
    }

    #[test]
    fn share_must_be_in_client_groups() {
        let _ = env_logger::try_init();
        // X25519 is our first choice but the client did not list it.
        let mut server = tls13_server(&[NamedGroup::Secp256r1]);
        let entries = vec![entry(NamedGroup::X25519), entry(NamedGroup::Secp256r1)];
        select_share(&mut server, &entries).unwrap();
        assert_eq!(
            server.negotiated(&KEY_SHARE).map(|e| e.group),
            Some(NamedGroup::Secp256r1)
        );
    }

    #[test]
    fn unlisted_shares_are_not_used() {
        let mut server = tls13_server(&[NamedGroup::Secp384r1]);
        select_share(&mut server, &[entry(NamedGroup::X25519)]).unwrap();
        assert!(server.negotiated(&KEY_SHARE).is_none());
        assert!(server.local().pre_master.is_none());
    }

    #[test]
    fn shares_without_supported_groups_are_missing_extension() {
        let mut server = tls13_server(&[]);
        let err = select_share(&mut server, &[entry(NamedGroup::X25519)]).unwrap_err();
        assert_eq!(err.alert().description, AlertDescription::MissingExtension);
    }

    #[test]
    fn client_shares_payload() {
        let shares = Shares::Client(vec![KeyShareEntry {
            group: NamedGroup::X25519,
            public: vec![0xAB; 32],
        }]);
        let ext = shares.to_extension();
        assert_eq!(ext.data.len(), shares.payload_length());
        assert_eq!(&ext.data[..6], &[0x00, 0x24, 0x00, 0x1D, 0x00, 0x20]);

        let parsed = decode(&ext.data, parse_client_shares).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].group, NamedGroup::X25519);
    }

    #[test]
    fn server_share_is_a_single_entry() {
        let data = [0x00, 0x17, 0x00, 0x02, 0x04, 0x01];
        let entry = decode(&data, parse_entry).unwrap();
        assert_eq!(entry.group, NamedGroup::Secp256r1);
        assert_eq!(entry.public, vec![0x04, 0x01]);
    }

    #[test]
    fn psk_modes_payload() {
        let ext = Modes(vec![PskKeyExchangeMode::PskDheKe]).to_extension();
        assert_eq!(ext.data, vec![0x01, 0x01]);
    }
}
