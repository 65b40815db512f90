//! Hello extensions.
//!
//! Every extension is a [`ConfigurableExtension`] registered in the
//! [`Config`](crate::config::Config). Outbound it decides whether and what to
//! send, producing a [`ConfiguredExtension`]. Inbound it decodes the peer's
//! payload into a [`ConfiguredExtension`] whose [`apply`](ConfiguredExtension::apply)
//! writes the outcome into the negotiation context.
//!
//! Extensions are processed in dependency order. `key_share` needs
//! `supported_groups` first, and `padding` needs everything else sized.

use std::fmt;
use std::sync::Arc;

use crate::context::{Mode, NegotiationContext};
use crate::message::Extension;
use crate::types::{ExtensionType, ProtocolVersion};
use crate::Error;

mod alpn;
mod flags;
mod grease;
mod key_share;
mod max_fragment_length;
mod padding;
mod server_name;
mod signature_algorithms;
mod supported_groups;
mod supported_versions;

pub use alpn::{AlpnExtension, NpnExtension};
pub use flags::{FlagExtension, RenegotiationInfoExtension};
pub use grease::GreaseExtension;
pub use key_share::{KeyShareExtension, PskKeyExchangeModesExtension};
pub use max_fragment_length::{MaxFragmentLength, MaxFragmentLengthExtension};
pub use padding::PaddingExtension;
pub use server_name::ServerNameExtension;
pub use signature_algorithms::SignatureAlgorithmsExtension;
pub use supported_groups::{EcPointFormatsExtension, SupportedGroupsExtension};
pub use supported_versions::SupportedVersionsExtension;

/// Versions extensions apply to, shared by the built-ins.
pub(crate) mod versions {
    use crate::types::ProtocolVersion::{self, *};

    pub const TLS10_UP: &[ProtocolVersion] =
        &[Tls1_0, Tls1_1, Tls1_2, Tls1_3, Dtls1_0, Dtls1_2, Dtls1_3];
    pub const TLS10_TO_12: &[ProtocolVersion] = &[Tls1_0, Tls1_1, Tls1_2, Dtls1_0, Dtls1_2];
    pub const TLS12_UP: &[ProtocolVersion] = &[Tls1_2, Tls1_3, Dtls1_2, Dtls1_3];
    pub const TLS13: &[ProtocolVersion] = &[Tls1_3, Dtls1_3];
}

/// What must be processed before an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependencies {
    None,
    Some(Vec<ExtensionType>),
    /// Every other extension. Reserved for extensions sized from the rest.
    All,
}

pub trait ConfigurableExtension: Send + Sync + fmt::Debug {
    fn extension_type(&self) -> ExtensionType;

    fn versions(&self) -> &'static [ProtocolVersion];

    fn dependencies(&self) -> Dependencies {
        Dependencies::None
    }

    /// Decide what to send. `message_len` is the length of the hello so far,
    /// including every extension configured before this one.
    fn configure(
        &self,
        ctx: &mut NegotiationContext,
        message_len: usize,
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error>;

    /// Decode a payload sent by `source`.
    ///
    /// `None` means the extension does not apply and is dropped.
    fn deserialize(
        &self,
        ctx: &NegotiationContext,
        source: Mode,
        payload: &[u8],
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error>;
}

pub trait ConfiguredExtension: Send + fmt::Debug {
    fn extension_type(&self) -> ExtensionType;

    fn payload_length(&self) -> usize;

    fn serialize_payload(&self, output: &mut Vec<u8>);

    /// Record the outcome of an extension sent by `source`.
    fn apply(&self, ctx: &mut NegotiationContext, source: Mode) -> Result<(), Error>;

    fn to_extension(&self) -> Extension {
        let mut data = Vec::with_capacity(self.payload_length());
        self.serialize_payload(&mut data);
        Extension::new(self.extension_type(), data)
    }
}

/// The extensions registered by default, in send order.
pub fn builtin() -> Vec<Arc<dyn ConfigurableExtension>> {
    vec![
        Arc::new(GreaseExtension),
        Arc::new(ServerNameExtension),
        Arc::new(FlagExtension::extended_master_secret()),
        Arc::new(RenegotiationInfoExtension),
        Arc::new(SupportedGroupsExtension),
        Arc::new(EcPointFormatsExtension),
        Arc::new(AlpnExtension),
        Arc::new(NpnExtension),
        Arc::new(MaxFragmentLengthExtension),
        Arc::new(FlagExtension::encrypt_then_mac()),
        Arc::new(SignatureAlgorithmsExtension),
        Arc::new(KeyShareExtension),
        Arc::new(PskKeyExchangeModesExtension),
        Arc::new(SupportedVersionsExtension),
        Arc::new(FlagExtension::post_handshake_auth()),
        Arc::new(PaddingExtension),
    ]
}

/// Stable topological order over `types` and their dependencies.
///
/// Returns indices into the input. Dependencies on types not in the input are
/// ignored. `All` extensions come last in input order. A cycle is an
/// internal error.
pub fn resolve_order(deps: &[(ExtensionType, Dependencies)]) -> Result<Vec<usize>, Error> {
    let n = deps.len();
    let mut done = vec![false; n];
    let mut order = Vec::with_capacity(n);

    let (last, regular): (Vec<usize>, Vec<usize>) =
        (0..n).partition(|i| deps[*i].1 == Dependencies::All);

    let ready = |i: usize, done: &[bool]| match &deps[i].1 {
        Dependencies::Some(needs) => needs.iter().all(|t| {
            deps.iter()
                .enumerate()
                .filter(|(j, (ty, _))| ty == t && *j != i)
                .all(|(j, _)| done[j])
        }),
        _ => true,
    };

    while order.len() < regular.len() {
        let next = regular.iter().copied().find(|i| !done[*i] && ready(*i, &done));
        let Some(i) = next else {
            return Err(Error::internal("Cyclic extension dependencies"));
        };
        done[i] = true;
        order.push(i);
    }

    order.extend(last);
    Ok(order)
}

fn applies(ext: &dyn ConfigurableExtension, versions: &[ProtocolVersion]) -> bool {
    versions.iter().any(|v| ext.versions().contains(v))
}

/// Configure and serialize the extensions for an outgoing hello.
///
/// `base_len` is the length of the hello without its extension block.
pub(crate) fn configure_all(
    ctx: &mut NegotiationContext,
    base_len: usize,
) -> Result<Vec<Extension>, Error> {
    let config = ctx.config_arc();
    let candidates = ctx.candidate_versions();

    let applicable: Vec<&Arc<dyn ConfigurableExtension>> = config
        .extensions()
        .iter()
        .filter(|e| applies(e.as_ref(), &candidates))
        .collect();

    let deps: Vec<_> = applicable
        .iter()
        .map(|e| (e.extension_type(), e.dependencies()))
        .collect();

    // The 2 byte extension block length.
    let mut message_len = base_len + 2;
    let mut out = Vec::new();
    for i in resolve_order(&deps)? {
        let Some(c) = applicable[i].configure(ctx, message_len)? else {
            continue;
        };
        message_len += 4 + c.payload_length();
        trace!("Sending extension {:?}", c.extension_type());
        if ctx.mode() == Mode::Client {
            ctx.mark_sent(c.extension_type());
        }
        out.push(c.to_extension());
    }
    Ok(out)
}

/// Decode and apply the extensions of a received hello.
///
/// A client rejects anything it did not ask for. A server ignores what it
/// does not know.
pub(crate) fn process_all(
    ctx: &mut NegotiationContext,
    source: Mode,
    received: &[Extension],
) -> Result<(), Error> {
    let config = ctx.config_arc();
    let local_is_client = source == Mode::Server;

    let mut decoded = Vec::new();
    for raw in received {
        let ty = raw.extension_type;
        if local_is_client && !ctx.was_sent(ty) {
            warn!("Server sent unrequested extension {:?}", ty);
            return Err(Error::fatal(crate::alert::AlertDescription::UnsupportedExtension));
        }

        let found = config
            .extensions()
            .iter()
            .find(|e| e.extension_type() == ty && !ty.is_grease());
        let Some(ext) = found else {
            debug!("Ignoring extension {:?}", ty);
            continue;
        };

        if let Some(c) = ext.deserialize(ctx, source, &raw.data)? {
            decoded.push((ext.dependencies(), c));
        }
    }

    let deps: Vec<_> = decoded
        .iter()
        .map(|(d, c)| (c.extension_type(), d.clone()))
        .collect();
    for i in resolve_order(&deps)? {
        let c = &decoded[i].1;
        c.apply(ctx, source)?;
        debug!("Applied extension {:?} from {:?}", c.extension_type(), source);
    }
    Ok(())
}

fn decode_error() -> Error {
    Error::fatal(crate::alert::AlertDescription::DecodeError)
}

fn illegal_parameter() -> Error {
    Error::fatal(crate::alert::AlertDescription::IllegalParameter)
}

/// Run `parser` over a whole payload. Leftover bytes are a decode error.
fn decode<'a, O>(
    payload: &'a [u8],
    mut parser: impl FnMut(&'a [u8]) -> nom::IResult<&'a [u8], O>,
) -> Result<O, Error> {
    match parser(payload) {
        Ok((rest, o)) if rest.is_empty() => Ok(o),
        _ => Err(decode_error()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(order: &[usize], deps: &[(ExtensionType, Dependencies)]) -> Vec<ExtensionType> {
        order.iter().map(|i| deps[*i].0).collect()
    }

    #[test]
    fn padding_last_groups_before_key_share() {
        let deps = vec![
            (ExtensionType::Padding, Dependencies::All),
            (
                ExtensionType::KeyShare,
                Dependencies::Some(vec![ExtensionType::SupportedGroups]),
            ),
            (ExtensionType::SupportedGroups, Dependencies::None),
        ];
        let order = resolve_order(&deps).unwrap();
        assert_eq!(
            types(&order, &deps),
            vec![
                ExtensionType::SupportedGroups,
                ExtensionType::KeyShare,
                ExtensionType::Padding
            ]
        );
    }

    #[test]
    fn stable_without_dependencies() {
        let deps = vec![
            (ExtensionType::ServerName, Dependencies::None),
            (ExtensionType::ExtendedMasterSecret, Dependencies::None),
            (ExtensionType::EncryptThenMac, Dependencies::None),
        ];
        assert_eq!(resolve_order(&deps).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn missing_dependency_ignored() {
        let deps = vec![(
            ExtensionType::KeyShare,
            Dependencies::Some(vec![ExtensionType::SupportedGroups]),
        )];
        assert_eq!(resolve_order(&deps).unwrap(), vec![0]);
    }

    #[test]
    fn cycle_is_internal_error() {
        let deps = vec![
            (
                ExtensionType::KeyShare,
                Dependencies::Some(vec![ExtensionType::SupportedGroups]),
            ),
            (
                ExtensionType::SupportedGroups,
                Dependencies::Some(vec![ExtensionType::KeyShare]),
            ),
        ];
        let err = resolve_order(&deps).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn builtin_order_is_resolvable() {
        let exts = builtin();
        let deps: Vec<_> = exts
            .iter()
            .map(|e| (e.extension_type(), e.dependencies()))
            .collect();
        let order = resolve_order(&deps).unwrap();
        let t = types(&order, &deps);
        let pos = |ty| t.iter().position(|x| *x == ty).unwrap();
        assert!(pos(ExtensionType::SupportedGroups) < pos(ExtensionType::KeyShare));
        assert!(pos(ExtensionType::SupportedVersions) < pos(ExtensionType::KeyShare));
        assert_eq!(*t.last().unwrap(), ExtensionType::Padding);
    }
}
