//! Extensions whose payload is empty: presence is the whole message.

use super::{decode_error, versions, ConfigurableExtension, ConfiguredExtension};
use crate::alert::AlertDescription;
use crate::context::property::{
    Property, ENCRYPT_THEN_MAC, EXTENDED_MASTER_SECRET, POST_HANDSHAKE_AUTH, SECURE_RENEGOTIATION,
};
use crate::context::{Mode, NegotiationContext};
use crate::crypto::mode::ModeKind;
use crate::types::{ExtensionType, ProtocolVersion};
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flag {
    ExtendedMasterSecret,
    EncryptThenMac,
    PostHandshakeAuth,
}

/// extended_master_secret (RFC 7627), encrypt_then_mac (RFC 7366) and
/// post_handshake_auth (RFC 8446 section 4.2.6).
#[derive(Debug)]
pub struct FlagExtension {
    flag: Flag,
}

impl FlagExtension {
    pub fn extended_master_secret() -> Self {
        FlagExtension {
            flag: Flag::ExtendedMasterSecret,
        }
    }

    pub fn encrypt_then_mac() -> Self {
        FlagExtension {
            flag: Flag::EncryptThenMac,
        }
    }

    pub fn post_handshake_auth() -> Self {
        FlagExtension {
            flag: Flag::PostHandshakeAuth,
        }
    }

    fn property(&self) -> &'static Property<bool, bool> {
        match self.flag {
            Flag::ExtendedMasterSecret => &EXTENDED_MASTER_SECRET,
            Flag::EncryptThenMac => &ENCRYPT_THEN_MAC,
            Flag::PostHandshakeAuth => &POST_HANDSHAKE_AUTH,
        }
    }

    fn enabled(&self, ctx: &NegotiationContext) -> bool {
        let config = ctx.config();
        match self.flag {
            Flag::ExtendedMasterSecret => config.extended_master_secret(),
            Flag::EncryptThenMac => config.encrypt_then_mac(),
            Flag::PostHandshakeAuth => config.post_handshake_auth(),
        }
    }

    /// Whether a server echoes the flag for what it selected.
    fn echoed(&self, ctx: &NegotiationContext) -> bool {
        match self.flag {
            // Only meaningful for MAC-then-encrypt block ciphers.
            Flag::EncryptThenMac => ctx.cipher().map(|c| c.mode == ModeKind::Cbc).unwrap_or(false),
            Flag::ExtendedMasterSecret => !ctx.version().map(|v| v.is_tls13()).unwrap_or(false),
            // Signalled by the client only.
            Flag::PostHandshakeAuth => false,
        }
    }
}

#[derive(Debug)]
struct Present(ExtensionType, &'static Property<bool, bool>);

impl ConfigurableExtension for FlagExtension {
    fn extension_type(&self) -> ExtensionType {
        match self.flag {
            Flag::ExtendedMasterSecret => ExtensionType::ExtendedMasterSecret,
            Flag::EncryptThenMac => ExtensionType::EncryptThenMac,
            Flag::PostHandshakeAuth => ExtensionType::PostHandshakeAuth,
        }
    }

    fn versions(&self) -> &'static [ProtocolVersion] {
        match self.flag {
            Flag::ExtendedMasterSecret => versions::TLS10_UP,
            Flag::EncryptThenMac => versions::TLS10_TO_12,
            Flag::PostHandshakeAuth => versions::TLS13,
        }
    }

    fn configure(
        &self,
        ctx: &mut NegotiationContext,
        _message_len: usize,
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        let send = match ctx.mode() {
            Mode::Client => {
                let enabled = self.enabled(ctx);
                if enabled {
                    ctx.add_negotiable(self.property(), true);
                }
                enabled
            }
            Mode::Server => ctx.flag(self.property()) && self.echoed(ctx),
        };
        Ok(send.then(|| {
            Box::new(Present(self.extension_type(), self.property())) as Box<dyn ConfiguredExtension>
        }))
    }

    fn deserialize(
        &self,
        _ctx: &NegotiationContext,
        _source: Mode,
        payload: &[u8],
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        if !payload.is_empty() {
            return Err(decode_error());
        }
        Ok(Some(Box::new(Present(self.extension_type(), self.property()))))
    }
}

impl ConfiguredExtension for Present {
    fn extension_type(&self) -> ExtensionType {
        self.0
    }

    fn payload_length(&self) -> usize {
        0
    }

    fn serialize_payload(&self, _output: &mut Vec<u8>) {}

    fn apply(&self, ctx: &mut NegotiationContext, source: Mode) -> Result<(), Error> {
        let value = match source {
            // The server agrees to what it supports.
            Mode::Client => match self.0 {
                ExtensionType::ExtendedMasterSecret => ctx.config().extended_master_secret(),
                ExtensionType::EncryptThenMac => ctx.config().encrypt_then_mac(),
                _ => true,
            },
            Mode::Server => true,
        };
        ctx.add_negotiated(self.1, value)
    }
}

/// renegotiation_info (RFC 5746), initial handshake only.
#[derive(Debug)]
pub struct RenegotiationInfoExtension;

#[derive(Debug)]
struct EmptyRenegotiationInfo;

impl ConfigurableExtension for RenegotiationInfoExtension {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::RenegotiationInfo
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
                ctx.add_negotiable(&SECURE_RENEGOTIATION, true);
                true
            }
            Mode::Server => {
                ctx.flag(&SECURE_RENEGOTIATION)
                    && !ctx.version().map(|v| v.is_tls13()).unwrap_or(false)
            }
        };
        Ok(send.then(|| Box::new(EmptyRenegotiationInfo) as Box<dyn ConfiguredExtension>))
    }

    fn deserialize(
        &self,
        _ctx: &NegotiationContext,
        _source: Mode,
        payload: &[u8],
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        // A non-empty renegotiated_connection on an initial handshake.
        if payload != [0] {
            warn!("renegotiation_info is not empty: {:02x?}", payload);
            return Err(Error::fatal(AlertDescription::HandshakeFailure));
        }
        Ok(Some(Box::new(EmptyRenegotiationInfo)))
    }
}

impl ConfiguredExtension for EmptyRenegotiationInfo {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::RenegotiationInfo
    }

    fn payload_length(&self) -> usize {
        1
    }

    fn serialize_payload(&self, output: &mut Vec<u8>) {
        output.push(0);
    }

    fn apply(&self, ctx: &mut NegotiationContext, _source: Mode) -> Result<(), Error> {
        // The SCSV may already have set it.
        if !ctx.is_negotiated(&SECURE_RENEGOTIATION) {
            ctx.add_negotiated(&SECURE_RENEGOTIATION, true)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_empty_on_the_wire() {
        let ext = Present(ExtensionType::EncryptThenMac, &ENCRYPT_THEN_MAC).to_extension();
        let mut out = Vec::new();
        ext.serialize(&mut out);
        assert_eq!(out, vec![0x00, 0x16, 0x00, 0x00]);

        let ext = Present(ExtensionType::ExtendedMasterSecret, &EXTENDED_MASTER_SECRET).to_extension();
        let mut out = Vec::new();
        ext.serialize(&mut out);
        assert_eq!(out, vec![0x00, 0x17, 0x00, 0x00]);
    }

    #[test]
    fn renegotiation_info_payload() {
        let ext = EmptyRenegotiationInfo.to_extension();
        let mut out = Vec::new();
        ext.serialize(&mut out);
        assert_eq!(out, vec![0xFF, 0x01, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn flag_versions() {
        assert!(!FlagExtension::encrypt_then_mac()
            .versions()
            .contains(&ProtocolVersion::Tls1_3));
        assert_eq!(
            FlagExtension::post_handshake_auth().versions(),
            versions::TLS13
        );
    }
}
