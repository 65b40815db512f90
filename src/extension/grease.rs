use super::{versions, ConfigurableExtension, ConfiguredExtension};
use crate::context::{Mode, NegotiationContext};
use crate::types::{grease, ExtensionType, ProtocolVersion};
use crate::Error;

/// An empty extension with a random GREASE type (RFC 8701), client only.
#[derive(Debug)]
pub struct GreaseExtension;

#[derive(Debug)]
struct Grease(u16);

impl ConfigurableExtension for GreaseExtension {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::Unknown(grease::VALUES[0])
    }

    fn versions(&self) -> &'static [ProtocolVersion] {
        versions::TLS10_UP
    }

    fn configure(
        &self,
        ctx: &mut NegotiationContext,
        _message_len: usize,
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        if ctx.mode() != Mode::Client || !ctx.config().grease() {
            return Ok(None);
        }
        Ok(Some(Box::new(Grease(grease::random()))))
    }

    fn deserialize(
        &self,
        _ctx: &NegotiationContext,
        _source: Mode,
        _payload: &[u8],
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        Ok(None)
    }
}

impl ConfiguredExtension for Grease {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::Unknown(self.0)
    }

    fn payload_length(&self) -> usize {
        0
    }

    fn serialize_payload(&self, _output: &mut Vec<u8>) {}

    fn apply(&self, _ctx: &mut NegotiationContext, _source: Mode) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grease_type_on_the_wire() {
        let ext = Grease(0x3A3A).to_extension();
        assert!(ext.extension_type.is_grease());
        let mut out = Vec::new();
        ext.serialize(&mut out);
        assert_eq!(out, vec![0x3A, 0x3A, 0x00, 0x00]);
    }
}
