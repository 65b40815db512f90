use super::{versions, ConfigurableExtension, ConfiguredExtension, Dependencies};
use crate::context::{Mode, NegotiationContext};
use crate::types::{ExtensionType, ProtocolVersion};
use crate::Error;

/// Bytes of zero padding needed to lift a ClientHello of `len` bytes to
/// `target` (RFC 7685).
///
/// Only hellos longer than 255 bytes and shorter than the target are padded.
/// The 4 byte extension header counts towards the target, but a padding
/// extension always carries at least one byte.
pub fn padding_len(len: usize, target: usize) -> Option<usize> {
    if len <= 255 || len >= target {
        return None;
    }
    let pad = target - len;
    Some(if pad >= 5 { pad - 4 } else { 1 })
}

/// padding, client only and sized last.
#[derive(Debug)]
pub struct PaddingExtension;

#[derive(Debug)]
struct Padding(usize);

impl ConfigurableExtension for PaddingExtension {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::Padding
    }

    fn versions(&self) -> &'static [ProtocolVersion] {
        versions::TLS10_UP
    }

    fn dependencies(&self) -> Dependencies {
        Dependencies::All
    }

    fn configure(
        &self,
        ctx: &mut NegotiationContext,
        message_len: usize,
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        if ctx.mode() != Mode::Client {
            return Ok(None);
        }
        let Some(target) = ctx.config().padding_target() else {
            return Ok(None);
        };
        Ok(padding_len(message_len, target).map(|n| Box::new(Padding(n)) as Box<dyn ConfiguredExtension>))
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

impl ConfiguredExtension for Padding {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::Padding
    }

    fn payload_length(&self) -> usize {
        self.0
    }

    fn serialize_payload(&self, output: &mut Vec<u8>) {
        output.resize(output.len() + self.0, 0);
    }

    fn apply(&self, _ctx: &mut NegotiationContext, _source: Mode) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_to_target() {
        // 300 + 4 header + 208 = 512
        assert_eq!(padding_len(300, 512), Some(208));
        assert_eq!(padding_len(508, 512), Some(1));
        assert_eq!(padding_len(507, 512), Some(1));
        assert_eq!(padding_len(506, 512), Some(2));
    }

    #[test]
    fn small_or_large_hellos_untouched() {
        assert_eq!(padding_len(255, 512), None);
        assert_eq!(padding_len(100, 512), None);
        assert_eq!(padding_len(512, 512), None);
        assert_eq!(padding_len(600, 512), None);
    }

    #[test]
    fn payload_is_zeros() {
        let ext = Padding(3).to_extension();
        assert_eq!(ext.data, vec![0, 0, 0]);
    }
}
