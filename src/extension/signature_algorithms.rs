use super::{decode, decode_error, versions, ConfigurableExtension, ConfiguredExtension};
use crate::alert::AlertDescription;
use crate::context::property::SIGNATURE_ALGORITHMS;
use crate::context::{Mode, NegotiationContext};
use crate::types::{ExtensionType, ProtocolVersion, SignatureScheme};
use crate::util::{all_of, u16_prefixed};
use crate::Error;

fn parse_schemes(input: &[u8]) -> nom::IResult<&[u8], Vec<SignatureScheme>> {
    let (rest, list) = u16_prefixed(input)?;
    let (_, schemes) = all_of(SignatureScheme::parse)(list)?;
    Ok((rest, schemes))
}

/// signature_algorithms (RFC 5246 section 7.4.1.4.1, RFC 8446 section 4.2.3).
///
/// Sent by the client. The server keeps the schemes both sides support, in
/// the client's order, for choosing how to sign.
#[derive(Debug)]
pub struct SignatureAlgorithmsExtension;

#[derive(Debug)]
struct Schemes(Vec<SignatureScheme>);

impl ConfigurableExtension for SignatureAlgorithmsExtension {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::SignatureAlgorithms
    }

    fn versions(&self) -> &'static [ProtocolVersion] {
        versions::TLS12_UP
    }

    fn configure(
        &self,
        ctx: &mut NegotiationContext,
        _message_len: usize,
    ) -> Result<Option<Box<dyn ConfiguredExtension>>, Error> {
        if ctx.mode() != Mode::Client {
            return Ok(None);
        }
        let schemes = ctx.config().signature_schemes().to_vec();
        if schemes.is_empty() {
            return Ok(None);
        }
        ctx.add_negotiable(&SIGNATURE_ALGORITHMS, schemes.clone());
        Ok(Some(Box::new(Schemes(schemes))))
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
        let schemes = decode(payload, parse_schemes)?;
        if schemes.is_empty() {
            return Err(decode_error());
        }
        Ok(Some(Box::new(Schemes(schemes))))
    }
}

impl ConfiguredExtension for Schemes {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::SignatureAlgorithms
    }

    fn payload_length(&self) -> usize {
        2 + 2 * self.0.len()
    }

    fn serialize_payload(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&((2 * self.0.len()) as u16).to_be_bytes());
        for s in &self.0 {
            output.extend_from_slice(&s.as_u16().to_be_bytes());
        }
    }

    fn apply(&self, ctx: &mut NegotiationContext, _source: Mode) -> Result<(), Error> {
        let ours = ctx.config().signature_schemes();
        let common: Vec<_> = self.0.iter().filter(|s| ours.contains(s)).copied().collect();
        if common.is_empty() {
            debug!("No signature scheme in common with {:?}", self.0);
        }
        ctx.add_negotiated(&SIGNATURE_ALGORITHMS, common)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schemes_payload() {
        let ext = Schemes(vec![
            SignatureScheme::EcdsaSecp256r1Sha256,
            SignatureScheme::RsaPssRsaeSha256,
        ])
        .to_extension();
        assert_eq!(ext.data, vec![0x00, 0x04, 0x04, 0x03, 0x08, 0x04]);
        assert_eq!(
            decode(&ext.data, parse_schemes).unwrap(),
            vec![
                SignatureScheme::EcdsaSecp256r1Sha256,
                SignatureScheme::RsaPssRsaeSha256
            ]
        );
    }

    #[test]
    fn odd_length_is_rejected() {
        assert!(decode(&[0x00, 0x03, 0x04, 0x03, 0x08], parse_schemes).is_err());
    }
}
