use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

use crate::kx::KeyExchangeAlgorithm;
use crate::types::NamedGroup;
use crate::util::{push_u16_prefixed, push_u8_prefixed, u16_prefixed, u8_prefixed};

/// ECParameters.curve_type for a named curve (RFC 8422 section 5.4).
const NAMED_CURVE: u8 = 3;

/// Ephemeral parameters sent by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KxParams {
    Dh {
        p: Vec<u8>,
        g: Vec<u8>,
        public: Vec<u8>,
    },
    Ecdh {
        group: NamedGroup,
        public: Vec<u8>,
    },
}

impl KxParams {
    pub fn public(&self) -> &[u8] {
        match self {
            KxParams::Dh { public, .. } | KxParams::Ecdh { public, .. } => public,
        }
    }

    fn parse_dh(input: &[u8]) -> IResult<&[u8], KxParams> {
        let (input, p) = u16_prefixed(input)?;
        let (input, g) = u16_prefixed(input)?;
        let (input, public) = u16_prefixed(input)?;
        Ok((
            input,
            KxParams::Dh {
                p: p.to_vec(),
                g: g.to_vec(),
                public: public.to_vec(),
            },
        ))
    }

    fn parse_ecdh(input: &[u8]) -> IResult<&[u8], KxParams> {
        let (input, curve_type) = be_u8(input)?;
        if curve_type != NAMED_CURVE {
            return Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Tag,
            )));
        }
        let (input, group) = NamedGroup::parse(input)?;
        let (input, public) = u8_prefixed(input)?;
        Ok((
            input,
            KxParams::Ecdh {
                group,
                public: public.to_vec(),
            },
        ))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        match self {
            KxParams::Dh { p, g, public } => {
                push_u16_prefixed(output, p);
                push_u16_prefixed(output, g);
                push_u16_prefixed(output, public);
            }
            KxParams::Ecdh { group, public } => {
                output.push(NAMED_CURVE);
                group.serialize(output);
                push_u8_prefixed(output, public);
            }
        }
    }
}

/// ServerKeyExchange body.
///
/// The signature is kept as the raw `DigitallySigned` bytes and checked
/// against the server certificate once the message is processed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerKeyExchange {
    pub psk_identity_hint: Option<Vec<u8>>,
    pub params: Option<KxParams>,
    pub signature: Option<Vec<u8>>,
}

impl ServerKeyExchange {
    pub fn parse(input: &[u8], kx: KeyExchangeAlgorithm) -> IResult<&[u8], ServerKeyExchange> {
        use KeyExchangeAlgorithm::*;

        let (input, psk_identity_hint) = if kx.is_psk() {
            let (input, hint) = u16_prefixed(input)?;
            (input, Some(hint.to_vec()))
        } else {
            (input, None)
        };

        let (input, params) = match kx {
            DheRsa | DheDss | DhAnon | DhePsk => {
                let (input, p) = KxParams::parse_dh(input)?;
                (input, Some(p))
            }
            EcdheEcdsa | EcdheRsa | EcdhAnon | EcdhePsk => {
                let (input, p) = KxParams::parse_ecdh(input)?;
                (input, Some(p))
            }
            Psk | RsaPsk => (input, None),
            _ => {
                return Err(nom::Err::Failure(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Switch,
                )))
            }
        };

        let signed = matches!(kx, DheRsa | DheDss | EcdheEcdsa | EcdheRsa);
        let (input, signature) = if signed && !input.is_empty() {
            // SignatureAndHashAlgorithm is absent before TLS1.2, so the
            // length prefix may sit at either offset. Keep everything.
            (&input[input.len()..], Some(input.to_vec()))
        } else {
            (input, None)
        };

        Ok((
            input,
            ServerKeyExchange {
                psk_identity_hint,
                params,
                signature,
            },
        ))
    }

    /// The bytes covered by the server signature, after the two randoms.
    pub fn signed_params(&self) -> Vec<u8> {
        let mut out = Vec::new();
        if let Some(p) = &self.params {
            p.serialize(&mut out);
        }
        out
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        if let Some(hint) = &self.psk_identity_hint {
            push_u16_prefixed(output, hint);
        }
        if let Some(p) = &self.params {
            p.serialize(output);
        }
        if let Some(sig) = &self.signature {
            output.extend_from_slice(sig);
        }
    }
}

/// Read the `SignatureAndHashAlgorithm` of a TLS1.2 signature.
pub fn signature_scheme(signature: &[u8]) -> IResult<&[u8], u16> {
    be_u16(signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ECDHE: &[u8] = &[
        0x03, // curve_type named_curve
        0x00, 0x1D, // x25519
        0x04, // public length
        0x01, 0x02, 0x03, 0x04, // public
        0x04, 0x03, 0x00, 0x02, 0xAA, 0xBB, // signature
    ];

    #[test]
    fn ecdhe_params() {
        let (rest, ske) = ServerKeyExchange::parse(ECDHE, KeyExchangeAlgorithm::EcdheRsa).unwrap();
        assert!(rest.is_empty());
        assert_eq!(
            ske.params,
            Some(KxParams::Ecdh {
                group: NamedGroup::X25519,
                public: vec![1, 2, 3, 4]
            })
        );
        assert_eq!(ske.signed_params(), &ECDHE[..8]);
        let sig = ske.signature.as_deref().unwrap();
        assert_eq!(signature_scheme(sig).unwrap().1, 0x0403);

        let mut out = Vec::new();
        ske.serialize(&mut out);
        assert_eq!(out, ECDHE);
    }

    #[test]
    fn dhe_psk_has_hint_and_no_signature() {
        let data = [
            0x00, 0x02, 0x68, 0x69, // hint "hi"
            0x00, 0x01, 0x17, // p
            0x00, 0x01, 0x05, // g
            0x00, 0x01, 0x08, // public
        ];
        let (rest, ske) = ServerKeyExchange::parse(&data, KeyExchangeAlgorithm::DhePsk).unwrap();
        assert!(rest.is_empty());
        assert_eq!(ske.psk_identity_hint.as_deref(), Some(&b"hi"[..]));
        assert_eq!(ske.params.as_ref().unwrap().public(), &[0x08]);
        assert!(ske.signature.is_none());
    }

    #[test]
    fn explicit_curve_rejected() {
        let data = [0x01, 0x00];
        assert!(ServerKeyExchange::parse(&data, KeyExchangeAlgorithm::EcdheEcdsa).is_err());
    }

    #[test]
    fn rsa_has_no_server_key_exchange() {
        assert!(ServerKeyExchange::parse(&[], KeyExchangeAlgorithm::Rsa).is_err());
    }
}
