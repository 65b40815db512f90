use nom::IResult;

use crate::kx::KeyExchangeAlgorithm;
use crate::types::ProtocolVersion;
use crate::util::{push_u16_prefixed, push_u8_prefixed, u16_prefixed, u8_prefixed};

/// How the exchange value is framed for a key exchange algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// SSL3 RSA: the encrypted pre-master fills the body.
    Raw,
    U8,
    U16,
    Empty,
}

fn framing(kx: KeyExchangeAlgorithm, version: ProtocolVersion) -> Option<Framing> {
    use KeyExchangeAlgorithm::*;
    let f = match kx {
        Rsa if version == ProtocolVersion::Ssl3_0 => Framing::Raw,
        Rsa | RsaPsk => Framing::U16,
        DhRsa | DhDss | DheRsa | DheDss | DhAnon | DhePsk => Framing::U16,
        EcdhEcdsa | EcdhRsa | EcdheEcdsa | EcdheRsa | EcdhAnon | EcdhePsk => Framing::U8,
        Psk => Framing::Empty,
        _ => return None,
    };
    Some(f)
}

/// ClientKeyExchange body: optional PSK identity followed by the exchange
/// value (public key or encrypted pre-master).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKeyExchange {
    pub identity: Option<Vec<u8>>,
    pub exchange: Vec<u8>,
}

impl ClientKeyExchange {
    pub fn parse(
        input: &[u8],
        kx: KeyExchangeAlgorithm,
        version: ProtocolVersion,
    ) -> IResult<&[u8], ClientKeyExchange> {
        let Some(framing) = framing(kx, version) else {
            return Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Switch,
            )));
        };

        let (input, identity) = if kx.is_psk() {
            let (input, id) = u16_prefixed(input)?;
            (input, Some(id.to_vec()))
        } else {
            (input, None)
        };

        let (input, exchange) = match framing {
            Framing::Raw => (&input[input.len()..], input),
            Framing::U8 => u8_prefixed(input)?,
            Framing::U16 => u16_prefixed(input)?,
            Framing::Empty => (input, &[][..]),
        };

        Ok((
            input,
            ClientKeyExchange {
                identity,
                exchange: exchange.to_vec(),
            },
        ))
    }

    pub fn serialize(
        &self,
        kx: KeyExchangeAlgorithm,
        version: ProtocolVersion,
        output: &mut Vec<u8>,
    ) -> Result<(), crate::Error> {
        let framing = framing(kx, version).ok_or_else(|| {
            crate::Error::internal(format!("No ClientKeyExchange format for {}", kx))
        })?;
        if kx.is_psk() {
            push_u16_prefixed(output, self.identity.as_deref().unwrap_or_default());
        }
        match framing {
            Framing::Raw => output.extend_from_slice(&self.exchange),
            Framing::U8 => push_u8_prefixed(output, &self.exchange),
            Framing::U16 => push_u16_prefixed(output, &self.exchange),
            Framing::Empty => {}
        }
        Ok(())
    }
}
