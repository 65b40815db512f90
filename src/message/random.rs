use std::ops::Deref;

use nom::bytes::complete::take;
use nom::IResult;
use rand::RngCore;
use time::OffsetDateTime;

use crate::types::ProtocolVersion;

/// Downgrade sentinel a TLS 1.3 server writes into the last 8 bytes of
/// ServerHello.random when negotiating TLS 1.2 (RFC 8446 section 4.1.3).
pub const DOWNGRADE_TLS12: [u8; 8] = *b"DOWNGRD\x01";

/// Same, for TLS 1.1 or below.
pub const DOWNGRADE_TLS11: [u8; 8] = *b"DOWNGRD\x00";

/// The 32-byte hello random.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Random(pub [u8; 32]);

impl Random {
    /// Fresh random for `version`.
    ///
    /// Below TLS 1.3 the first four bytes carry `gmt_unix_time`, from 1.3 on
    /// all 32 bytes are random.
    pub fn new(version: ProtocolVersion) -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        if !version.is_tls13() {
            // Valid until 2106.
            let now = OffsetDateTime::now_utc().unix_timestamp() as u32;
            bytes[..4].copy_from_slice(&now.to_be_bytes());
        }
        Random(bytes)
    }

    /// Server random with the downgrade sentinel for `negotiated` applied,
    /// when the server also supports a higher version.
    pub fn for_server(negotiated: ProtocolVersion, highest_supported: ProtocolVersion) -> Self {
        let mut random = Random::new(negotiated);
        if highest_supported.is_tls13() && !negotiated.is_tls13() {
            let marker = if negotiated.rank() == 4 {
                DOWNGRADE_TLS12
            } else {
                DOWNGRADE_TLS11
            };
            random.0[24..].copy_from_slice(&marker);
        }
        random
    }

    pub fn gmt_unix_time(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Whether the random carries either downgrade sentinel.
    pub fn is_downgrade(&self) -> bool {
        self.0[24..] == DOWNGRADE_TLS12 || self.0[24..] == DOWNGRADE_TLS11
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], Random> {
        let (input, data) = take(32_usize)(input)?;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(data);
        Ok((input, Random(bytes)))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.0);
    }
}

impl Deref for Random {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_parse() {
        let data: Vec<u8> = (1..=33).collect();
        let (rest, parsed) = Random::parse(&data).unwrap();
        assert_eq!(rest, &[33]);
        assert_eq!(parsed.gmt_unix_time(), 0x01020304);

        let mut out = Vec::new();
        parsed.serialize(&mut out);
        assert_eq!(out, &data[..32]);
    }

    #[test]
    fn legacy_random_has_time_prefix() {
        let r = Random::new(ProtocolVersion::Tls1_2);
        // Any time after 2020-01-01.
        assert!(r.gmt_unix_time() > 1_577_836_800);
    }

    #[test]
    fn downgrade_marker() {
        let r = Random::for_server(ProtocolVersion::Tls1_2, ProtocolVersion::Tls1_3);
        assert_eq!(&r[24..], b"DOWNGRD\x01");
        assert!(r.is_downgrade());

        let r = Random::for_server(ProtocolVersion::Tls1_0, ProtocolVersion::Tls1_3);
        assert_eq!(&r[24..], b"DOWNGRD\x00");

        let r = Random::for_server(ProtocolVersion::Tls1_2, ProtocolVersion::Tls1_2);
        assert!(!r.is_downgrade());
    }
}
