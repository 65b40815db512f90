//! Cipher modes: an engine plus record framing and authentication.

mod aead;
pub use aead::{AeadMode, Nonce};

mod cbc;
pub use cbc::CbcMode;

mod ccm;
mod chacha20_poly1305;
mod gcm;

mod stream;
pub use stream::StreamMode;

use zeroize::Zeroizing;

use super::engine::EngineKind;
use crate::auth::{Authenticator, RecordMac};
use crate::crypto::hash::HashAlgorithm;
use crate::types::{ContentType, ProtocolVersion};
use crate::Error;

/// Explicit nonce carried in front of TLS 1.2 GCM/CCM records.
pub const EXPLICIT_NONCE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeKind {
    Null,
    Stream,
    Cbc,
    Gcm,
    Ccm,
    Ccm8,
    ChaCha20Poly1305,
    /// GOST CTR-OMAC (RFC 9189).
    CtrOmac,
}

impl ModeKind {
    pub fn is_aead(&self) -> bool {
        matches!(
            self,
            ModeKind::Gcm | ModeKind::Ccm | ModeKind::Ccm8 | ModeKind::ChaCha20Poly1305
        )
    }

    pub fn tag_length(&self) -> usize {
        match self {
            ModeKind::Gcm | ModeKind::Ccm | ModeKind::ChaCha20Poly1305 => 16,
            ModeKind::Ccm8 => 8,
            _ => 0,
        }
    }

    /// Bytes of IV taken from the key block.
    pub fn fixed_iv_length(&self, engine: EngineKind, version: ProtocolVersion) -> usize {
        match self {
            ModeKind::Gcm | ModeKind::Ccm | ModeKind::Ccm8 => {
                if version.is_tls13() {
                    12
                } else {
                    4
                }
            }
            ModeKind::ChaCha20Poly1305 => 12,
            ModeKind::Cbc => {
                if version.has_explicit_cbc_iv() {
                    0
                } else {
                    engine.block_length()
                }
            }
            ModeKind::Null | ModeKind::Stream | ModeKind::CtrOmac => 0,
        }
    }

    /// Per-record IV/nonce bytes sent in front of the ciphertext.
    pub fn record_iv_length(&self, engine: EngineKind, version: ProtocolVersion) -> usize {
        match self {
            ModeKind::Gcm | ModeKind::Ccm | ModeKind::Ccm8 if !version.is_tls13() => {
                EXPLICIT_NONCE_LEN
            }
            ModeKind::Cbc if version.has_explicit_cbc_iv() => engine.block_length(),
            _ => 0,
        }
    }

    /// Instantiate the mode for one direction of a connection.
    pub fn init(&self, engine: EngineKind, params: ModeParams<'_>) -> Result<CipherMode, Error> {
        let expected_iv = self.fixed_iv_length(engine, params.version);
        if params.fixed_iv.len() != expected_iv {
            return Err(Error::internal(format!(
                "{:?} expects a {} byte fixed IV, got {}",
                self,
                expected_iv,
                params.fixed_iv.len()
            )));
        }

        let mac = match (self.is_aead(), params.mac) {
            (false, Some((hash, key))) => Some(RecordMac::new(params.version, hash, key)?),
            _ => None,
        };
        let auth = Authenticator::new(params.version, mac);

        let mode = match self {
            ModeKind::Null => CipherMode::Stream(StreamMode::new(None, auth)),
            ModeKind::Stream => {
                let engine = engine.init(params.for_encryption, params.key)?.into_stream()?;
                CipherMode::Stream(StreamMode::new(Some(engine), auth))
            }
            ModeKind::Cbc => {
                let engine = engine.init(params.for_encryption, params.key)?.into_block()?;
                CipherMode::Cbc(CbcMode::new(
                    engine,
                    auth,
                    params.fixed_iv,
                    params.encrypt_then_mac,
                )?)
            }
            ModeKind::Gcm => {
                let engine = engine.init(true, params.key)?.into_block()?;
                CipherMode::Aead(AeadMode::gcm(engine, auth, params.fixed_iv)?)
            }
            ModeKind::Ccm | ModeKind::Ccm8 => {
                let engine = engine.init(true, params.key)?.into_block()?;
                CipherMode::Aead(AeadMode::ccm(engine, auth, params.fixed_iv, self.tag_length())?)
            }
            ModeKind::ChaCha20Poly1305 => {
                super::engine::check_key_length(engine.key_length(), params.key)?;
                CipherMode::Aead(AeadMode::chacha20_poly1305(
                    params.key,
                    auth,
                    params.fixed_iv,
                )?)
            }
            ModeKind::CtrOmac => return Err(Error::NotImplemented("GOST CTR-OMAC cipher mode")),
        };

        Ok(mode)
    }
}

/// Keys and flags needed to instantiate a mode.
pub struct ModeParams<'a> {
    pub version: ProtocolVersion,
    pub for_encryption: bool,
    pub key: &'a [u8],
    pub fixed_iv: &'a [u8],
    /// MAC hash and key for non-AEAD modes.
    pub mac: Option<(HashAlgorithm, &'a [u8])>,
    pub encrypt_then_mac: bool,
}

/// What the record header says about an incoming record.
#[derive(Debug, Clone, Copy)]
pub struct RecordMetadata {
    pub content_type: ContentType,
    /// Epoch and sequence from a DTLS record header.
    pub explicit_sequence: Option<[u8; 8]>,
}

/// A keyed mode for one direction of a connection.
#[derive(Debug)]
pub enum CipherMode {
    Stream(StreamMode),
    Cbc(CbcMode),
    Aead(AeadMode),
}

impl CipherMode {
    /// Protect one record payload, returning the record fragment.
    ///
    /// For TLS 1.3 the real content type is sealed inside the record and the
    /// outer type is always application data.
    pub fn encrypt(&mut self, content_type: ContentType, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        match self {
            CipherMode::Stream(m) => m.encrypt(content_type, plaintext),
            CipherMode::Cbc(m) => m.encrypt(content_type, plaintext),
            CipherMode::Aead(m) => m.encrypt(content_type, plaintext),
        }
    }

    /// Remove protection from a record fragment.
    ///
    /// Returns the inner content type and plaintext. Authentication failures
    /// are reported as a fatal `bad_record_mac` alert.
    pub fn decrypt(
        &mut self,
        metadata: &RecordMetadata,
        fragment: &[u8],
    ) -> Result<(ContentType, Vec<u8>), Error> {
        match self {
            CipherMode::Stream(m) => m.decrypt(metadata, fragment),
            CipherMode::Cbc(m) => m.decrypt(metadata, fragment),
            CipherMode::Aead(m) => m.decrypt(metadata, fragment),
        }
    }

    pub fn authenticator(&self) -> &Authenticator {
        match self {
            CipherMode::Stream(m) => m.authenticator(),
            CipherMode::Cbc(m) => m.authenticator(),
            CipherMode::Aead(m) => m.authenticator(),
        }
    }

    pub fn authenticator_mut(&mut self) -> &mut Authenticator {
        match self {
            CipherMode::Stream(m) => m.authenticator_mut(),
            CipherMode::Cbc(m) => m.authenticator_mut(),
            CipherMode::Aead(m) => m.authenticator_mut(),
        }
    }

    /// Largest expansion a record can see from protection.
    pub fn max_overhead(&self) -> usize {
        match self {
            CipherMode::Stream(m) => m.authenticator().mac_length(),
            CipherMode::Cbc(m) => m.max_overhead(),
            CipherMode::Aead(m) => m.overhead() + 1,
        }
    }
}

fn bad_record_mac() -> Error {
    Error::fatal(crate::alert::AlertDescription::BadRecordMac)
}

/// Split a TLS 1.3 inner plaintext into content and type, dropping padding.
fn strip_inner_plaintext(mut inner: Vec<u8>) -> Result<(ContentType, Vec<u8>), Error> {
    while let Some(&last) = inner.last() {
        inner.pop();
        if last != 0 {
            return Ok((ContentType::from_u8(last), inner));
        }
    }
    Err(Error::fatal(crate::alert::AlertDescription::UnexpectedMessage))
}

fn zeroizing(data: &[u8]) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(data.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_plaintext_padding_stripped() {
        let (ct, data) = strip_inner_plaintext(vec![1, 2, 22, 0, 0, 0]).unwrap();
        assert_eq!(ct, ContentType::Handshake);
        assert_eq!(data, vec![1, 2]);

        assert!(strip_inner_plaintext(vec![0, 0, 0]).is_err());
    }

    #[test]
    fn fixed_iv_lengths() {
        use ProtocolVersion::*;
        assert_eq!(ModeKind::Gcm.fixed_iv_length(EngineKind::Aes128, Tls1_2), 4);
        assert_eq!(ModeKind::Gcm.fixed_iv_length(EngineKind::Aes128, Tls1_3), 12);
        assert_eq!(ModeKind::Cbc.fixed_iv_length(EngineKind::Aes128, Tls1_0), 16);
        assert_eq!(ModeKind::Cbc.fixed_iv_length(EngineKind::TripleDes, Ssl3_0), 8);
        assert_eq!(ModeKind::Cbc.fixed_iv_length(EngineKind::Aes128, Tls1_2), 0);
        assert_eq!(ModeKind::Cbc.record_iv_length(EngineKind::Aes128, Dtls1_2), 16);
    }

    #[test]
    fn ctr_omac_not_implemented() {
        let params = ModeParams {
            version: ProtocolVersion::Tls1_2,
            for_encryption: true,
            key: &[0; 32],
            fixed_iv: &[],
            mac: None,
            encrypt_then_mac: false,
        };
        let err = ModeKind::CtrOmac.init(EngineKind::Magma, params).unwrap_err();
        assert!(matches!(err, Error::NotImplemented(_)));
    }
}
