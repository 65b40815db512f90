use subtle::ConstantTimeEq;

use super::{bad_record_mac, RecordMetadata};
use crate::auth::Authenticator;
use crate::crypto::engine::StreamEngine;
use crate::types::ContentType;
use crate::Error;

/// MAC-then-encrypt with a stream engine, or MAC only for the null cipher.
#[derive(Debug)]
pub struct StreamMode {
    engine: Option<StreamEngine>,
    auth: Authenticator,
}

impl StreamMode {
    pub fn new(engine: Option<StreamEngine>, auth: Authenticator) -> Self {
        StreamMode { engine, auth }
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    pub fn authenticator_mut(&mut self) -> &mut Authenticator {
        &mut self.auth
    }

    pub fn encrypt(&mut self, content_type: ContentType, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        let mut out = plaintext.to_vec();

        if self.auth.mac().is_some() {
            let ad = self
                .auth
                .create_authentication_block(content_type, plaintext.len(), None)?;
            let mac = self.auth.compute_mac(&ad, plaintext)?;
            out.extend_from_slice(&mac);
        } else {
            self.auth.increase_sequence_number()?;
        }

        if let Some(engine) = &mut self.engine {
            engine.apply_keystream(&mut out)?;
        }

        Ok(out)
    }

    pub fn decrypt(
        &mut self,
        metadata: &RecordMetadata,
        fragment: &[u8],
    ) -> Result<(ContentType, Vec<u8>), Error> {
        let mut data = fragment.to_vec();
        if let Some(engine) = &mut self.engine {
            engine.apply_keystream(&mut data)?;
        }

        let mac_len = self.auth.mac_length();
        if mac_len == 0 {
            if metadata.explicit_sequence.is_none() {
                self.auth.increase_sequence_number()?;
            }
            return Ok((metadata.content_type, data));
        }

        if data.len() < mac_len {
            return Err(bad_record_mac());
        }

        let content_len = data.len() - mac_len;
        let ad = self.auth.create_authentication_block(
            metadata.content_type,
            content_len,
            metadata.explicit_sequence.as_ref(),
        )?;
        let expected = self.auth.compute_mac(&ad, &data[..content_len])?;

        if !bool::from(expected.ct_eq(&data[content_len..])) {
            warn!("Bad record MAC on {} record", metadata.content_type);
            return Err(bad_record_mac());
        }

        data.truncate(content_len);
        Ok((metadata.content_type, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertDescription;
    use crate::crypto::engine::EngineKind;
    use crate::crypto::mode::{CipherMode, ModeKind, ModeParams};
    use crate::crypto::hash::HashAlgorithm;
    use crate::types::ProtocolVersion;

    fn rc4_pair() -> (CipherMode, CipherMode) {
        let make = |enc| {
            ModeKind::Stream
                .init(
                    EngineKind::Rc4_128,
                    ModeParams {
                        version: ProtocolVersion::Tls1_0,
                        for_encryption: enc,
                        key: &[4; 16],
                        fixed_iv: &[],
                        mac: Some((HashAlgorithm::Sha1, &[5; 20])),
                        encrypt_then_mac: false,
                    },
                )
                .unwrap()
        };
        (make(true), make(false))
    }

    #[test]
    fn rc4_sha_roundtrip() {
        let (mut tx, mut rx) = rc4_pair();
        let meta = RecordMetadata {
            content_type: ContentType::ApplicationData,
            explicit_sequence: None,
        };

        for msg in [&b"first"[..], &b"second record"[..], &[][..]] {
            let ct = tx.encrypt(ContentType::ApplicationData, msg).unwrap();
            assert_eq!(ct.len(), msg.len() + 20);
            let (ty, pt) = rx.decrypt(&meta, &ct).unwrap();
            assert_eq!(ty, ContentType::ApplicationData);
            assert_eq!(pt, msg);
        }
    }

    #[test]
    fn null_sha256_detects_tamper() {
        let make = || {
            ModeKind::Null
                .init(
                    EngineKind::Null,
                    ModeParams {
                        version: ProtocolVersion::Tls1_2,
                        for_encryption: true,
                        key: &[],
                        fixed_iv: &[],
                        mac: Some((HashAlgorithm::Sha256, &[1; 32])),
                        encrypt_then_mac: false,
                    },
                )
                .unwrap()
        };
        let (mut tx, mut rx) = (make(), make());
        let mut ct = tx.encrypt(ContentType::Handshake, b"hello").unwrap();
        assert_eq!(&ct[..5], b"hello");

        ct[1] ^= 0x01;
        let meta = RecordMetadata {
            content_type: ContentType::Handshake,
            explicit_sequence: None,
        };
        let err = rx.decrypt(&meta, &ct).unwrap_err();
        assert_eq!(err.alert().description, AlertDescription::BadRecordMac);
    }
}
