use std::fmt;

use zeroize::Zeroizing;

use super::ccm::Ccm;
use super::chacha20_poly1305::ChaCha20Poly1305;
use super::gcm::Gcm;
use super::{bad_record_mac, strip_inner_plaintext, zeroizing, RecordMetadata, EXPLICIT_NONCE_LEN};
use crate::auth::Authenticator;
use crate::buffer::Buf;
use crate::crypto::engine::BlockEngine;
use crate::types::ContentType;
use crate::Error;

/// 96-bit AEAD nonce.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Nonce([u8; 12]);

impl Nonce {
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Nonce(bytes)
    }

    /// `fixed_iv(4) || explicit(8)` as in RFC 5288.
    pub fn explicit(fixed_iv: &[u8], explicit: &[u8]) -> Self {
        let mut n = [0u8; 12];
        n[..4].copy_from_slice(&fixed_iv[..4]);
        n[4..].copy_from_slice(&explicit[..8]);
        Nonce(n)
    }

    /// The IV XOR the left-padded sequence number, as in RFC 8446 section 5.3.
    pub fn xor(iv: &[u8], sequence: &[u8; 8]) -> Self {
        let mut n = [0u8; 12];
        n.copy_from_slice(&iv[..12]);
        for (b, s) in n[4..].iter_mut().zip(sequence.iter()) {
            *b ^= s;
        }
        Nonce(n)
    }

    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Nonce").finish()
    }
}

/// How the per-record nonce is formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NonceStyle {
    /// TLS 1.2 GCM/CCM, explicit part carried in the record.
    Explicit,
    /// TLS 1.3 and ChaCha20-Poly1305, nothing carried in the record.
    Xor,
}

enum AeadEngine {
    Gcm(Gcm),
    Ccm(Ccm),
    ChaCha20Poly1305(ChaCha20Poly1305),
}

impl AeadEngine {
    fn seal(&self, nonce: &Nonce, aad: &[u8], data: &mut Buf) -> Result<(), Error> {
        match self {
            AeadEngine::Gcm(e) => e.seal(nonce, aad, data),
            AeadEngine::Ccm(e) => e.seal(nonce, aad, data),
            AeadEngine::ChaCha20Poly1305(e) => e.seal(nonce, aad, data),
        }
    }

    fn open(&self, nonce: &Nonce, aad: &[u8], data: &mut Buf) -> Result<(), Error> {
        match self {
            AeadEngine::Gcm(e) => e.open(nonce, aad, data),
            AeadEngine::Ccm(e) => e.open(nonce, aad, data),
            AeadEngine::ChaCha20Poly1305(e) => e.open(nonce, aad, data),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            AeadEngine::Gcm(_) => "GCM",
            AeadEngine::Ccm(_) => "CCM",
            AeadEngine::ChaCha20Poly1305(_) => "ChaCha20-Poly1305",
        }
    }
}

/// AEAD record protection for GCM, CCM and ChaCha20-Poly1305.
pub struct AeadMode {
    engine: AeadEngine,
    auth: Authenticator,
    iv: Zeroizing<Vec<u8>>,
    style: NonceStyle,
    tag_len: usize,
}

impl AeadMode {
    pub fn gcm(engine: BlockEngine, auth: Authenticator, fixed_iv: &[u8]) -> Result<Self, Error> {
        let engine = AeadEngine::Gcm(Gcm::new(engine.into_aes_gcm()?));
        Self::new(engine, auth, fixed_iv, 16)
    }

    pub fn ccm(
        engine: BlockEngine,
        auth: Authenticator,
        fixed_iv: &[u8],
        tag_len: usize,
    ) -> Result<Self, Error> {
        let engine = AeadEngine::Ccm(Ccm::new(engine, tag_len)?);
        Self::new(engine, auth, fixed_iv, tag_len)
    }

    pub fn chacha20_poly1305(key: &[u8], auth: Authenticator, fixed_iv: &[u8]) -> Result<Self, Error> {
        let engine = AeadEngine::ChaCha20Poly1305(ChaCha20Poly1305::new(key)?);
        Self::new(engine, auth, fixed_iv, 16)
    }

    fn new(engine: AeadEngine, auth: Authenticator, fixed_iv: &[u8], tag_len: usize) -> Result<Self, Error> {
        let style = match fixed_iv.len() {
            12 => NonceStyle::Xor,
            4 if !auth.version().is_tls13() => NonceStyle::Explicit,
            n => {
                return Err(Error::internal(format!(
                    "{} with a {} byte IV is not usable for {}",
                    engine.name(),
                    n,
                    auth.version()
                )))
            }
        };

        Ok(AeadMode {
            engine,
            auth,
            iv: zeroizing(fixed_iv),
            style,
            tag_len,
        })
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    pub fn authenticator_mut(&mut self) -> &mut Authenticator {
        &mut self.auth
    }

    pub fn tag_length(&self) -> usize {
        self.tag_len
    }

    /// Bytes added to every record: explicit nonce and tag.
    pub fn overhead(&self) -> usize {
        self.explicit_len() + self.tag_len
    }

    fn explicit_len(&self) -> usize {
        match self.style {
            NonceStyle::Explicit => EXPLICIT_NONCE_LEN,
            NonceStyle::Xor => 0,
        }
    }

    fn sealed_type(&self) -> bool {
        self.auth.version().is_tls13()
    }

    pub fn encrypt(&mut self, content_type: ContentType, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        let seq = self.auth.sequence_number();
        let nonce = match self.style {
            NonceStyle::Explicit => Nonce::explicit(&self.iv, &seq),
            NonceStyle::Xor => Nonce::xor(&self.iv, &seq),
        };

        let mut data = Buf::with_capacity(plaintext.len() + 1 + self.tag_len);
        data.extend_from_slice(plaintext);

        let ad = if self.sealed_type() {
            data.push(content_type.as_u8());
            self.auth.create_authentication_block(
                ContentType::ApplicationData,
                data.len() + self.tag_len,
                None,
            )?
        } else {
            self.auth
                .create_authentication_block(content_type, plaintext.len(), None)?
        };

        self.engine.seal(&nonce, &ad, &mut data)?;

        let mut out = Vec::with_capacity(self.explicit_len() + data.len());
        if self.style == NonceStyle::Explicit {
            out.extend_from_slice(&seq);
        }
        out.extend_from_slice(&data);
        Ok(out)
    }

    pub fn decrypt(
        &mut self,
        metadata: &RecordMetadata,
        fragment: &[u8],
    ) -> Result<(ContentType, Vec<u8>), Error> {
        let explicit_len = self.explicit_len();
        if fragment.len() < explicit_len + self.tag_len {
            return Err(bad_record_mac());
        }

        let (explicit, body) = fragment.split_at(explicit_len);
        let nonce = match self.style {
            NonceStyle::Explicit => Nonce::explicit(&self.iv, explicit),
            NonceStyle::Xor => {
                let seq = metadata
                    .explicit_sequence
                    .unwrap_or_else(|| self.auth.sequence_number());
                Nonce::xor(&self.iv, &seq)
            }
        };

        let ad_len = if self.sealed_type() {
            body.len()
        } else {
            body.len() - self.tag_len
        };
        let ad = self.auth.create_authentication_block(
            metadata.content_type,
            ad_len,
            metadata.explicit_sequence.as_ref(),
        )?;

        let mut data = Buf::from_slice(body);
        if self.engine.open(&nonce, &ad, &mut data).is_err() {
            warn!("{} record failed authentication", self.engine.name());
            return Err(bad_record_mac());
        }

        if self.sealed_type() {
            strip_inner_plaintext(data.into_vec())
        } else {
            Ok((metadata.content_type, data.into_vec()))
        }
    }
}

impl fmt::Debug for AeadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AeadMode")
            .field("engine", &self.engine.name())
            .field("style", &self.style)
            .field("tag_len", &self.tag_len)
            .field("auth", &self.auth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertDescription;
    use crate::crypto::engine::EngineKind;
    use crate::crypto::mode::{CipherMode, ModeKind, ModeParams};
    use crate::types::ProtocolVersion;

    fn mode(kind: ModeKind, engine: EngineKind, version: ProtocolVersion, enc: bool) -> CipherMode {
        let key = vec![0x5A; engine.key_length()];
        let iv = vec![0x3C; kind.fixed_iv_length(engine, version)];
        kind.init(
            engine,
            ModeParams {
                version,
                for_encryption: enc,
                key: &key,
                fixed_iv: &iv,
                mac: None,
                encrypt_then_mac: false,
            },
        )
        .unwrap()
    }

    fn meta(ct: ContentType) -> RecordMetadata {
        RecordMetadata {
            content_type: ct,
            explicit_sequence: None,
        }
    }

    const CASES: &[(ModeKind, EngineKind)] = &[
        (ModeKind::Gcm, EngineKind::Aes128),
        (ModeKind::Gcm, EngineKind::Aes256),
        (ModeKind::Ccm, EngineKind::Aes128),
        (ModeKind::Ccm8, EngineKind::Aes128),
        (ModeKind::ChaCha20Poly1305, EngineKind::ChaCha20),
    ];

    #[test]
    fn tls12_roundtrip_and_explicit_nonce() {
        for &(kind, engine) in CASES {
            let mut tx = mode(kind, engine, ProtocolVersion::Tls1_2, true);
            let mut rx = mode(kind, engine, ProtocolVersion::Tls1_2, false);

            for i in 0..3u8 {
                let msg = vec![i; 40];
                let ct = tx.encrypt(ContentType::ApplicationData, &msg).unwrap();
                let expected_len = 40 + kind.record_iv_length(engine, ProtocolVersion::Tls1_2) + kind.tag_length();
                assert_eq!(ct.len(), expected_len, "{:?}", kind);
                if kind != ModeKind::ChaCha20Poly1305 {
                    assert_eq!(&ct[..8], &[0, 0, 0, 0, 0, 0, 0, i]);
                }

                let (t, pt) = rx.decrypt(&meta(ContentType::ApplicationData), &ct).unwrap();
                assert_eq!(t, ContentType::ApplicationData);
                assert_eq!(pt, msg);
            }
        }
    }

    #[test]
    fn tls13_hides_content_type() {
        for &(kind, engine) in CASES {
            let mut tx = mode(kind, engine, ProtocolVersion::Tls1_3, true);
            let mut rx = mode(kind, engine, ProtocolVersion::Tls1_3, false);

            let ct = tx.encrypt(ContentType::Handshake, b"finished").unwrap();
            assert_eq!(ct.len(), 8 + 1 + kind.tag_length());

            let (t, pt) = rx.decrypt(&meta(ContentType::ApplicationData), &ct).unwrap();
            assert_eq!(t, ContentType::Handshake);
            assert_eq!(pt, b"finished");
        }
    }

    #[test]
    fn bit_flip_is_bad_record_mac() {
        for version in [ProtocolVersion::Tls1_2, ProtocolVersion::Tls1_3, ProtocolVersion::Dtls1_2] {
            for &(kind, engine) in CASES {
                let mut tx = mode(kind, engine, version, true);
                let mut rx = mode(kind, engine, version, false);

                let mut ct = tx.encrypt(ContentType::ApplicationData, b"secret data").unwrap();
                let n = ct.len();
                ct[n / 2] ^= 0x04;

                let mut m = meta(ContentType::ApplicationData);
                if version.is_dtls() {
                    m.explicit_sequence = Some([0; 8]);
                }
                let err = rx.decrypt(&m, &ct).unwrap_err();
                assert_eq!(err.alert().description, AlertDescription::BadRecordMac, "{:?} {:?}", version, kind);
            }
        }
    }

    #[test]
    fn dtls_uses_record_sequence() {
        let (kind, engine) = (ModeKind::ChaCha20Poly1305, EngineKind::ChaCha20);
        let mut tx = mode(kind, engine, ProtocolVersion::Dtls1_2, true);
        let mut rx = mode(kind, engine, ProtocolVersion::Dtls1_2, false);

        let first = tx.encrypt(ContentType::ApplicationData, b"one").unwrap();
        let second = tx.encrypt(ContentType::ApplicationData, b"two").unwrap();

        // Out of order delivery works with the sequence from the header.
        let mut m = meta(ContentType::ApplicationData);
        m.explicit_sequence = Some([0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(rx.decrypt(&m, &second).unwrap().1, b"two");
        m.explicit_sequence = Some([0; 8]);
        assert_eq!(rx.decrypt(&m, &first).unwrap().1, b"one");
    }

    #[test]
    fn short_fragment_rejected() {
        let mut rx = mode(ModeKind::Gcm, EngineKind::Aes128, ProtocolVersion::Tls1_2, false);
        let err = rx.decrypt(&meta(ContentType::ApplicationData), &[0; 10]).unwrap_err();
        assert_eq!(err.alert().description, AlertDescription::BadRecordMac);
    }

    #[test]
    fn nonce_xor() {
        let n = Nonce::xor(&[0xFF; 12], &[0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(n.as_bytes()[..4], [0xFF; 4]);
        assert_eq!(n.as_bytes()[11], 0xFE);
    }
}
