use rand::RngCore;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::{bad_record_mac, zeroizing, RecordMetadata};
use crate::auth::Authenticator;
use crate::crypto::engine::BlockEngine;
use crate::crypto::hash::HashAlgorithm;
use crate::types::{ContentType, ProtocolVersion};
use crate::Error;

/// CBC with a record MAC, MAC-then-encrypt or encrypt-then-MAC (RFC 7366).
///
/// SSL 3.0 and TLS 1.0 chain the IV across records. Later versions send a
/// fresh random IV in front of every record.
#[derive(Debug)]
pub struct CbcMode {
    engine: BlockEngine,
    auth: Authenticator,
    chained_iv: Option<Zeroizing<Vec<u8>>>,
    encrypt_then_mac: bool,
    mac_comparisons: usize,
}

impl CbcMode {
    pub fn new(
        engine: BlockEngine,
        auth: Authenticator,
        fixed_iv: &[u8],
        encrypt_then_mac: bool,
    ) -> Result<Self, Error> {
        if auth.mac().is_none() {
            return Err(Error::internal("CBC mode requires a record MAC"));
        }

        let chained_iv = if auth.version().has_explicit_cbc_iv() {
            None
        } else {
            if fixed_iv.len() != engine.block_length() {
                return Err(Error::internal("CBC chained IV must be one block"));
            }
            Some(zeroizing(fixed_iv))
        };

        Ok(CbcMode {
            engine,
            auth,
            chained_iv,
            encrypt_then_mac,
            mac_comparisons: 0,
        })
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    pub fn authenticator_mut(&mut self) -> &mut Authenticator {
        &mut self.auth
    }

    pub fn is_encrypt_then_mac(&self) -> bool {
        self.encrypt_then_mac
    }

    /// MAC comparisons performed by `decrypt`.
    pub fn mac_comparisons(&self) -> usize {
        self.mac_comparisons
    }

    pub fn max_overhead(&self) -> usize {
        let bs = self.engine.block_length();
        let iv = if self.chained_iv.is_some() { 0 } else { bs };
        iv + self.auth.mac_length() + bs
    }

    fn block_len(&self) -> usize {
        self.engine.block_length()
    }

    fn pad(&self, data: &mut Vec<u8>) {
        let bs = self.block_len();
        let pad_len = bs - 1 - (data.len() % bs);
        data.resize(data.len() + pad_len + 1, pad_len as u8);
    }

    fn cbc_encrypt(&self, iv: &[u8], data: &mut [u8]) {
        let bs = self.block_len();
        let mut prev = iv.to_vec();
        for block in data.chunks_mut(bs) {
            for (b, p) in block.iter_mut().zip(prev.iter()) {
                *b ^= p;
            }
            self.engine.cipher_in_place(block);
            prev.copy_from_slice(block);
        }
    }

    fn cbc_decrypt(&self, iv: &[u8], data: &mut [u8]) {
        let bs = self.block_len();
        let mut prev = iv.to_vec();
        let mut saved = vec![0u8; bs];
        for block in data.chunks_mut(bs) {
            saved.copy_from_slice(block);
            self.engine.cipher_in_place(block);
            for (b, p) in block.iter_mut().zip(prev.iter()) {
                *b ^= p;
            }
            std::mem::swap(&mut prev, &mut saved);
        }
    }

    /// Take the IV for the next record, explicit or chained.
    fn next_iv(&self) -> (Vec<u8>, bool) {
        match &self.chained_iv {
            Some(iv) => (iv.to_vec(), false),
            None => {
                let mut iv = vec![0u8; self.block_len()];
                rand::thread_rng().fill_bytes(&mut iv);
                (iv, true)
            }
        }
    }

    fn chain(&mut self, ciphertext: &[u8]) {
        let bs = self.block_len();
        if let Some(iv) = &mut self.chained_iv {
            if ciphertext.len() >= bs {
                iv.copy_from_slice(&ciphertext[ciphertext.len() - bs..]);
            }
        }
    }

    pub fn encrypt(&mut self, content_type: ContentType, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        let (iv, explicit) = self.next_iv();

        let mut out = Vec::with_capacity(plaintext.len() + self.max_overhead());
        if explicit {
            out.extend_from_slice(&iv);
        }

        if self.encrypt_then_mac {
            let mut data = plaintext.to_vec();
            self.pad(&mut data);
            self.cbc_encrypt(&iv, &mut data);
            self.chain(&data);
            out.extend_from_slice(&data);

            let ad = self
                .auth
                .create_authentication_block(content_type, out.len(), None)?;
            let mac = self.auth.compute_mac(&ad, &out)?;
            out.extend_from_slice(&mac);
        } else {
            let ad = self
                .auth
                .create_authentication_block(content_type, plaintext.len(), None)?;
            let mac = self.auth.compute_mac(&ad, plaintext)?;

            let mut data = Vec::with_capacity(plaintext.len() + mac.len() + self.block_len());
            data.extend_from_slice(plaintext);
            data.extend_from_slice(&mac);
            self.pad(&mut data);
            self.cbc_encrypt(&iv, &mut data);
            self.chain(&data);
            out.extend_from_slice(&data);
        }

        Ok(out)
    }

    pub fn decrypt(
        &mut self,
        metadata: &RecordMetadata,
        fragment: &[u8],
    ) -> Result<(ContentType, Vec<u8>), Error> {
        if self.encrypt_then_mac {
            self.decrypt_etm(metadata, fragment)
        } else {
            self.decrypt_mte(metadata, fragment)
        }
    }

    fn split_iv<'a>(&self, body: &'a [u8]) -> Result<(Vec<u8>, &'a [u8]), Error> {
        let bs = self.block_len();
        let (iv, ct) = match &self.chained_iv {
            Some(iv) => (iv.to_vec(), body),
            None => {
                if body.len() < bs {
                    return Err(bad_record_mac());
                }
                (body[..bs].to_vec(), &body[bs..])
            }
        };
        if ct.is_empty() || ct.len() % bs != 0 {
            return Err(bad_record_mac());
        }
        Ok((iv, ct))
    }

    fn decrypt_etm(
        &mut self,
        metadata: &RecordMetadata,
        fragment: &[u8],
    ) -> Result<(ContentType, Vec<u8>), Error> {
        let mac_len = self.auth.mac_length();
        if fragment.len() < mac_len {
            return Err(bad_record_mac());
        }
        let (body, tag) = fragment.split_at(fragment.len() - mac_len);
        let (iv, ct) = self.split_iv(body)?;

        let ad = self.auth.create_authentication_block(
            metadata.content_type,
            body.len(),
            metadata.explicit_sequence.as_ref(),
        )?;
        let expected = self.auth.compute_mac(&ad, body)?;
        self.mac_comparisons += 1;
        if !bool::from(expected.ct_eq(tag)) {
            warn!("Bad encrypt-then-mac record MAC");
            return Err(bad_record_mac());
        }

        let mut data = ct.to_vec();
        self.cbc_decrypt(&iv, &mut data);
        self.chain(ct);

        let (good, strip) = self.check_padding(&data, 0);
        if !good {
            return Err(bad_record_mac());
        }
        data.truncate(data.len() - strip);

        Ok((metadata.content_type, data))
    }

    fn decrypt_mte(
        &mut self,
        metadata: &RecordMetadata,
        fragment: &[u8],
    ) -> Result<(ContentType, Vec<u8>), Error> {
        let mac_len = self.auth.mac_length();
        let (iv, ct) = self.split_iv(fragment)?;
        if ct.len() < mac_len + 1 {
            return Err(bad_record_mac());
        }

        let mut data = ct.to_vec();
        self.cbc_decrypt(&iv, &mut data);
        self.chain(ct);

        // From here on the work done must not depend on the padding.
        let len = data.len();
        let (good, strip) = self.check_padding(&data, mac_len);
        let content_len = len - mac_len - strip;

        let ad = self.auth.create_authentication_block(
            metadata.content_type,
            content_len,
            metadata.explicit_sequence.as_ref(),
        )?;
        let expected = self.auth.compute_mac(&ad, &data[..content_len])?;
        self.mac_comparisons += 1;
        let mac_ok = bool::from(expected.ct_eq(&data[content_len..content_len + mac_len]));

        let hash = self.mac_hash()?;
        let remaining = remaining_mac_len(hash, len - mac_len, content_len);
        self.auth.simulate_mac(remaining)?;

        if !(good & mac_ok) {
            warn!("Bad record MAC or padding on {} record", metadata.content_type);
            return Err(bad_record_mac());
        }

        data.truncate(content_len);
        Ok((metadata.content_type, data))
    }

    fn mac_hash(&self) -> Result<HashAlgorithm, Error> {
        self.auth
            .mac()
            .map(|m| m.hash())
            .ok_or_else(|| Error::internal("CBC mode lost its MAC"))
    }

    /// Validate padding without branching on its contents.
    ///
    /// Returns whether it is well formed and how many trailing bytes to strip
    /// (0 when it is not).
    fn check_padding(&self, data: &[u8], mac_len: usize) -> (bool, usize) {
        let len = data.len();
        let pad_len = data[len - 1] as usize;
        let mut good = pad_len + 1 + mac_len <= len;

        if self.auth.version() == ProtocolVersion::Ssl3_0 {
            good &= pad_len < self.block_len();
        } else {
            for i in 0..len.min(256) {
                let b = data[len - 1 - i] as usize;
                let in_pad = i <= pad_len;
                good &= !in_pad | (b == pad_len);
            }
        }

        let strip = if good { pad_len + 1 } else { 0 };
        (good, strip)
    }
}

/// Extra MAC input needed so a short record costs as many hash compressions as
/// the longest content the record could have held.
fn remaining_mac_len(hash: HashAlgorithm, full_len: usize, used_len: usize) -> usize {
    let block = hash.block_len() as i64;
    let shift = 13 - (block - hash.minimal_padding_len() as i64);
    let full = full_len as i64 + shift;
    let used = used_len as i64 + shift;
    let blocks = ceil_div(full, block) - ceil_div(used, block);
    (1 + blocks * block) as usize
}

fn ceil_div(a: i64, b: i64) -> i64 {
    (a + b - 1).div_euclid(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertDescription;
    use crate::crypto::engine::EngineKind;
    use crate::crypto::mode::{CipherMode, ModeKind, ModeParams};

    fn cbc(
        version: ProtocolVersion,
        engine: EngineKind,
        hash: HashAlgorithm,
        enc: bool,
        etm: bool,
    ) -> CipherMode {
        let key = vec![0x21; engine.key_length()];
        let mac_key = vec![0x42; hash.output_len()];
        let iv = vec![0x07; ModeKind::Cbc.fixed_iv_length(engine, version)];
        ModeKind::Cbc
            .init(
                engine,
                ModeParams {
                    version,
                    for_encryption: enc,
                    key: &key,
                    fixed_iv: &iv,
                    mac: Some((hash, &mac_key)),
                    encrypt_then_mac: etm,
                },
            )
            .unwrap()
    }

    fn meta() -> RecordMetadata {
        RecordMetadata {
            content_type: ContentType::ApplicationData,
            explicit_sequence: None,
        }
    }

    fn roundtrip(version: ProtocolVersion, engine: EngineKind, hash: HashAlgorithm, etm: bool) {
        let mut tx = cbc(version, engine, hash, true, etm);
        let mut rx = cbc(version, engine, hash, false, etm);

        for len in [0usize, 1, 15, 16, 17, 100, 1000] {
            let msg: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let ct = tx.encrypt(ContentType::ApplicationData, &msg).unwrap();
            let (_, pt) = rx.decrypt(&meta(), &ct).unwrap();
            assert_eq!(pt, msg, "{:?} {:?} len {}", version, engine, len);
        }
    }

    #[test]
    fn tls12_aes_cbc_mac_then_encrypt() {
        roundtrip(ProtocolVersion::Tls1_2, EngineKind::Aes128, HashAlgorithm::Sha1, false);
        roundtrip(ProtocolVersion::Tls1_2, EngineKind::Aes256, HashAlgorithm::Sha384, false);
    }

    #[test]
    fn tls12_aes_cbc_encrypt_then_mac() {
        roundtrip(ProtocolVersion::Tls1_2, EngineKind::Aes128, HashAlgorithm::Sha256, true);
    }

    #[test]
    fn tls10_chained_iv() {
        roundtrip(ProtocolVersion::Tls1_0, EngineKind::Aes128, HashAlgorithm::Sha1, false);
    }

    #[test]
    fn ssl3_triple_des() {
        roundtrip(ProtocolVersion::Ssl3_0, EngineKind::TripleDes, HashAlgorithm::Sha1, false);
    }

    #[test]
    fn tampered_record_rejected() {
        for etm in [false, true] {
            let mut tx = cbc(ProtocolVersion::Tls1_2, EngineKind::Aes128, HashAlgorithm::Sha1, true, etm);
            let mut rx = cbc(ProtocolVersion::Tls1_2, EngineKind::Aes128, HashAlgorithm::Sha1, false, etm);
            let mut ct = tx.encrypt(ContentType::ApplicationData, b"attack at dawn").unwrap();
            let n = ct.len();
            ct[n - 3] ^= 0x80;
            let err = rx.decrypt(&meta(), &ct).unwrap_err();
            assert_eq!(err.alert().description, AlertDescription::BadRecordMac);
        }
    }

    #[test]
    fn misaligned_record_rejected() {
        let mut rx = cbc(ProtocolVersion::Tls1_2, EngineKind::Aes128, HashAlgorithm::Sha1, false, false);
        let err = rx.decrypt(&meta(), &[0u8; 40]).unwrap_err();
        assert_eq!(err.alert().description, AlertDescription::BadRecordMac);
    }

    #[test]
    fn bad_padding_costs_the_same_mac_work() {
        let version = ProtocolVersion::Tls1_2;
        let mut tx = cbc(version, EngineKind::Aes128, HashAlgorithm::Sha1, true, false);
        // 32 bytes content + 20 bytes MAC leaves 11 bytes of padding.
        let good = tx.encrypt(ContentType::ApplicationData, &[0x55; 32]).unwrap();

        // Flip the low bit of the padding length byte through the previous block.
        let mut bad = good.clone();
        let n = bad.len();
        bad[n - 17] ^= 0x01;

        let mut rx_good = cbc(version, EngineKind::Aes128, HashAlgorithm::Sha1, false, false);
        let mut rx_bad = cbc(version, EngineKind::Aes128, HashAlgorithm::Sha1, false, false);

        assert!(rx_good.decrypt(&meta(), &good).is_ok());
        let err = rx_bad.decrypt(&meta(), &bad).unwrap_err();
        assert_eq!(err.alert().description, AlertDescription::BadRecordMac);

        let (CipherMode::Cbc(g), CipherMode::Cbc(b)) = (&rx_good, &rx_bad) else {
            panic!("expected CBC modes");
        };
        assert_eq!(g.mac_comparisons(), 1);
        assert_eq!(g.mac_comparisons(), b.mac_comparisons());
        assert_eq!(
            g.authenticator().mac_computations(),
            b.authenticator().mac_computations()
        );
    }

    #[test]
    fn remaining_len_grows_with_stripped_bytes() {
        let none = remaining_mac_len(HashAlgorithm::Sha1, 100, 100);
        assert_eq!(none, 1);
        let many = remaining_mac_len(HashAlgorithm::Sha1, 300, 44);
        assert!(many > 1);
        assert_eq!((many - 1) % 64, 0);
    }
}
