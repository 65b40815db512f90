//! ChaCha20-Poly1305 AEAD (RFC 8439 section 2.8).

use poly1305::universal_hash::{KeyInit, UniversalHash};
use poly1305::Poly1305;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::aead::Nonce;
use crate::buffer::Buf;
use crate::crypto::engine::ChaCha20;
use crate::Error;

const TAG_LEN: usize = 16;

pub(super) struct ChaCha20Poly1305 {
    key: Zeroizing<Vec<u8>>,
}

impl ChaCha20Poly1305 {
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        crate::crypto::engine::check_key_length(32, key)?;
        Ok(ChaCha20Poly1305 {
            key: Zeroizing::new(key.to_vec()),
        })
    }

    /// Keystream positioned at block 1 and the one-time Poly1305 key from block 0.
    fn start(&self, nonce: &Nonce) -> Result<(ChaCha20, Zeroizing<[u8; 64]>), Error> {
        let mut cipher = ChaCha20::new(&self.key)?;
        cipher.set_nonce(nonce.as_bytes(), 0)?;
        let mut block0 = Zeroizing::new([0u8; 64]);
        cipher.apply_keystream(&mut block0[..])?;
        Ok((cipher, block0))
    }

    pub fn seal(&self, nonce: &Nonce, aad: &[u8], data: &mut Buf) -> Result<(), Error> {
        let (mut cipher, block0) = self.start(nonce)?;
        cipher.apply_keystream(data)?;
        let tag = poly1305_tag(&block0[..32], aad, data);
        data.extend_from_slice(&tag);
        Ok(())
    }

    pub fn open(&self, nonce: &Nonce, aad: &[u8], data: &mut Buf) -> Result<(), Error> {
        if data.len() < TAG_LEN {
            return Err(super::bad_record_mac());
        }
        let split = data.len() - TAG_LEN;
        let (mut cipher, block0) = self.start(nonce)?;

        let expected = poly1305_tag(&block0[..32], aad, &data[..split]);
        if !bool::from(expected.ct_eq(&data[split..])) {
            return Err(super::bad_record_mac());
        }

        data.truncate(split);
        cipher.apply_keystream(data)?;
        Ok(())
    }
}

fn poly1305_tag(key: &[u8], aad: &[u8], ciphertext: &[u8]) -> [u8; TAG_LEN] {
    let mut mac = Poly1305::new(poly1305::Key::from_slice(key));
    mac.update_padded(aad);
    mac.update_padded(ciphertext);

    let mut lengths = poly1305::Block::default();
    lengths[..8].copy_from_slice(&(aad.len() as u64).to_le_bytes());
    lengths[8..].copy_from_slice(&(ciphertext.len() as u64).to_le_bytes());
    mac.update(&[lengths]);

    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&mac.finalize());
    tag
}
