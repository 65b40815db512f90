//! AES-CCM (RFC 3610) with a 12 byte nonce, as used by RFC 6655 and RFC 8446.

use subtle::ConstantTimeEq;

use super::aead::Nonce;
use crate::buffer::Buf;
use crate::crypto::engine::BlockEngine;
use crate::Error;

const BLOCK: usize = 16;
// 15 - nonce length
const L: usize = 3;

pub(super) struct Ccm {
    engine: BlockEngine,
    tag_len: usize,
}

impl Ccm {
    pub fn new(engine: BlockEngine, tag_len: usize) -> Result<Self, Error> {
        if engine.block_length() != BLOCK {
            return Err(Error::internal(format!("CCM requires a 128-bit cipher, got {:?}", engine.kind())));
        }
        if !matches!(tag_len, 8 | 16) {
            return Err(Error::internal(format!("Unsupported CCM tag length {}", tag_len)));
        }
        Ok(Ccm { engine, tag_len })
    }

    pub fn seal(&self, nonce: &Nonce, aad: &[u8], data: &mut Buf) -> Result<(), Error> {
        let mut tag = self.cbc_mac(nonce, aad, data)?;
        self.ctr(nonce, data);

        let s0 = self.counter_block(nonce, 0);
        for (t, s) in tag.iter_mut().zip(s0.iter()) {
            *t ^= s;
        }
        data.extend_from_slice(&tag[..self.tag_len]);
        Ok(())
    }

    pub fn open(&self, nonce: &Nonce, aad: &[u8], data: &mut Buf) -> Result<(), Error> {
        if data.len() < self.tag_len {
            return Err(super::bad_record_mac());
        }
        let split = data.len() - self.tag_len;
        let mut received = [0u8; BLOCK];
        received[..self.tag_len].copy_from_slice(&data[split..]);
        data.truncate(split);

        self.ctr(nonce, data);
        let mut tag = self.cbc_mac(nonce, aad, data)?;
        let s0 = self.counter_block(nonce, 0);
        for (t, s) in tag.iter_mut().zip(s0.iter()) {
            *t ^= s;
        }

        if !bool::from(tag[..self.tag_len].ct_eq(&received[..self.tag_len])) {
            data.wipe();
            return Err(super::bad_record_mac());
        }
        Ok(())
    }

    fn cbc_mac(&self, nonce: &Nonce, aad: &[u8], data: &[u8]) -> Result<[u8; BLOCK], Error> {
        if data.len() >= 1 << (8 * L) {
            return Err(Error::internal("CCM message too long"));
        }
        if aad.len() >= 0xFF00 {
            return Err(Error::internal("CCM associated data too long"));
        }

        let mut x = [0u8; BLOCK];
        let adata = if aad.is_empty() { 0 } else { 0x40 };
        x[0] = adata | ((((self.tag_len - 2) / 2) as u8) << 3) | (L as u8 - 1);
        x[1..13].copy_from_slice(nonce.as_bytes());
        x[13..].copy_from_slice(&(data.len() as u32).to_be_bytes()[1..]);
        self.engine.encrypt_block(&mut x);

        if !aad.is_empty() {
            let mut encoded = Vec::with_capacity(aad.len() + 2);
            encoded.extend_from_slice(&(aad.len() as u16).to_be_bytes());
            encoded.extend_from_slice(aad);
            self.absorb(&mut x, &encoded);
        }
        self.absorb(&mut x, data);

        Ok(x)
    }

    /// CBC-MAC `input`, zero padded to a whole number of blocks.
    fn absorb(&self, x: &mut [u8; BLOCK], input: &[u8]) {
        for chunk in input.chunks(BLOCK) {
            for (a, b) in x.iter_mut().zip(chunk.iter()) {
                *a ^= b;
            }
            self.engine.encrypt_block(x);
        }
    }

    fn counter_block(&self, nonce: &Nonce, counter: u32) -> [u8; BLOCK] {
        let mut a = [0u8; BLOCK];
        a[0] = L as u8 - 1;
        a[1..13].copy_from_slice(nonce.as_bytes());
        a[13..].copy_from_slice(&counter.to_be_bytes()[1..]);
        self.engine.encrypt_block(&mut a);
        a
    }

    /// Counter mode starting at block 1.
    fn ctr(&self, nonce: &Nonce, data: &mut [u8]) {
        for (i, chunk) in data.chunks_mut(BLOCK).enumerate() {
            let s = self.counter_block(nonce, i as u32 + 1);
            for (d, k) in chunk.iter_mut().zip(s.iter()) {
                *d ^= k;
            }
        }
    }
}
