//! ChaCha20 (RFC 8439, and the original 64-bit nonce layout).

use std::fmt;

use zeroize::Zeroize;

use crate::Error;

// "expand 32-byte k"
const SIGMA: [u32; 4] = [0x6170_7865, 0x3320_646e, 0x7962_2d32, 0x6b20_6574];
// "expand 16-byte k"
const TAU: [u32; 4] = [0x6170_7865, 0x3120_646e, 0x7962_2d36, 0x6b20_6574];

const BLOCK_LEN: usize = 64;

/// Nonce/counter split of state words 12..16.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// 32-bit counter in word 12, 96-bit nonce in words 13..16.
    Ietf,
    /// 64-bit counter in words 12..14, 64-bit nonce in words 14..16.
    Original,
}

pub struct ChaCha20 {
    state: [u32; 16],
    layout: Layout,
    keystream: [u8; BLOCK_LEN],
    // Consumed bytes of `keystream`, BLOCK_LEN means a fresh block is needed.
    offset: usize,
    exhausted: bool,
}

impl ChaCha20 {
    /// Key with a 16 or 32 byte key, zero nonce and counter.
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        let mut state = [0u32; 16];

        let (constants, k2) = match key.len() {
            32 => (SIGMA, &key[16..]),
            16 => (TAU, key),
            n => {
                return Err(Error::InvalidKeyLength {
                    expected: 32,
                    actual: n,
                })
            }
        };

        state[..4].copy_from_slice(&constants);
        for i in 0..4 {
            state[4 + i] = le_word(&key[i * 4..]);
            state[8 + i] = le_word(&k2[i * 4..]);
        }

        Ok(ChaCha20 {
            state,
            layout: Layout::Ietf,
            keystream: [0; BLOCK_LEN],
            offset: BLOCK_LEN,
            exhausted: false,
        })
    }

    /// Set the nonce and initial block counter.
    ///
    /// A 12 byte nonce selects the 32-bit counter layout, an 8 byte nonce the
    /// 64-bit counter layout.
    pub fn set_nonce(&mut self, nonce: &[u8], counter: u64) -> Result<(), Error> {
        match nonce.len() {
            12 => {
                let counter = u32::try_from(counter)
                    .map_err(|_| Error::internal("ChaCha20 counter exceeds 32 bits"))?;
                self.layout = Layout::Ietf;
                self.state[12] = counter;
                self.state[13] = le_word(&nonce[0..]);
                self.state[14] = le_word(&nonce[4..]);
                self.state[15] = le_word(&nonce[8..]);
            }
            8 => {
                self.layout = Layout::Original;
                self.state[12] = counter as u32;
                self.state[13] = (counter >> 32) as u32;
                self.state[14] = le_word(&nonce[0..]);
                self.state[15] = le_word(&nonce[4..]);
            }
            n => return Err(Error::internal(format!("Invalid ChaCha20 nonce length {}", n))),
        }
        self.offset = BLOCK_LEN;
        self.exhausted = false;
        Ok(())
    }

    /// Counter of the next block to be generated.
    pub fn counter(&self) -> u64 {
        match self.layout {
            Layout::Ietf => self.state[12] as u64,
            Layout::Original => ((self.state[13] as u64) << 32) | self.state[12] as u64,
        }
    }

    /// XOR the keystream into `data`.
    pub fn apply_keystream(&mut self, data: &mut [u8]) -> Result<(), Error> {
        for byte in data.iter_mut() {
            if self.offset == BLOCK_LEN {
                self.next_block()?;
            }
            *byte ^= self.keystream[self.offset];
            self.offset += 1;
        }
        Ok(())
    }

    fn next_block(&mut self) -> Result<(), Error> {
        if self.exhausted {
            return Err(Error::internal("ChaCha20 block counter exhausted"));
        }

        let mut x = self.state;
        for _ in 0..10 {
            // Columns
            quarter_round(&mut x, 0, 4, 8, 12);
            quarter_round(&mut x, 1, 5, 9, 13);
            quarter_round(&mut x, 2, 6, 10, 14);
            quarter_round(&mut x, 3, 7, 11, 15);
            // Diagonals
            quarter_round(&mut x, 0, 5, 10, 15);
            quarter_round(&mut x, 1, 6, 11, 12);
            quarter_round(&mut x, 2, 7, 8, 13);
            quarter_round(&mut x, 3, 4, 9, 14);
        }

        for (i, word) in x.iter().enumerate() {
            let v = word.wrapping_add(self.state[i]);
            self.keystream[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
        }
        x.zeroize();
        self.offset = 0;

        self.increment_counter();
        Ok(())
    }

    fn increment_counter(&mut self) {
        match self.layout {
            Layout::Ietf => {
                if self.state[12] == u32::MAX {
                    self.exhausted = true;
                } else {
                    self.state[12] += 1;
                }
            }
            Layout::Original => {
                self.state[12] = self.state[12].wrapping_add(1);
                if self.state[12] == 0 {
                    self.state[13] = self.state[13].wrapping_add(1);
                }
            }
        }
    }
}

#[inline(always)]
fn quarter_round(x: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize) {
    x[a] = x[a].wrapping_add(x[b]);
    x[d] = (x[d] ^ x[a]).rotate_left(16);
    x[c] = x[c].wrapping_add(x[d]);
    x[b] = (x[b] ^ x[c]).rotate_left(12);
    x[a] = x[a].wrapping_add(x[b]);
    x[d] = (x[d] ^ x[a]).rotate_left(8);
    x[c] = x[c].wrapping_add(x[d]);
    x[b] = (x[b] ^ x[c]).rotate_left(7);
}

fn le_word(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

impl Drop for ChaCha20 {
    fn drop(&mut self) {
        self.state.zeroize();
        self.keystream.zeroize();
    }
}

impl fmt::Debug for ChaCha20 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChaCha20")
            .field("layout", &self.layout)
            .field("counter", &self.counter())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keystream(key: &[u8], nonce: &[u8], counter: u64, len: usize) -> Vec<u8> {
        let mut c = ChaCha20::new(key).unwrap();
        c.set_nonce(nonce, counter).unwrap();
        let mut out = vec![0u8; len];
        c.apply_keystream(&mut out).unwrap();
        out
    }

    #[test]
    fn rfc8439_a1_vector_1() {
        // All-zero key and nonce, counter 0
        let ks = keystream(&[0; 32], &[0; 12], 0, 64);
        let expected = [
            0x76, 0xb8, 0xe0, 0xad, 0xa0, 0xf1, 0x3d, 0x90, 0x40, 0x5d, 0x6a, 0xe5, 0x53, 0x86,
            0xbd, 0x28, 0xbd, 0xd2, 0x19, 0xb8, 0xa0, 0x8d, 0xed, 0x1a, 0xa8, 0x36, 0xef, 0xcc,
            0x8b, 0x77, 0x0d, 0xc7, 0xda, 0x41, 0x59, 0x7c, 0x51, 0x57, 0x48, 0x8d, 0x77, 0x24,
            0xe0, 0x3f, 0xb8, 0xd8, 0x4a, 0x37, 0x6a, 0x43, 0xb8, 0xf4, 0x15, 0x18, 0xa1, 0x1c,
            0xc3, 0x87, 0xb6, 0x69, 0xb2, 0xee, 0x65, 0x86,
        ];
        assert_eq!(ks, expected);
    }

    #[test]
    fn rfc8439_a1_vector_3() {
        // Key 00..01, zero nonce. Starting at counter 0, the second block is
        // the published block for counter 1.
        let mut key = [0u8; 32];
        key[31] = 0x01;
        let ks = keystream(&key, &[0; 12], 0, 128);
        let expected = [
            0x3a, 0xeb, 0x52, 0x24, 0xec, 0xf8, 0x49, 0x92, 0x9b, 0x9d, 0x82, 0x8d, 0xb1, 0xce,
            0xd4, 0xdd, 0x83, 0x20, 0x25, 0xe8, 0x01, 0x8b, 0x81, 0x60, 0xb8, 0x22, 0x84, 0xf3,
            0xc9, 0x49, 0xaa, 0x5a, 0x8e, 0xca, 0x00, 0xbb, 0xb4, 0xa7, 0x3b, 0xda, 0xd1, 0x92,
            0xb5, 0xc4, 0x2f, 0x73, 0xf2, 0xfd, 0x4e, 0x27, 0x36, 0x44, 0xc8, 0xb3, 0x61, 0x25,
            0xa6, 0x4a, 0xdd, 0xeb, 0x00, 0x6c, 0x13, 0xa0,
        ];
        assert_eq!(&ks[64..], &expected[..]);

        let direct = keystream(&key, &[0; 12], 1, 64);
        assert_eq!(direct, &ks[64..]);
    }

    #[test]
    fn counter_advances_per_block() {
        let mut c = ChaCha20::new(&[3; 32]).unwrap();
        c.set_nonce(&[0; 12], 5).unwrap();
        let mut buf = [0u8; 65];
        c.apply_keystream(&mut buf).unwrap();
        assert_eq!(c.counter(), 7);
    }

    #[test]
    fn original_layout_rolls_into_high_word() {
        let mut c = ChaCha20::new(&[3; 32]).unwrap();
        c.set_nonce(&[0; 8], u32::MAX as u64).unwrap();
        let mut buf = [0u8; 64];
        c.apply_keystream(&mut buf).unwrap();
        assert_eq!(c.counter(), 1 << 32);
        assert_eq!(c.state[12], 0);
        assert_eq!(c.state[13], 1);
    }

    #[test]
    fn ietf_layout_refuses_to_wrap() {
        let mut c = ChaCha20::new(&[3; 32]).unwrap();
        c.set_nonce(&[0; 12], u32::MAX as u64).unwrap();
        let mut buf = [0u8; 64];
        c.apply_keystream(&mut buf).unwrap();
        let mut more = [0u8; 1];
        assert!(c.apply_keystream(&mut more).is_err());
    }

    #[test]
    fn short_key_uses_tau() {
        let a = keystream(&[5; 16], &[0; 12], 0, 64);
        let b = keystream(&[5; 32], &[0; 12], 0, 64);
        assert_ne!(a, b);
    }
}
