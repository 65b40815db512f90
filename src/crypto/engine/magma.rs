//! GOST R 34.12-2015 64-bit block cipher "Magma" (RFC 8891).

use std::fmt;

use zeroize::Zeroize;

use crate::Error;

// id-tc26-gost-28147-param-Z, Pi0 first.
const PI: [[u8; 16]; 8] = [
    [12, 4, 6, 2, 10, 5, 11, 9, 14, 8, 13, 7, 0, 3, 15, 1],
    [6, 8, 2, 3, 9, 10, 5, 12, 1, 14, 4, 7, 11, 13, 0, 15],
    [11, 3, 5, 8, 2, 15, 10, 13, 14, 1, 7, 4, 12, 9, 6, 0],
    [12, 8, 2, 1, 13, 4, 15, 6, 7, 0, 10, 5, 3, 14, 9, 11],
    [7, 15, 5, 10, 8, 1, 6, 13, 0, 9, 3, 14, 11, 4, 2, 12],
    [5, 13, 15, 6, 9, 2, 12, 10, 11, 7, 8, 1, 4, 3, 14, 0],
    [8, 14, 2, 5, 6, 9, 1, 12, 15, 4, 11, 0, 13, 10, 3, 7],
    [1, 7, 14, 13, 0, 5, 8, 3, 4, 15, 10, 6, 9, 12, 11, 2],
];

pub struct Magma {
    keys: [u32; 8],
}

impl Magma {
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        super::check_key_length(32, key)?;
        let mut keys = [0u32; 8];
        for (i, k) in keys.iter_mut().enumerate() {
            *k = u32::from_be_bytes([key[i * 4], key[i * 4 + 1], key[i * 4 + 2], key[i * 4 + 3]]);
        }
        Ok(Magma { keys })
    }

    pub fn encrypt_block(&self, block: &mut [u8]) {
        // K1..K8 three times, then K8..K1
        self.rounds(block, |r| if r < 24 { r % 8 } else { 31 - r });
    }

    pub fn decrypt_block(&self, block: &mut [u8]) {
        // K1..K8 once, then K8..K1 three times
        self.rounds(block, |r| if r < 8 { r } else { 7 - (r % 8) });
    }

    fn rounds(&self, block: &mut [u8], key_index: impl Fn(usize) -> usize) {
        let mut a1 = u32::from_be_bytes([block[0], block[1], block[2], block[3]]);
        let mut a0 = u32::from_be_bytes([block[4], block[5], block[6], block[7]]);

        for r in 0..31 {
            let k = self.keys[key_index(r)];
            let next = g(k, a0) ^ a1;
            a1 = a0;
            a0 = next;
        }
        a1 ^= g(self.keys[key_index(31)], a0);

        block[..4].copy_from_slice(&a1.to_be_bytes());
        block[4..8].copy_from_slice(&a0.to_be_bytes());
    }
}

fn t(a: u32) -> u32 {
    let mut out = 0;
    for (i, sbox) in PI.iter().enumerate() {
        let nibble = (a >> (4 * i)) & 0x0F;
        out |= (sbox[nibble as usize] as u32) << (4 * i);
    }
    out
}

fn g(k: u32, a: u32) -> u32 {
    t(a.wrapping_add(k)).rotate_left(11)
}

impl Drop for Magma {
    fn drop(&mut self) {
        self.keys.zeroize();
    }
}

impl fmt::Debug for Magma {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Magma").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [
        0xff, 0xee, 0xdd, 0xcc, 0xbb, 0xaa, 0x99, 0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11,
        0x00, 0xf0, 0xf1, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8, 0xf9, 0xfa, 0xfb, 0xfc, 0xfd,
        0xfe, 0xff,
    ];

    #[test]
    fn substitution() {
        assert_eq!(t(0xfdb97531), 0x2a196f34);
    }

    #[test]
    fn round_function() {
        assert_eq!(g(0x87654321, 0xfedcba98), 0xfdcbc20c);
    }

    #[test]
    fn rfc8891_block() {
        let magma = Magma::new(&KEY).unwrap();
        let mut block = [0xfe, 0xdc, 0xba, 0x98, 0x76, 0x54, 0x32, 0x10];
        magma.encrypt_block(&mut block);
        assert_eq!(block, [0x4e, 0xe9, 0x01, 0xe5, 0xc2, 0xd8, 0xca, 0x3d]);

        magma.decrypt_block(&mut block);
        assert_eq!(block, [0xfe, 0xdc, 0xba, 0x98, 0x76, 0x54, 0x32, 0x10]);
    }
}
