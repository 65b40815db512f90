use std::fmt;

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes256};
use des::{Des, TdesEde3};

use super::{EngineKind, Magma};
use crate::Error;

/// A keyed block cipher bound to one direction.
pub struct BlockEngine {
    kind: EngineKind,
    for_encryption: bool,
    inner: Inner,
}

enum Inner {
    Aes128(Box<Aes128>),
    Aes256(Box<Aes256>),
    Des(Box<Des>),
    TripleDes(Box<TdesEde3>),
    Magma(Box<Magma>),
}

fn bad_key(_: impl fmt::Debug) -> String {
    "Invalid block cipher key".to_string()
}

impl BlockEngine {
    pub(super) fn new(kind: EngineKind, for_encryption: bool, key: &[u8]) -> Result<Self, Error> {
        let inner = match kind {
            EngineKind::Aes128 => Inner::Aes128(Box::new(Aes128::new_from_slice(key).map_err(bad_key)?)),
            EngineKind::Aes256 => Inner::Aes256(Box::new(Aes256::new_from_slice(key).map_err(bad_key)?)),
            EngineKind::Des => Inner::Des(Box::new(Des::new_from_slice(key).map_err(bad_key)?)),
            EngineKind::TripleDes => {
                Inner::TripleDes(Box::new(TdesEde3::new_from_slice(key).map_err(bad_key)?))
            }
            EngineKind::Magma => Inner::Magma(Box::new(Magma::new(key)?)),
            _ => return Err(Error::internal(format!("{:?} is not a block engine", kind))),
        };

        Ok(BlockEngine {
            kind,
            for_encryption,
            inner,
        })
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    pub fn block_length(&self) -> usize {
        self.kind.block_length()
    }

    pub fn is_encryption(&self) -> bool {
        self.for_encryption
    }

    /// Transform exactly one block in the direction chosen at init.
    pub fn cipher(&self, input: &[u8], output: &mut [u8]) -> Result<(), Error> {
        let n = self.block_length();
        if input.len() != n || output.len() < n {
            return Err(Error::internal(format!(
                "Block engine expects {} byte blocks, got {}",
                n,
                input.len()
            )));
        }
        let block = &mut output[..n];
        block.copy_from_slice(input);
        self.cipher_in_place(block);
        Ok(())
    }

    /// Transform one block in place. `block` must be `block_length()` long.
    pub(crate) fn cipher_in_place(&self, block: &mut [u8]) {
        if self.for_encryption {
            self.encrypt_block(block)
        } else {
            self.decrypt_block(block)
        }
    }

    /// Forward transform regardless of direction, used by counter-based modes.
    pub(crate) fn encrypt_block(&self, block: &mut [u8]) {
        match &self.inner {
            Inner::Aes128(c) => c.encrypt_block(GenericArray::from_mut_slice(block)),
            Inner::Aes256(c) => c.encrypt_block(GenericArray::from_mut_slice(block)),
            Inner::Des(c) => c.encrypt_block(GenericArray::from_mut_slice(block)),
            Inner::TripleDes(c) => c.encrypt_block(GenericArray::from_mut_slice(block)),
            Inner::Magma(c) => c.encrypt_block(block),
        }
    }

    pub(crate) fn decrypt_block(&self, block: &mut [u8]) {
        match &self.inner {
            Inner::Aes128(c) => c.decrypt_block(GenericArray::from_mut_slice(block)),
            Inner::Aes256(c) => c.decrypt_block(GenericArray::from_mut_slice(block)),
            Inner::Des(c) => c.decrypt_block(GenericArray::from_mut_slice(block)),
            Inner::TripleDes(c) => c.decrypt_block(GenericArray::from_mut_slice(block)),
            Inner::Magma(c) => c.decrypt_block(block),
        }
    }

    /// Hand the AES key schedule to a GCM instance.
    pub(crate) fn into_aes_gcm(self) -> Result<AesGcmCipher, Error> {
        match self.inner {
            Inner::Aes128(c) => Ok(AesGcmCipher::Aes128(Box::new(aes_gcm::Aes128Gcm::from(*c)))),
            Inner::Aes256(c) => Ok(AesGcmCipher::Aes256(Box::new(aes_gcm::Aes256Gcm::from(*c)))),
            _ => Err(Error::internal(format!("GCM requires AES, got {:?}", self.kind))),
        }
    }
}

/// GCM over a keyed AES engine.
pub(crate) enum AesGcmCipher {
    Aes128(Box<aes_gcm::Aes128Gcm>),
    Aes256(Box<aes_gcm::Aes256Gcm>),
}

impl fmt::Debug for BlockEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockEngine")
            .field("kind", &self.kind)
            .field("for_encryption", &self.for_encryption)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aes128_fips197_vector() {
        // FIPS-197 appendix C.1
        let key: Vec<u8> = (0u8..16).collect();
        let plaintext = [
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, //
            0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff,
        ];
        let expected = [
            0x69, 0xc4, 0xe0, 0xd8, 0x6a, 0x7b, 0x04, 0x30, //
            0xd8, 0xcd, 0xb7, 0x80, 0x70, 0xb4, 0xc5, 0x5a,
        ];

        let enc = BlockEngine::new(EngineKind::Aes128, true, &key).unwrap();
        let mut out = [0u8; 16];
        enc.cipher(&plaintext, &mut out).unwrap();
        assert_eq!(out, expected);

        let dec = BlockEngine::new(EngineKind::Aes128, false, &key).unwrap();
        let mut back = [0u8; 16];
        dec.cipher(&out, &mut back).unwrap();
        assert_eq!(back, plaintext);
    }

    #[test]
    fn triple_des_roundtrip() {
        let key = [0x13u8; 24];
        let enc = BlockEngine::new(EngineKind::TripleDes, true, &key).unwrap();
        let dec = BlockEngine::new(EngineKind::TripleDes, false, &key).unwrap();

        let mut block = *b"8 bytes!";
        enc.cipher_in_place(&mut block);
        assert_ne!(&block, b"8 bytes!");
        dec.cipher_in_place(&mut block);
        assert_eq!(&block, b"8 bytes!");
    }

    #[test]
    fn wrong_block_size_rejected() {
        let enc = BlockEngine::new(EngineKind::Des, true, &[1; 8]).unwrap();
        let mut out = [0u8; 16];
        assert!(enc.cipher(&[0; 16], &mut out).is_err());
    }
}
