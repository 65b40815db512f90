//! Raw cipher engines.
//!
//! An engine is a keyed block or stream transform with no framing, padding or
//! authentication. Modes in [`super::mode`] wrap them.

mod block;
pub use block::BlockEngine;
pub(crate) use block::AesGcmCipher;

mod chacha20;
pub use chacha20::ChaCha20;

mod magma;
pub use magma::Magma;

mod rc4;
pub use rc4::Rc4;

use crate::Error;

/// Engine algorithms referenced by the cipher-suite catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    Null,
    Aes128,
    Aes256,
    Des,
    TripleDes,
    Magma,
    ChaCha20,
    Rc4_128,
}

impl EngineKind {
    /// Key length in bytes.
    pub fn key_length(&self) -> usize {
        match self {
            EngineKind::Null => 0,
            EngineKind::Aes128 => 16,
            EngineKind::Aes256 => 32,
            EngineKind::Des => 8,
            EngineKind::TripleDes => 24,
            EngineKind::Magma => 32,
            EngineKind::ChaCha20 => 32,
            EngineKind::Rc4_128 => 16,
        }
    }

    /// Block length in bytes, 0 for stream engines.
    pub fn block_length(&self) -> usize {
        match self {
            EngineKind::Aes128 | EngineKind::Aes256 => 16,
            EngineKind::Des | EngineKind::TripleDes | EngineKind::Magma => 8,
            EngineKind::Null | EngineKind::ChaCha20 | EngineKind::Rc4_128 => 0,
        }
    }

    pub fn is_block(&self) -> bool {
        self.block_length() > 0
    }

    /// Key the engine.
    ///
    /// `for_encryption` selects the direction of block engines. Stream
    /// engines are symmetric and ignore it.
    pub fn init(&self, for_encryption: bool, key: &[u8]) -> Result<CipherEngine, Error> {
        check_key_length(self.key_length(), key)?;

        let engine = match self {
            EngineKind::Null => CipherEngine::Null,
            EngineKind::ChaCha20 => CipherEngine::Stream(StreamEngine::ChaCha20(ChaCha20::new(key)?)),
            EngineKind::Rc4_128 => CipherEngine::Stream(StreamEngine::Rc4(Rc4::new(key))),
            _ => CipherEngine::Block(BlockEngine::new(*self, for_encryption, key)?),
        };

        Ok(engine)
    }
}

pub(crate) fn check_key_length(expected: usize, key: &[u8]) -> Result<(), Error> {
    if key.len() != expected {
        return Err(Error::InvalidKeyLength {
            expected,
            actual: key.len(),
        });
    }
    Ok(())
}

/// A keyed engine, either a fixed-block transform or a keystream generator.
#[derive(Debug)]
pub enum CipherEngine {
    Null,
    Block(BlockEngine),
    Stream(StreamEngine),
}

impl CipherEngine {
    pub fn block_length(&self) -> usize {
        match self {
            CipherEngine::Block(b) => b.block_length(),
            _ => 0,
        }
    }

    pub fn into_block(self) -> Result<BlockEngine, Error> {
        match self {
            CipherEngine::Block(b) => Ok(b),
            _ => Err(Error::internal("Expected a block engine")),
        }
    }

    pub fn into_stream(self) -> Result<StreamEngine, Error> {
        match self {
            CipherEngine::Stream(s) => Ok(s),
            _ => Err(Error::internal("Expected a stream engine")),
        }
    }
}

/// Keystream generators. Encryption and decryption are the same XOR.
#[derive(Debug)]
pub enum StreamEngine {
    ChaCha20(ChaCha20),
    Rc4(Rc4),
}

impl StreamEngine {
    /// Fill `output` with the next keystream bytes.
    pub fn generate_keystream(&mut self, output: &mut [u8]) -> Result<(), Error> {
        output.fill(0);
        self.apply_keystream(output)
    }

    /// XOR `input` with the keystream into `output`.
    pub fn update(&mut self, input: &[u8], output: &mut [u8]) -> Result<(), Error> {
        if output.len() < input.len() {
            return Err(Error::internal("Output shorter than input"));
        }
        let output = &mut output[..input.len()];
        output.copy_from_slice(input);
        self.apply_keystream(output)
    }

    pub fn apply_keystream(&mut self, data: &mut [u8]) -> Result<(), Error> {
        match self {
            StreamEngine::ChaCha20(c) => c.apply_keystream(data),
            StreamEngine::Rc4(r) => {
                r.apply_keystream(data);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_length_is_validated() {
        let err = EngineKind::Aes128.init(true, &[0; 15]).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidKeyLength {
                expected: 16,
                actual: 15
            }
        ));

        assert!(EngineKind::TripleDes.init(false, &[7; 24]).is_ok());
        assert!(EngineKind::ChaCha20.init(true, &[0; 16]).is_err());
    }

    #[test]
    fn engine_family() {
        let e = EngineKind::Aes256.init(true, &[1; 32]).unwrap();
        assert_eq!(e.block_length(), 16);
        assert!(e.into_stream().is_err());

        let e = EngineKind::Rc4_128.init(true, &[1; 16]).unwrap();
        assert_eq!(e.block_length(), 0);
        assert!(e.into_stream().is_ok());
    }

    #[test]
    fn stream_update_matches_keystream() {
        let mut a = EngineKind::ChaCha20.init(true, &[9; 32]).unwrap().into_stream().unwrap();
        let mut b = EngineKind::ChaCha20.init(true, &[9; 32]).unwrap().into_stream().unwrap();

        let input = [0x42u8; 100];
        let mut out = [0u8; 100];
        a.update(&input, &mut out).unwrap();

        let mut ks = [0u8; 100];
        b.generate_keystream(&mut ks).unwrap();

        for i in 0..100 {
            assert_eq!(out[i], input[i] ^ ks[i]);
        }
    }
}
