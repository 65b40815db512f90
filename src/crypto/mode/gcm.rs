use aes_gcm::aead::AeadInPlace;

use super::aead::Nonce;
use crate::buffer::Buf;
use crate::crypto::engine::AesGcmCipher;
use crate::Error;

/// AES-GCM with a 16 byte tag.
pub(super) struct Gcm {
    cipher: AesGcmCipher,
}

impl Gcm {
    pub fn new(cipher: AesGcmCipher) -> Self {
        Gcm { cipher }
    }

    /// Encrypt `data` in place and append the tag.
    pub fn seal(&self, nonce: &Nonce, aad: &[u8], data: &mut Buf) -> Result<(), Error> {
        let nonce = aes_gcm::Nonce::from_slice(nonce.as_bytes());
        match &self.cipher {
            AesGcmCipher::Aes128(c) => c.encrypt_in_place(nonce, aad, data),
            AesGcmCipher::Aes256(c) => c.encrypt_in_place(nonce, aad, data),
        }
        .map_err(|_| Error::internal("AES-GCM encryption failed"))
    }

    /// Verify and strip the tag, decrypting `data` in place.
    pub fn open(&self, nonce: &Nonce, aad: &[u8], data: &mut Buf) -> Result<(), Error> {
        let nonce = aes_gcm::Nonce::from_slice(nonce.as_bytes());
        match &self.cipher {
            AesGcmCipher::Aes128(c) => c.decrypt_in_place(nonce, aad, data),
            AesGcmCipher::Aes256(c) => c.decrypt_in_place(nonce, aad, data),
        }
        .map_err(|_| super::bad_record_mac())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::engine::EngineKind;

    fn gcm(key: &[u8]) -> Gcm {
        let engine = EngineKind::Aes128.init(true, key).unwrap().into_block().unwrap();
        Gcm::new(engine.into_aes_gcm().unwrap())
    }

    #[test]
    fn zero_key_vector() {
        // McGrew/Viega GCM test case 2.
        let g = gcm(&[0; 16]);
        let nonce = Nonce::from_bytes([0; 12]);
        let mut data = Buf::from_slice(&[0; 16]);
        g.seal(&nonce, &[], &mut data).unwrap();
        assert_eq!(
            &data[..16],
            &[
                0x03, 0x88, 0xda, 0xce, 0x60, 0xb6, 0xa3, 0x92, 0xf3, 0x28, 0xc2, 0xb9, 0x71, 0xb2,
                0xfe, 0x78
            ]
        );
        assert_eq!(
            &data[16..],
            &[
                0xab, 0x6e, 0x47, 0xd4, 0x2c, 0xec, 0x13, 0xbd, 0xf5, 0x3a, 0x67, 0xb2, 0x12, 0x57,
                0xbd, 0xdf
            ]
        );

        g.open(&nonce, &[], &mut data).unwrap();
        assert_eq!(&*data, &[0; 16]);
    }

    #[test]
    fn wrong_aad_fails() {
        let g = gcm(&[3; 16]);
        let nonce = Nonce::from_bytes([1; 12]);
        let mut data = Buf::from_slice(b"hello");
        g.seal(&nonce, b"ad", &mut data).unwrap();
        assert!(g.open(&nonce, b"da", &mut data).is_err());
    }
}
