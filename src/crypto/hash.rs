use std::fmt;

use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

/// Digest algorithms used for MACs, PRFs and transcripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::Md5 => 16,
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha224 => 28,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// Internal compression block size.
    pub fn block_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha384 | HashAlgorithm::Sha512 => 128,
            _ => 64,
        }
    }

    /// Smallest Merkle-Damgard padding: the 0x80 byte plus the length field.
    pub fn minimal_padding_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha384 | HashAlgorithm::Sha512 => 17,
            _ => 9,
        }
    }

    pub fn new_hash(&self) -> Hash {
        Hash::new(*self)
    }

    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        let mut h = Hash::new(*self);
        h.update(data);
        h.finalize()
    }

    pub fn new_hmac(&self, key: &[u8]) -> Result<HmacState, String> {
        HmacState::new(*self, key)
    }

    /// One-shot HMAC over the concatenation of `parts`.
    pub fn hmac(&self, key: &[u8], parts: &[&[u8]]) -> Result<Vec<u8>, String> {
        let mut mac = HmacState::new(*self, key)?;
        for p in parts {
            mac.update(p);
        }
        Ok(mac.finalize())
    }
}

/// A running hash context.
#[derive(Clone)]
pub enum Hash {
    Md5(Md5),
    Sha1(Sha1),
    Sha224(Sha224),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

impl Hash {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Md5 => Hash::Md5(Md5::new()),
            HashAlgorithm::Sha1 => Hash::Sha1(Sha1::new()),
            HashAlgorithm::Sha224 => Hash::Sha224(Sha224::new()),
            HashAlgorithm::Sha256 => Hash::Sha256(Sha256::new()),
            HashAlgorithm::Sha384 => Hash::Sha384(Sha384::new()),
            HashAlgorithm::Sha512 => Hash::Sha512(Sha512::new()),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            Hash::Md5(h) => h.update(data),
            Hash::Sha1(h) => h.update(data),
            Hash::Sha224(h) => h.update(data),
            Hash::Sha256(h) => h.update(data),
            Hash::Sha384(h) => h.update(data),
            Hash::Sha512(h) => h.update(data),
        }
    }

    pub fn finalize(self) -> Vec<u8> {
        match self {
            Hash::Md5(h) => h.finalize().to_vec(),
            Hash::Sha1(h) => h.finalize().to_vec(),
            Hash::Sha224(h) => h.finalize().to_vec(),
            Hash::Sha256(h) => h.finalize().to_vec(),
            Hash::Sha384(h) => h.finalize().to_vec(),
            Hash::Sha512(h) => h.finalize().to_vec(),
        }
    }

    /// Finalize a copy, so hashing can continue.
    pub fn clone_and_finalize(&self) -> Vec<u8> {
        self.clone().finalize()
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Hash::Md5(_) => "Md5",
            Hash::Sha1(_) => "Sha1",
            Hash::Sha224(_) => "Sha224",
            Hash::Sha256(_) => "Sha256",
            Hash::Sha384(_) => "Sha384",
            Hash::Sha512(_) => "Sha512",
        };
        f.debug_tuple("Hash").field(&name).finish()
    }
}

/// A keyed HMAC context. Cloning keeps the key schedule, which the PRF uses
/// to avoid rekeying for every block.
#[derive(Clone)]
pub enum HmacState {
    Md5(Hmac<Md5>),
    Sha1(Hmac<Sha1>),
    Sha224(Hmac<Sha224>),
    Sha256(Hmac<Sha256>),
    Sha384(Hmac<Sha384>),
    Sha512(Hmac<Sha512>),
}

fn bad_hmac_key<E>(_: E) -> String {
    "Invalid HMAC key length".to_string()
}

impl HmacState {
    pub fn new(algorithm: HashAlgorithm, key: &[u8]) -> Result<Self, String> {
        let state = match algorithm {
            HashAlgorithm::Md5 => HmacState::Md5(Hmac::new_from_slice(key).map_err(bad_hmac_key)?),
            HashAlgorithm::Sha1 => {
                HmacState::Sha1(Hmac::new_from_slice(key).map_err(bad_hmac_key)?)
            }
            HashAlgorithm::Sha224 => {
                HmacState::Sha224(Hmac::new_from_slice(key).map_err(bad_hmac_key)?)
            }
            HashAlgorithm::Sha256 => {
                HmacState::Sha256(Hmac::new_from_slice(key).map_err(bad_hmac_key)?)
            }
            HashAlgorithm::Sha384 => {
                HmacState::Sha384(Hmac::new_from_slice(key).map_err(bad_hmac_key)?)
            }
            HashAlgorithm::Sha512 => {
                HmacState::Sha512(Hmac::new_from_slice(key).map_err(bad_hmac_key)?)
            }
        };
        Ok(state)
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            HmacState::Md5(m) => m.update(data),
            HmacState::Sha1(m) => m.update(data),
            HmacState::Sha224(m) => m.update(data),
            HmacState::Sha256(m) => m.update(data),
            HmacState::Sha384(m) => m.update(data),
            HmacState::Sha512(m) => m.update(data),
        }
    }

    pub fn finalize(self) -> Vec<u8> {
        match self {
            HmacState::Md5(m) => m.finalize().into_bytes().to_vec(),
            HmacState::Sha1(m) => m.finalize().into_bytes().to_vec(),
            HmacState::Sha224(m) => m.finalize().into_bytes().to_vec(),
            HmacState::Sha256(m) => m.finalize().into_bytes().to_vec(),
            HmacState::Sha384(m) => m.finalize().into_bytes().to_vec(),
            HmacState::Sha512(m) => m.finalize().into_bytes().to_vec(),
        }
    }
}

impl fmt::Debug for HmacState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacState").finish()
    }
}

/// SSL 3.0 record MAC (RFC 6101 section 5.2.3.1).
///
/// `hash(secret + pad_2 + hash(secret + pad_1 + data))` where the pads are
/// 48 bytes for MD5 and 40 bytes for SHA-1.
pub fn ssl3_mac(algorithm: HashAlgorithm, secret: &[u8], data: &[&[u8]]) -> Result<Vec<u8>, String> {
    let pad_len = match algorithm {
        HashAlgorithm::Md5 => 48,
        HashAlgorithm::Sha1 => 40,
        _ => return Err(format!("SSL 3.0 MAC does not support {:?}", algorithm)),
    };

    let mut inner = Hash::new(algorithm);
    inner.update(secret);
    inner.update(&[0x36; 48][..pad_len]);
    for d in data {
        inner.update(d);
    }
    let inner = inner.finalize();

    let mut outer = Hash::new(algorithm);
    outer.update(secret);
    outer.update(&[0x5c; 48][..pad_len]);
    outer.update(&inner);
    Ok(outer.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256() {
        let mut hash = Hash::new(HashAlgorithm::Sha256);
        hash.update(b"hello");
        hash.update(b" ");
        hash.update(b"world");
        let result = hash.clone_and_finalize();

        // SHA256("hello world")
        let expected = [
            0xb9, 0x4d, 0x27, 0xb9, 0x93, 0x4d, 0x3e, 0x08, 0xa5, 0x2e, 0x52, 0xd7, 0xda, 0x7d,
            0xab, 0xfa, 0xc4, 0x84, 0xef, 0xe3, 0x7a, 0x53, 0x80, 0xee, 0x90, 0x88, 0xf7, 0xac,
            0xe2, 0xef, 0xcd, 0xe9,
        ];

        assert_eq!(result, expected);
    }

    #[test]
    fn test_md5_and_sha1() {
        // MD5("abc"), SHA1("abc")
        assert_eq!(
            HashAlgorithm::Md5.digest(b"abc"),
            [
                0x90, 0x01, 0x50, 0x98, 0x3c, 0xd2, 0x4f, 0xb0, 0xd6, 0x96, 0x3f, 0x7d, 0x28, 0xe1,
                0x7f, 0x72
            ]
        );
        assert_eq!(
            HashAlgorithm::Sha1.digest(b"abc"),
            [
                0xa9, 0x99, 0x3e, 0x36, 0x47, 0x06, 0x81, 0x6a, 0xba, 0x3e, 0x25, 0x71, 0x78, 0x50,
                0xc2, 0x6c, 0x9c, 0xd0, 0xd8, 0x9d
            ]
        );
    }

    #[test]
    fn hmac_rfc4231_case_2() {
        let mac = HashAlgorithm::Sha256
            .hmac(b"Jefe", &[b"what do ya want ", b"for nothing?"])
            .unwrap();
        let expected = [
            0x5b, 0xdc, 0xc1, 0x46, 0xbf, 0x60, 0x75, 0x4e, 0x6a, 0x04, 0x24, 0x26, 0x08, 0x95,
            0x75, 0xc7, 0x5a, 0x00, 0x3f, 0x08, 0x9d, 0x27, 0x39, 0x83, 0x9d, 0xec, 0x58, 0xb9,
            0x64, 0xec, 0x38, 0x43,
        ];
        assert_eq!(mac, expected);
    }

    #[test]
    fn output_lengths() {
        for alg in [
            HashAlgorithm::Md5,
            HashAlgorithm::Sha1,
            HashAlgorithm::Sha224,
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha384,
            HashAlgorithm::Sha512,
        ] {
            assert_eq!(alg.digest(b"").len(), alg.output_len());
            assert_eq!(alg.hmac(b"k", &[b"m"]).unwrap().len(), alg.output_len());
        }
    }

    #[test]
    fn ssl3_mac_rejects_sha256() {
        assert!(ssl3_mac(HashAlgorithm::Sha256, b"k", &[b"m"]).is_err());
        assert_eq!(ssl3_mac(HashAlgorithm::Sha1, b"k", &[b"m"]).unwrap().len(), 20);
    }
}
