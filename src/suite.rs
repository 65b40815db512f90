//! Cipher suite catalog.
//!
//! An immutable table from the 16-bit suite id to the key exchange, cipher
//! engine, mode, hash and version range the suite stands for. Signaling ids
//! (GREASE, SCSVs) are catalogued as [`CatalogEntry::Sentinel`] so they
//! round-trip through ClientHello, and are rejected by [`select`].

use std::fmt;

use crate::crypto::engine::EngineKind;
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::mode::{CipherMode, ModeKind, ModeParams};
use crate::kx::KeyExchangeAlgorithm;
use crate::secret::{DirectionKeys, KeyBlockLayout};
use crate::types::{grease, ProtocolVersion};
use crate::Error;

/// How the server (and optionally the client) proves its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthAlgorithm {
    Anonymous,
    Rsa,
    Dss,
    Ecdsa,
    Psk,
    Srp,
    Krb5,
    Gost,
    EccPwd,
    /// TLS 1.3, decided by signature_algorithms and the certificate.
    Certificate,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CipherSuite {
    pub id: u16,
    pub name: &'static str,
    pub key_exchange: KeyExchangeAlgorithm,
    pub auth: AuthAlgorithm,
    pub engine: EngineKind,
    pub mode: ModeKind,
    /// MAC hash for CBC, stream and null suites, PRF/HKDF hash for AEAD suites.
    pub hash: HashAlgorithm,
    pub min_version: ProtocolVersion,
    pub max_version: ProtocolVersion,
}

impl CipherSuite {
    pub fn is_aead(&self) -> bool {
        self.mode.is_aead()
    }

    pub fn is_tls13(&self) -> bool {
        self.key_exchange == KeyExchangeAlgorithm::Tls13
    }

    /// Whether the suite can be used with `version`.
    ///
    /// Stream ciphers are never usable over DTLS.
    pub fn supports(&self, version: ProtocolVersion) -> bool {
        if !version.is_known() {
            return false;
        }
        if version.is_dtls() && self.mode == ModeKind::Stream {
            return false;
        }
        let rank = version.rank();
        self.min_version.rank() <= rank && rank <= self.max_version.rank()
    }

    /// Record MAC hash, `None` for AEAD suites.
    pub fn mac_hash(&self) -> Option<HashAlgorithm> {
        if self.is_aead() {
            None
        } else {
            Some(self.hash)
        }
    }

    /// Hash for the TLS 1.2 PRF (RFC 5246 section 5) and the TLS 1.3 key schedule.
    pub fn prf_hash(&self) -> HashAlgorithm {
        match self.hash {
            HashAlgorithm::Sha384 => HashAlgorithm::Sha384,
            _ => HashAlgorithm::Sha256,
        }
    }

    pub fn key_block_layout(&self, version: ProtocolVersion) -> KeyBlockLayout {
        KeyBlockLayout {
            mac_len: self.mac_hash().map(|h| h.output_len()).unwrap_or(0),
            key_len: self.engine.key_length(),
            iv_len: self.mode.fixed_iv_length(self.engine, version),
        }
    }

    /// Instantiate the cipher mode for one direction.
    pub fn new_mode(
        &self,
        version: ProtocolVersion,
        for_encryption: bool,
        keys: &DirectionKeys,
        encrypt_then_mac: bool,
    ) -> Result<CipherMode, Error> {
        let mac = self.mac_hash().map(|h| (h, keys.mac.as_slice()));
        self.mode.init(
            self.engine,
            ModeParams {
                version,
                for_encryption,
                key: &keys.key,
                fixed_iv: &keys.iv,
                mac,
                encrypt_then_mac: encrypt_then_mac && self.mode == ModeKind::Cbc,
            },
        )
    }
}

impl fmt::Debug for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:04X})", self.name, self.id)
    }
}

impl fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogEntry {
    Suite(CipherSuite),
    /// Valid to advertise, never to select.
    Sentinel { id: u16, name: &'static str },
}

impl CatalogEntry {
    pub fn id(&self) -> u16 {
        match self {
            CatalogEntry::Suite(s) => s.id,
            CatalogEntry::Sentinel { id, .. } => *id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CatalogEntry::Suite(s) => s.name,
            CatalogEntry::Sentinel { name, .. } => name,
        }
    }

    pub fn as_suite(&self) -> Option<&CipherSuite> {
        match self {
            CatalogEntry::Suite(s) => Some(s),
            CatalogEntry::Sentinel { .. } => None,
        }
    }
}

macro_rules! suites {
    ($($id:literal $name:literal $kx:ident $auth:ident $engine:ident $mode:ident $hash:ident $min:ident $max:ident;)*) => {
        &[$(
            CatalogEntry::Suite(CipherSuite {
                id: $id,
                name: $name,
                key_exchange: KeyExchangeAlgorithm::$kx,
                auth: AuthAlgorithm::$auth,
                engine: EngineKind::$engine,
                mode: ModeKind::$mode,
                hash: HashAlgorithm::$hash,
                min_version: ProtocolVersion::$min,
                max_version: ProtocolVersion::$max,
            }),
        )*]
    };
}

#[rustfmt::skip]
static SUITES: &[CatalogEntry] = suites! {
    // TLS 1.3 (RFC 8446)
    0x1301 "TLS_AES_128_GCM_SHA256" Tls13 Certificate Aes128 Gcm Sha256 Tls1_3 Tls1_3;
    0x1302 "TLS_AES_256_GCM_SHA384" Tls13 Certificate Aes256 Gcm Sha384 Tls1_3 Tls1_3;
    0x1303 "TLS_CHACHA20_POLY1305_SHA256" Tls13 Certificate ChaCha20 ChaCha20Poly1305 Sha256 Tls1_3 Tls1_3;
    0x1304 "TLS_AES_128_CCM_SHA256" Tls13 Certificate Aes128 Ccm Sha256 Tls1_3 Tls1_3;
    0x1305 "TLS_AES_128_CCM_8_SHA256" Tls13 Certificate Aes128 Ccm8 Sha256 Tls1_3 Tls1_3;

    // ECDHE_ECDSA (RFC 8422, 5289, 7251, 7905)
    0xC02B "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256" EcdheEcdsa Ecdsa Aes128 Gcm Sha256 Tls1_2 Tls1_2;
    0xC02C "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384" EcdheEcdsa Ecdsa Aes256 Gcm Sha384 Tls1_2 Tls1_2;
    0xCCA9 "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256" EcdheEcdsa Ecdsa ChaCha20 ChaCha20Poly1305 Sha256 Tls1_2 Tls1_2;
    0xC0AC "TLS_ECDHE_ECDSA_WITH_AES_128_CCM" EcdheEcdsa Ecdsa Aes128 Ccm Sha256 Tls1_2 Tls1_2;
    0xC0AD "TLS_ECDHE_ECDSA_WITH_AES_256_CCM" EcdheEcdsa Ecdsa Aes256 Ccm Sha256 Tls1_2 Tls1_2;
    0xC0AE "TLS_ECDHE_ECDSA_WITH_AES_128_CCM_8" EcdheEcdsa Ecdsa Aes128 Ccm8 Sha256 Tls1_2 Tls1_2;
    0xC0AF "TLS_ECDHE_ECDSA_WITH_AES_256_CCM_8" EcdheEcdsa Ecdsa Aes256 Ccm8 Sha256 Tls1_2 Tls1_2;
    0xC023 "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA256" EcdheEcdsa Ecdsa Aes128 Cbc Sha256 Tls1_2 Tls1_2;
    0xC024 "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA384" EcdheEcdsa Ecdsa Aes256 Cbc Sha384 Tls1_2 Tls1_2;
    0xC009 "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA" EcdheEcdsa Ecdsa Aes128 Cbc Sha1 Tls1_0 Tls1_2;
    0xC00A "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA" EcdheEcdsa Ecdsa Aes256 Cbc Sha1 Tls1_0 Tls1_2;
    0xC008 "TLS_ECDHE_ECDSA_WITH_3DES_EDE_CBC_SHA" EcdheEcdsa Ecdsa TripleDes Cbc Sha1 Tls1_0 Tls1_2;
    0xC007 "TLS_ECDHE_ECDSA_WITH_RC4_128_SHA" EcdheEcdsa Ecdsa Rc4_128 Stream Sha1 Tls1_0 Tls1_2;
    0xC006 "TLS_ECDHE_ECDSA_WITH_NULL_SHA" EcdheEcdsa Ecdsa Null Null Sha1 Tls1_0 Tls1_2;

    // ECDHE_RSA
    0xC02F "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256" EcdheRsa Rsa Aes128 Gcm Sha256 Tls1_2 Tls1_2;
    0xC030 "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384" EcdheRsa Rsa Aes256 Gcm Sha384 Tls1_2 Tls1_2;
    0xCCA8 "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256" EcdheRsa Rsa ChaCha20 ChaCha20Poly1305 Sha256 Tls1_2 Tls1_2;
    0xC027 "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256" EcdheRsa Rsa Aes128 Cbc Sha256 Tls1_2 Tls1_2;
    0xC028 "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA384" EcdheRsa Rsa Aes256 Cbc Sha384 Tls1_2 Tls1_2;
    0xC013 "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA" EcdheRsa Rsa Aes128 Cbc Sha1 Tls1_0 Tls1_2;
    0xC014 "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA" EcdheRsa Rsa Aes256 Cbc Sha1 Tls1_0 Tls1_2;
    0xC012 "TLS_ECDHE_RSA_WITH_3DES_EDE_CBC_SHA" EcdheRsa Rsa TripleDes Cbc Sha1 Tls1_0 Tls1_2;
    0xC011 "TLS_ECDHE_RSA_WITH_RC4_128_SHA" EcdheRsa Rsa Rc4_128 Stream Sha1 Tls1_0 Tls1_2;
    0xC010 "TLS_ECDHE_RSA_WITH_NULL_SHA" EcdheRsa Rsa Null Null Sha1 Tls1_0 Tls1_2;

    // ECDH_ECDSA, ECDH_RSA (static keys from the certificate)
    0xC02D "TLS_ECDH_ECDSA_WITH_AES_128_GCM_SHA256" EcdhEcdsa Ecdsa Aes128 Gcm Sha256 Tls1_2 Tls1_2;
    0xC02E "TLS_ECDH_ECDSA_WITH_AES_256_GCM_SHA384" EcdhEcdsa Ecdsa Aes256 Gcm Sha384 Tls1_2 Tls1_2;
    0xC025 "TLS_ECDH_ECDSA_WITH_AES_128_CBC_SHA256" EcdhEcdsa Ecdsa Aes128 Cbc Sha256 Tls1_2 Tls1_2;
    0xC026 "TLS_ECDH_ECDSA_WITH_AES_256_CBC_SHA384" EcdhEcdsa Ecdsa Aes256 Cbc Sha384 Tls1_2 Tls1_2;
    0xC004 "TLS_ECDH_ECDSA_WITH_AES_128_CBC_SHA" EcdhEcdsa Ecdsa Aes128 Cbc Sha1 Tls1_0 Tls1_2;
    0xC005 "TLS_ECDH_ECDSA_WITH_AES_256_CBC_SHA" EcdhEcdsa Ecdsa Aes256 Cbc Sha1 Tls1_0 Tls1_2;
    0xC003 "TLS_ECDH_ECDSA_WITH_3DES_EDE_CBC_SHA" EcdhEcdsa Ecdsa TripleDes Cbc Sha1 Tls1_0 Tls1_2;
    0xC002 "TLS_ECDH_ECDSA_WITH_RC4_128_SHA" EcdhEcdsa Ecdsa Rc4_128 Stream Sha1 Tls1_0 Tls1_2;
    0xC001 "TLS_ECDH_ECDSA_WITH_NULL_SHA" EcdhEcdsa Ecdsa Null Null Sha1 Tls1_0 Tls1_2;
    0xC031 "TLS_ECDH_RSA_WITH_AES_128_GCM_SHA256" EcdhRsa Rsa Aes128 Gcm Sha256 Tls1_2 Tls1_2;
    0xC032 "TLS_ECDH_RSA_WITH_AES_256_GCM_SHA384" EcdhRsa Rsa Aes256 Gcm Sha384 Tls1_2 Tls1_2;
    0xC029 "TLS_ECDH_RSA_WITH_AES_128_CBC_SHA256" EcdhRsa Rsa Aes128 Cbc Sha256 Tls1_2 Tls1_2;
    0xC02A "TLS_ECDH_RSA_WITH_AES_256_CBC_SHA384" EcdhRsa Rsa Aes256 Cbc Sha384 Tls1_2 Tls1_2;
    0xC00E "TLS_ECDH_RSA_WITH_AES_128_CBC_SHA" EcdhRsa Rsa Aes128 Cbc Sha1 Tls1_0 Tls1_2;
    0xC00F "TLS_ECDH_RSA_WITH_AES_256_CBC_SHA" EcdhRsa Rsa Aes256 Cbc Sha1 Tls1_0 Tls1_2;
    0xC00D "TLS_ECDH_RSA_WITH_3DES_EDE_CBC_SHA" EcdhRsa Rsa TripleDes Cbc Sha1 Tls1_0 Tls1_2;
    0xC00C "TLS_ECDH_RSA_WITH_RC4_128_SHA" EcdhRsa Rsa Rc4_128 Stream Sha1 Tls1_0 Tls1_2;
    0xC00B "TLS_ECDH_RSA_WITH_NULL_SHA" EcdhRsa Rsa Null Null Sha1 Tls1_0 Tls1_2;

    // ECDH_anon
    0xC018 "TLS_ECDH_anon_WITH_AES_128_CBC_SHA" EcdhAnon Anonymous Aes128 Cbc Sha1 Tls1_0 Tls1_2;
    0xC019 "TLS_ECDH_anon_WITH_AES_256_CBC_SHA" EcdhAnon Anonymous Aes256 Cbc Sha1 Tls1_0 Tls1_2;
    0xC017 "TLS_ECDH_anon_WITH_3DES_EDE_CBC_SHA" EcdhAnon Anonymous TripleDes Cbc Sha1 Tls1_0 Tls1_2;
    0xC016 "TLS_ECDH_anon_WITH_RC4_128_SHA" EcdhAnon Anonymous Rc4_128 Stream Sha1 Tls1_0 Tls1_2;
    0xC015 "TLS_ECDH_anon_WITH_NULL_SHA" EcdhAnon Anonymous Null Null Sha1 Tls1_0 Tls1_2;

    // DHE_RSA, DHE_DSS (RFC 5246, 5288, 6655, 7905)
    0x009E "TLS_DHE_RSA_WITH_AES_128_GCM_SHA256" DheRsa Rsa Aes128 Gcm Sha256 Tls1_2 Tls1_2;
    0x009F "TLS_DHE_RSA_WITH_AES_256_GCM_SHA384" DheRsa Rsa Aes256 Gcm Sha384 Tls1_2 Tls1_2;
    0xCCAA "TLS_DHE_RSA_WITH_CHACHA20_POLY1305_SHA256" DheRsa Rsa ChaCha20 ChaCha20Poly1305 Sha256 Tls1_2 Tls1_2;
    0xC09E "TLS_DHE_RSA_WITH_AES_128_CCM" DheRsa Rsa Aes128 Ccm Sha256 Tls1_2 Tls1_2;
    0xC09F "TLS_DHE_RSA_WITH_AES_256_CCM" DheRsa Rsa Aes256 Ccm Sha256 Tls1_2 Tls1_2;
    0xC0A2 "TLS_DHE_RSA_WITH_AES_128_CCM_8" DheRsa Rsa Aes128 Ccm8 Sha256 Tls1_2 Tls1_2;
    0xC0A3 "TLS_DHE_RSA_WITH_AES_256_CCM_8" DheRsa Rsa Aes256 Ccm8 Sha256 Tls1_2 Tls1_2;
    0x0067 "TLS_DHE_RSA_WITH_AES_128_CBC_SHA256" DheRsa Rsa Aes128 Cbc Sha256 Tls1_2 Tls1_2;
    0x006B "TLS_DHE_RSA_WITH_AES_256_CBC_SHA256" DheRsa Rsa Aes256 Cbc Sha256 Tls1_2 Tls1_2;
    0x0033 "TLS_DHE_RSA_WITH_AES_128_CBC_SHA" DheRsa Rsa Aes128 Cbc Sha1 Ssl3_0 Tls1_2;
    0x0039 "TLS_DHE_RSA_WITH_AES_256_CBC_SHA" DheRsa Rsa Aes256 Cbc Sha1 Ssl3_0 Tls1_2;
    0x0016 "SSL_DHE_RSA_WITH_3DES_EDE_CBC_SHA" DheRsa Rsa TripleDes Cbc Sha1 Ssl3_0 Tls1_2;
    0x0015 "SSL_DHE_RSA_WITH_DES_CBC_SHA" DheRsa Rsa Des Cbc Sha1 Ssl3_0 Tls1_1;
    0x00A2 "TLS_DHE_DSS_WITH_AES_128_GCM_SHA256" DheDss Dss Aes128 Gcm Sha256 Tls1_2 Tls1_2;
    0x00A3 "TLS_DHE_DSS_WITH_AES_256_GCM_SHA384" DheDss Dss Aes256 Gcm Sha384 Tls1_2 Tls1_2;
    0x0040 "TLS_DHE_DSS_WITH_AES_128_CBC_SHA256" DheDss Dss Aes128 Cbc Sha256 Tls1_2 Tls1_2;
    0x006A "TLS_DHE_DSS_WITH_AES_256_CBC_SHA256" DheDss Dss Aes256 Cbc Sha256 Tls1_2 Tls1_2;
    0x0032 "TLS_DHE_DSS_WITH_AES_128_CBC_SHA" DheDss Dss Aes128 Cbc Sha1 Ssl3_0 Tls1_2;
    0x0038 "TLS_DHE_DSS_WITH_AES_256_CBC_SHA" DheDss Dss Aes256 Cbc Sha1 Ssl3_0 Tls1_2;
    0x0013 "SSL_DHE_DSS_WITH_3DES_EDE_CBC_SHA" DheDss Dss TripleDes Cbc Sha1 Ssl3_0 Tls1_2;
    0x0012 "SSL_DHE_DSS_WITH_DES_CBC_SHA" DheDss Dss Des Cbc Sha1 Ssl3_0 Tls1_1;

    // DH_RSA, DH_DSS (static keys from the certificate)
    0x00A0 "TLS_DH_RSA_WITH_AES_128_GCM_SHA256" DhRsa Rsa Aes128 Gcm Sha256 Tls1_2 Tls1_2;
    0x00A1 "TLS_DH_RSA_WITH_AES_256_GCM_SHA384" DhRsa Rsa Aes256 Gcm Sha384 Tls1_2 Tls1_2;
    0x003F "TLS_DH_RSA_WITH_AES_128_CBC_SHA256" DhRsa Rsa Aes128 Cbc Sha256 Tls1_2 Tls1_2;
    0x0069 "TLS_DH_RSA_WITH_AES_256_CBC_SHA256" DhRsa Rsa Aes256 Cbc Sha256 Tls1_2 Tls1_2;
    0x0031 "TLS_DH_RSA_WITH_AES_128_CBC_SHA" DhRsa Rsa Aes128 Cbc Sha1 Ssl3_0 Tls1_2;
    0x0037 "TLS_DH_RSA_WITH_AES_256_CBC_SHA" DhRsa Rsa Aes256 Cbc Sha1 Ssl3_0 Tls1_2;
    0x0010 "SSL_DH_RSA_WITH_3DES_EDE_CBC_SHA" DhRsa Rsa TripleDes Cbc Sha1 Ssl3_0 Tls1_2;
    0x000F "SSL_DH_RSA_WITH_DES_CBC_SHA" DhRsa Rsa Des Cbc Sha1 Ssl3_0 Tls1_1;
    0x00A4 "TLS_DH_DSS_WITH_AES_128_GCM_SHA256" DhDss Dss Aes128 Gcm Sha256 Tls1_2 Tls1_2;
    0x00A5 "TLS_DH_DSS_WITH_AES_256_GCM_SHA384" DhDss Dss Aes256 Gcm Sha384 Tls1_2 Tls1_2;
    0x003E "TLS_DH_DSS_WITH_AES_128_CBC_SHA256" DhDss Dss Aes128 Cbc Sha256 Tls1_2 Tls1_2;
    0x0068 "TLS_DH_DSS_WITH_AES_256_CBC_SHA256" DhDss Dss Aes256 Cbc Sha256 Tls1_2 Tls1_2;
    0x0030 "TLS_DH_DSS_WITH_AES_128_CBC_SHA" DhDss Dss Aes128 Cbc Sha1 Ssl3_0 Tls1_2;
    0x0036 "TLS_DH_DSS_WITH_AES_256_CBC_SHA" DhDss Dss Aes256 Cbc Sha1 Ssl3_0 Tls1_2;
    0x000D "SSL_DH_DSS_WITH_3DES_EDE_CBC_SHA" DhDss Dss TripleDes Cbc Sha1 Ssl3_0 Tls1_2;
    0x000C "SSL_DH_DSS_WITH_DES_CBC_SHA" DhDss Dss Des Cbc Sha1 Ssl3_0 Tls1_1;

    // DH_anon
    0x00A6 "TLS_DH_anon_WITH_AES_128_GCM_SHA256" DhAnon Anonymous Aes128 Gcm Sha256 Tls1_2 Tls1_2;
    0x00A7 "TLS_DH_anon_WITH_AES_256_GCM_SHA384" DhAnon Anonymous Aes256 Gcm Sha384 Tls1_2 Tls1_2;
    0x006C "TLS_DH_anon_WITH_AES_128_CBC_SHA256" DhAnon Anonymous Aes128 Cbc Sha256 Tls1_2 Tls1_2;
    0x006D "TLS_DH_anon_WITH_AES_256_CBC_SHA256" DhAnon Anonymous Aes256 Cbc Sha256 Tls1_2 Tls1_2;
    0x0034 "TLS_DH_anon_WITH_AES_128_CBC_SHA" DhAnon Anonymous Aes128 Cbc Sha1 Ssl3_0 Tls1_2;
    0x003A "TLS_DH_anon_WITH_AES_256_CBC_SHA" DhAnon Anonymous Aes256 Cbc Sha1 Ssl3_0 Tls1_2;
    0x001B "SSL_DH_anon_WITH_3DES_EDE_CBC_SHA" DhAnon Anonymous TripleDes Cbc Sha1 Ssl3_0 Tls1_2;
    0x001A "SSL_DH_anon_WITH_DES_CBC_SHA" DhAnon Anonymous Des Cbc Sha1 Ssl3_0 Tls1_1;
    0x0018 "SSL_DH_anon_WITH_RC4_128_MD5" DhAnon Anonymous Rc4_128 Stream Md5 Ssl3_0 Tls1_2;

    // RSA (RFC 5246, 5288, 6655)
    0x009C "TLS_RSA_WITH_AES_128_GCM_SHA256" Rsa Rsa Aes128 Gcm Sha256 Tls1_2 Tls1_2;
    0x009D "TLS_RSA_WITH_AES_256_GCM_SHA384" Rsa Rsa Aes256 Gcm Sha384 Tls1_2 Tls1_2;
    0xC09C "TLS_RSA_WITH_AES_128_CCM" Rsa Rsa Aes128 Ccm Sha256 Tls1_2 Tls1_2;
    0xC09D "TLS_RSA_WITH_AES_256_CCM" Rsa Rsa Aes256 Ccm Sha256 Tls1_2 Tls1_2;
    0xC0A0 "TLS_RSA_WITH_AES_128_CCM_8" Rsa Rsa Aes128 Ccm8 Sha256 Tls1_2 Tls1_2;
    0xC0A1 "TLS_RSA_WITH_AES_256_CCM_8" Rsa Rsa Aes256 Ccm8 Sha256 Tls1_2 Tls1_2;
    0x003C "TLS_RSA_WITH_AES_128_CBC_SHA256" Rsa Rsa Aes128 Cbc Sha256 Tls1_2 Tls1_2;
    0x003D "TLS_RSA_WITH_AES_256_CBC_SHA256" Rsa Rsa Aes256 Cbc Sha256 Tls1_2 Tls1_2;
    0x002F "TLS_RSA_WITH_AES_128_CBC_SHA" Rsa Rsa Aes128 Cbc Sha1 Ssl3_0 Tls1_2;
    0x0035 "TLS_RSA_WITH_AES_256_CBC_SHA" Rsa Rsa Aes256 Cbc Sha1 Ssl3_0 Tls1_2;
    0x000A "SSL_RSA_WITH_3DES_EDE_CBC_SHA" Rsa Rsa TripleDes Cbc Sha1 Ssl3_0 Tls1_2;
    0x0009 "SSL_RSA_WITH_DES_CBC_SHA" Rsa Rsa Des Cbc Sha1 Ssl3_0 Tls1_1;
    0x0005 "SSL_RSA_WITH_RC4_128_SHA" Rsa Rsa Rc4_128 Stream Sha1 Ssl3_0 Tls1_2;
    0x0004 "SSL_RSA_WITH_RC4_128_MD5" Rsa Rsa Rc4_128 Stream Md5 Ssl3_0 Tls1_2;
    0x003B "TLS_RSA_WITH_NULL_SHA256" Rsa Rsa Null Null Sha256 Tls1_2 Tls1_2;
    0x0002 "SSL_RSA_WITH_NULL_SHA" Rsa Rsa Null Null Sha1 Ssl3_0 Tls1_2;
    0x0001 "SSL_RSA_WITH_NULL_MD5" Rsa Rsa Null Null Md5 Ssl3_0 Tls1_2;

    // PSK (RFC 4279, 4785, 5487, 6655, 7905)
    0x00A8 "TLS_PSK_WITH_AES_128_GCM_SHA256" Psk Psk Aes128 Gcm Sha256 Tls1_2 Tls1_2;
    0x00A9 "TLS_PSK_WITH_AES_256_GCM_SHA384" Psk Psk Aes256 Gcm Sha384 Tls1_2 Tls1_2;
    0xCCAB "TLS_PSK_WITH_CHACHA20_POLY1305_SHA256" Psk Psk ChaCha20 ChaCha20Poly1305 Sha256 Tls1_2 Tls1_2;
    0xC0A4 "TLS_PSK_WITH_AES_128_CCM" Psk Psk Aes128 Ccm Sha256 Tls1_2 Tls1_2;
    0xC0A5 "TLS_PSK_WITH_AES_256_CCM" Psk Psk Aes256 Ccm Sha256 Tls1_2 Tls1_2;
    0xC0A8 "TLS_PSK_WITH_AES_128_CCM_8" Psk Psk Aes128 Ccm8 Sha256 Tls1_2 Tls1_2;
    0xC0A9 "TLS_PSK_WITH_AES_256_CCM_8" Psk Psk Aes256 Ccm8 Sha256 Tls1_2 Tls1_2;
    0x00AE "TLS_PSK_WITH_AES_128_CBC_SHA256" Psk Psk Aes128 Cbc Sha256 Tls1_2 Tls1_2;
    0x00AF "TLS_PSK_WITH_AES_256_CBC_SHA384" Psk Psk Aes256 Cbc Sha384 Tls1_2 Tls1_2;
    0x008C "TLS_PSK_WITH_AES_128_CBC_SHA" Psk Psk Aes128 Cbc Sha1 Tls1_0 Tls1_2;
    0x008D "TLS_PSK_WITH_AES_256_CBC_SHA" Psk Psk Aes256 Cbc Sha1 Tls1_0 Tls1_2;
    0x008B "TLS_PSK_WITH_3DES_EDE_CBC_SHA" Psk Psk TripleDes Cbc Sha1 Tls1_0 Tls1_2;
    0x008A "TLS_PSK_WITH_RC4_128_SHA" Psk Psk Rc4_128 Stream Sha1 Tls1_0 Tls1_2;
    0x00B1 "TLS_PSK_WITH_NULL_SHA384" Psk Psk Null Null Sha384 Tls1_2 Tls1_2;
    0x00B0 "TLS_PSK_WITH_NULL_SHA256" Psk Psk Null Null Sha256 Tls1_2 Tls1_2;
    0x002C "TLS_PSK_WITH_NULL_SHA" Psk Psk Null Null Sha1 Tls1_0 Tls1_2;

    // DHE_PSK
    0x00AA "TLS_DHE_PSK_WITH_AES_128_GCM_SHA256" DhePsk Psk Aes128 Gcm Sha256 Tls1_2 Tls1_2;
    0x00AB "TLS_DHE_PSK_WITH_AES_256_GCM_SHA384" DhePsk Psk Aes256 Gcm Sha384 Tls1_2 Tls1_2;
    0xCCAD "TLS_DHE_PSK_WITH_CHACHA20_POLY1305_SHA256" DhePsk Psk ChaCha20 ChaCha20Poly1305 Sha256 Tls1_2 Tls1_2;
    0xC0A6 "TLS_DHE_PSK_WITH_AES_128_CCM" DhePsk Psk Aes128 Ccm Sha256 Tls1_2 Tls1_2;
    0xC0A7 "TLS_DHE_PSK_WITH_AES_256_CCM" DhePsk Psk Aes256 Ccm Sha256 Tls1_2 Tls1_2;
    0x00B2 "TLS_DHE_PSK_WITH_AES_128_CBC_SHA256" DhePsk Psk Aes128 Cbc Sha256 Tls1_2 Tls1_2;
    0x00B3 "TLS_DHE_PSK_WITH_AES_256_CBC_SHA384" DhePsk Psk Aes256 Cbc Sha384 Tls1_2 Tls1_2;
    0x0090 "TLS_DHE_PSK_WITH_AES_128_CBC_SHA" DhePsk Psk Aes128 Cbc Sha1 Tls1_0 Tls1_2;
    0x0091 "TLS_DHE_PSK_WITH_AES_256_CBC_SHA" DhePsk Psk Aes256 Cbc Sha1 Tls1_0 Tls1_2;
    0x008F "TLS_DHE_PSK_WITH_3DES_EDE_CBC_SHA" DhePsk Psk TripleDes Cbc Sha1 Tls1_0 Tls1_2;
    0x008E "TLS_DHE_PSK_WITH_RC4_128_SHA" DhePsk Psk Rc4_128 Stream Sha1 Tls1_0 Tls1_2;

    // ECDHE_PSK (RFC 5489, 8442)
    0xD001 "TLS_ECDHE_PSK_WITH_AES_128_GCM_SHA256" EcdhePsk Psk Aes128 Gcm Sha256 Tls1_2 Tls1_2;
    0xD002 "TLS_ECDHE_PSK_WITH_AES_256_GCM_SHA384" EcdhePsk Psk Aes256 Gcm Sha384 Tls1_2 Tls1_2;
    0xD003 "TLS_ECDHE_PSK_WITH_AES_128_CCM_8_SHA256" EcdhePsk Psk Aes128 Ccm8 Sha256 Tls1_2 Tls1_2;
    0xD005 "TLS_ECDHE_PSK_WITH_AES_128_CCM_SHA256" EcdhePsk Psk Aes128 Ccm Sha256 Tls1_2 Tls1_2;
    0xCCAC "TLS_ECDHE_PSK_WITH_CHACHA20_POLY1305_SHA256" EcdhePsk Psk ChaCha20 ChaCha20Poly1305 Sha256 Tls1_2 Tls1_2;
    0xC037 "TLS_ECDHE_PSK_WITH_AES_128_CBC_SHA256" EcdhePsk Psk Aes128 Cbc Sha256 Tls1_2 Tls1_2;
    0xC038 "TLS_ECDHE_PSK_WITH_AES_256_CBC_SHA384" EcdhePsk Psk Aes256 Cbc Sha384 Tls1_2 Tls1_2;
    0xC035 "TLS_ECDHE_PSK_WITH_AES_128_CBC_SHA" EcdhePsk Psk Aes128 Cbc Sha1 Tls1_0 Tls1_2;
    0xC036 "TLS_ECDHE_PSK_WITH_AES_256_CBC_SHA" EcdhePsk Psk Aes256 Cbc Sha1 Tls1_0 Tls1_2;
    0xC034 "TLS_ECDHE_PSK_WITH_3DES_EDE_CBC_SHA" EcdhePsk Psk TripleDes Cbc Sha1 Tls1_0 Tls1_2;
    0xC033 "TLS_ECDHE_PSK_WITH_RC4_128_SHA" EcdhePsk Psk Rc4_128 Stream Sha1 Tls1_0 Tls1_2;

    // RSA_PSK
    0x00AC "TLS_RSA_PSK_WITH_AES_128_GCM_SHA256" RsaPsk Rsa Aes128 Gcm Sha256 Tls1_2 Tls1_2;
    0x00AD "TLS_RSA_PSK_WITH_AES_256_GCM_SHA384" RsaPsk Rsa Aes256 Gcm Sha384 Tls1_2 Tls1_2;
    0xCCAE "TLS_RSA_PSK_WITH_CHACHA20_POLY1305_SHA256" RsaPsk Rsa ChaCha20 ChaCha20Poly1305 Sha256 Tls1_2 Tls1_2;
    0x00B6 "TLS_RSA_PSK_WITH_AES_128_CBC_SHA256" RsaPsk Rsa Aes128 Cbc Sha256 Tls1_2 Tls1_2;
    0x00B7 "TLS_RSA_PSK_WITH_AES_256_CBC_SHA384" RsaPsk Rsa Aes256 Cbc Sha384 Tls1_2 Tls1_2;
    0x0094 "TLS_RSA_PSK_WITH_AES_128_CBC_SHA" RsaPsk Rsa Aes128 Cbc Sha1 Tls1_0 Tls1_2;
    0x0095 "TLS_RSA_PSK_WITH_AES_256_CBC_SHA" RsaPsk Rsa Aes256 Cbc Sha1 Tls1_0 Tls1_2;
    0x0093 "TLS_RSA_PSK_WITH_3DES_EDE_CBC_SHA" RsaPsk Rsa TripleDes Cbc Sha1 Tls1_0 Tls1_2;
    0x0092 "TLS_RSA_PSK_WITH_RC4_128_SHA" RsaPsk Rsa Rc4_128 Stream Sha1 Tls1_0 Tls1_2;

    // SRP (RFC 5054)
    0xC01D "TLS_SRP_SHA_WITH_AES_128_CBC_SHA" Srp Srp Aes128 Cbc Sha1 Tls1_0 Tls1_2;
    0xC020 "TLS_SRP_SHA_WITH_AES_256_CBC_SHA" Srp Srp Aes256 Cbc Sha1 Tls1_0 Tls1_2;
    0xC01A "TLS_SRP_SHA_WITH_3DES_EDE_CBC_SHA" Srp Srp TripleDes Cbc Sha1 Tls1_0 Tls1_2;
    0xC01E "TLS_SRP_SHA_RSA_WITH_AES_128_CBC_SHA" SrpRsa Rsa Aes128 Cbc Sha1 Tls1_0 Tls1_2;
    0xC021 "TLS_SRP_SHA_RSA_WITH_AES_256_CBC_SHA" SrpRsa Rsa Aes256 Cbc Sha1 Tls1_0 Tls1_2;
    0xC01B "TLS_SRP_SHA_RSA_WITH_3DES_EDE_CBC_SHA" SrpRsa Rsa TripleDes Cbc Sha1 Tls1_0 Tls1_2;
    0xC01F "TLS_SRP_SHA_DSS_WITH_AES_128_CBC_SHA" SrpDss Dss Aes128 Cbc Sha1 Tls1_0 Tls1_2;
    0xC022 "TLS_SRP_SHA_DSS_WITH_AES_256_CBC_SHA" SrpDss Dss Aes256 Cbc Sha1 Tls1_0 Tls1_2;
    0xC01C "TLS_SRP_SHA_DSS_WITH_3DES_EDE_CBC_SHA" SrpDss Dss TripleDes Cbc Sha1 Tls1_0 Tls1_2;

    // KRB5 (RFC 2712)
    0x0020 "TLS_KRB5_WITH_RC4_128_SHA" Krb5 Krb5 Rc4_128 Stream Sha1 Tls1_0 Tls1_2;
    0x001F "TLS_KRB5_WITH_3DES_EDE_CBC_SHA" Krb5 Krb5 TripleDes Cbc Sha1 Tls1_0 Tls1_2;
    0x001E "TLS_KRB5_WITH_DES_CBC_SHA" Krb5 Krb5 Des Cbc Sha1 Tls1_0 Tls1_1;

    // ECCPWD (RFC 8492)
    0xC0B0 "TLS_ECCPWD_WITH_AES_128_GCM_SHA256" EccPwd EccPwd Aes128 Gcm Sha256 Tls1_2 Tls1_3;
    0xC0B1 "TLS_ECCPWD_WITH_AES_256_GCM_SHA384" EccPwd EccPwd Aes256 Gcm Sha384 Tls1_2 Tls1_3;
    0xC0B2 "TLS_ECCPWD_WITH_AES_128_CCM_SHA256" EccPwd EccPwd Aes128 Ccm Sha256 Tls1_2 Tls1_3;
    0xC0B3 "TLS_ECCPWD_WITH_AES_256_CCM_SHA384" EccPwd EccPwd Aes256 Ccm Sha384 Tls1_2 Tls1_3;

    // GOST (RFC 9189)
    0xC101 "TLS_GOSTR341112_256_WITH_MAGMA_CTR_OMAC" Gost Gost Magma CtrOmac Sha256 Tls1_2 Tls1_2;
};

static SENTINELS: &[CatalogEntry] = &[
    CatalogEntry::Sentinel { id: 0x00FF, name: "TLS_EMPTY_RENEGOTIATION_INFO_SCSV" },
    CatalogEntry::Sentinel { id: 0x5600, name: "TLS_FALLBACK_SCSV" },
    CatalogEntry::Sentinel { id: 0x0A0A, name: "GREASE_0A0A" },
    CatalogEntry::Sentinel { id: 0x1A1A, name: "GREASE_1A1A" },
    CatalogEntry::Sentinel { id: 0x2A2A, name: "GREASE_2A2A" },
    CatalogEntry::Sentinel { id: 0x3A3A, name: "GREASE_3A3A" },
    CatalogEntry::Sentinel { id: 0x4A4A, name: "GREASE_4A4A" },
    CatalogEntry::Sentinel { id: 0x5A5A, name: "GREASE_5A5A" },
    CatalogEntry::Sentinel { id: 0x6A6A, name: "GREASE_6A6A" },
    CatalogEntry::Sentinel { id: 0x7A7A, name: "GREASE_7A7A" },
    CatalogEntry::Sentinel { id: 0x8A8A, name: "GREASE_8A8A" },
    CatalogEntry::Sentinel { id: 0x9A9A, name: "GREASE_9A9A" },
    CatalogEntry::Sentinel { id: 0xAAAA, name: "GREASE_AAAA" },
    CatalogEntry::Sentinel { id: 0xBABA, name: "GREASE_BABA" },
    CatalogEntry::Sentinel { id: 0xCACA, name: "GREASE_CACA" },
    CatalogEntry::Sentinel { id: 0xDADA, name: "GREASE_DADA" },
    CatalogEntry::Sentinel { id: 0xEAEA, name: "GREASE_EAEA" },
    CatalogEntry::Sentinel { id: 0xFAFA, name: "GREASE_FAFA" },
];

pub const EMPTY_RENEGOTIATION_INFO_SCSV: u16 = 0x00FF;
pub const FALLBACK_SCSV: u16 = 0x5600;

/// Every catalog entry, suites in preference order followed by sentinels.
pub fn catalog() -> impl Iterator<Item = &'static CatalogEntry> {
    SUITES.iter().chain(SENTINELS.iter())
}

pub fn lookup(id: u16) -> Option<&'static CatalogEntry> {
    catalog().find(|e| e.id() == id)
}

/// The selection boundary: resolve a suite id that is about to become the
/// negotiated cipher.
///
/// Sentinels are an internal error (we should never have picked one), ids
/// that are not in the catalog at all are the peer's fault.
pub fn select(id: u16) -> Result<&'static CipherSuite, Error> {
    match lookup(id) {
        Some(CatalogEntry::Suite(s)) => Ok(s),
        Some(CatalogEntry::Sentinel { name, .. }) => Err(Error::internal(format!(
            "Signaling cipher suite {} can not be selected",
            name
        ))),
        None => {
            warn!("Unknown cipher suite selected: 0x{:04X}", id);
            Err(Error::fatal(crate::alert::AlertDescription::IllegalParameter))
        }
    }
}

pub fn is_sentinel(id: u16) -> bool {
    grease::is_grease(id) || matches!(lookup(id), Some(CatalogEntry::Sentinel { .. }))
}

/// Default suite ids offered when the configuration does not name any.
pub fn default_ids() -> Vec<u16> {
    vec![
        0x1301, 0x1302, 0x1303, // TLS 1.3
        0xC02B, 0xC02F, 0xC02C, 0xC030, 0xCCA9, 0xCCA8, // ECDHE AEAD
        0xC009, 0xC013, 0xC00A, 0xC014, // ECDHE CBC
        0x009C, 0x009D, 0x002F, 0x0035, // RSA
    ]
}
