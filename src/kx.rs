//! Key exchange: producing the pre-master secret.
//!
//! Every algorithm a cipher suite can name is listed in
//! [`KeyExchangeAlgorithm`]. The ones this crate cannot perform fail with
//! [`Error::NotImplemented`] rather than at catalog lookup, so the suites
//! still round-trip through ClientHello.

use std::fmt;

use der::{Decode, Encode};
use num_bigint::{BigUint, RandomBits};
use p256::ecdh::EphemeralSecret as P256EphemeralSecret;
use p384::ecdh::EphemeralSecret as P384EphemeralSecret;
use rand::distributions::Distribution;
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use subtle::{Choice, ConditionallySelectable};
use x509_cert::Certificate as X509Certificate;
use zeroize::Zeroizing;

use crate::alert::AlertDescription;
use crate::secret::Secret;
use crate::types::{NamedGroup, ProtocolVersion};
use crate::Error;

pub const RSA_PRE_MASTER_LEN: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyExchangeAlgorithm {
    Null,
    Rsa,
    DhRsa,
    DhDss,
    DheRsa,
    DheDss,
    DhAnon,
    EcdhEcdsa,
    EcdhRsa,
    EcdheEcdsa,
    EcdheRsa,
    EcdhAnon,
    Psk,
    DhePsk,
    EcdhePsk,
    RsaPsk,
    Srp,
    SrpRsa,
    SrpDss,
    /// GOST R 34.10-2012 (RFC 9189).
    Gost,
    Krb5,
    EccPwd,
    /// TLS 1.3 suites do not name a key exchange; key_share decides.
    Tls13,
}

impl KeyExchangeAlgorithm {
    pub fn name(&self) -> &'static str {
        use KeyExchangeAlgorithm::*;
        match self {
            Null => "NULL",
            Rsa => "RSA",
            DhRsa => "DH_RSA",
            DhDss => "DH_DSS",
            DheRsa => "DHE_RSA",
            DheDss => "DHE_DSS",
            DhAnon => "DH_anon",
            EcdhEcdsa => "ECDH_ECDSA",
            EcdhRsa => "ECDH_RSA",
            EcdheEcdsa => "ECDHE_ECDSA",
            EcdheRsa => "ECDHE_RSA",
            EcdhAnon => "ECDH_anon",
            Psk => "PSK",
            DhePsk => "DHE_PSK",
            EcdhePsk => "ECDHE_PSK",
            RsaPsk => "RSA_PSK",
            Srp => "SRP_SHA",
            SrpRsa => "SRP_SHA_RSA",
            SrpDss => "SRP_SHA_DSS",
            Gost => "GOSTR341112_256",
            Krb5 => "KRB5",
            EccPwd => "ECCPWD",
            Tls13 => "TLS13",
        }
    }

    /// Uses elliptic curve groups, so supported_groups/ec_point_formats apply.
    pub fn is_ecc(&self) -> bool {
        use KeyExchangeAlgorithm::*;
        matches!(
            self,
            EcdhEcdsa | EcdhRsa | EcdheEcdsa | EcdheRsa | EcdhAnon | EcdhePsk | EccPwd
        )
    }

    pub fn is_finite_field(&self) -> bool {
        use KeyExchangeAlgorithm::*;
        matches!(self, DhRsa | DhDss | DheRsa | DheDss | DhAnon | DhePsk)
    }

    /// Both sides contribute a key pair.
    pub fn is_key_agreement(&self) -> bool {
        (self.is_ecc() && *self != KeyExchangeAlgorithm::EccPwd) || self.is_finite_field()
    }

    pub fn is_psk(&self) -> bool {
        use KeyExchangeAlgorithm::*;
        matches!(self, Psk | DhePsk | EcdhePsk | RsaPsk)
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, KeyExchangeAlgorithm::DhAnon | KeyExchangeAlgorithm::EcdhAnon)
    }

    fn unsupported(&self) -> Option<&'static str> {
        use KeyExchangeAlgorithm::*;
        match self {
            Srp | SrpRsa | SrpDss => Some("SRP key exchange"),
            Gost => Some("GOST key exchange"),
            Krb5 => Some("Kerberos key exchange"),
            EccPwd => Some("ECCPWD key exchange"),
            _ => None,
        }
    }

    /// Client side: produce the pre-master secret and the ClientKeyExchange
    /// value (our public key, or the encrypted pre-master for RSA).
    pub fn client_pre_master(&self, input: ClientKxInput<'_>) -> Result<PreMaster, Error> {
        use KeyExchangeAlgorithm::*;

        if let Some(what) = self.unsupported() {
            return Err(Error::NotImplemented(what));
        }

        let pre_master = match self {
            Rsa => {
                let cert = required(input.peer_certificate, "server certificate")?;
                let (secret, encrypted) = rsa_encrypt_pre_master(input.version, cert)?;
                PreMaster {
                    secret,
                    exchange: encrypted,
                }
            }
            Psk => PreMaster {
                secret: psk_pre_master(None, required(input.psk, "PSK")?)?,
                exchange: Vec::new(),
            },
            RsaPsk => {
                let cert = required(input.peer_certificate, "server certificate")?;
                let (rsa, encrypted) = rsa_encrypt_pre_master(input.version, cert)?;
                let psk = required(input.psk, "PSK")?;
                PreMaster {
                    secret: psk_pre_master(Some(rsa.expose()?), psk)?,
                    exchange: encrypted,
                }
            }
            DhePsk | EcdhePsk => {
                let share = required(input.local_share, "local key share")?;
                let exchange = share.public_key().to_vec();
                let shared = share.agree(required(input.peer_public, "peer public key")?)?;
                PreMaster {
                    secret: psk_pre_master(Some(shared.expose()?), required(input.psk, "PSK")?)?,
                    exchange,
                }
            }
            _ if self.is_key_agreement() => {
                let share = required(input.local_share, "local key share")?;
                let exchange = share.public_key().to_vec();
                let secret = share.agree(required(input.peer_public, "peer public key")?)?;
                PreMaster { secret, exchange }
            }
            Tls13 => return Err(Error::internal("TLS 1.3 secrets come from key_share")),
            _ => return Err(Error::internal(format!("No pre-master for {}", self.name()))),
        };

        debug!("Client pre-master secret generated for {}", self.name());
        Ok(pre_master)
    }

    /// Server side: recover the pre-master secret from the client's exchange.
    pub fn server_pre_master(&self, input: ServerKxInput<'_>) -> Result<Secret, Error> {
        use KeyExchangeAlgorithm::*;

        if let Some(what) = self.unsupported() {
            return Err(Error::NotImplemented(what));
        }

        let secret = match self {
            Rsa => {
                let key = required(input.rsa_key, "RSA private key")?;
                rsa_decrypt_pre_master(key, input.client_version, input.exchange)
            }
            Psk => psk_pre_master(None, required(input.psk, "PSK")?)?,
            RsaPsk => {
                let key = required(input.rsa_key, "RSA private key")?;
                let rsa = rsa_decrypt_pre_master(key, input.client_version, input.exchange);
                psk_pre_master(Some(rsa.expose()?), required(input.psk, "PSK")?)?
            }
            DhePsk | EcdhePsk => {
                let share = required(input.local_share, "local key share")?;
                let shared = share.agree(input.exchange)?;
                psk_pre_master(Some(shared.expose()?), required(input.psk, "PSK")?)?
            }
            _ if self.is_key_agreement() => {
                let share = required(input.local_share, "local key share")?;
                share.agree(input.exchange)?
            }
            Tls13 => return Err(Error::internal("TLS 1.3 secrets come from key_share")),
            _ => return Err(Error::internal(format!("No pre-master for {}", self.name()))),
        };

        debug!("Server pre-master secret recovered for {}", self.name());
        Ok(secret)
    }
}

impl fmt::Display for KeyExchangeAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn required<T>(value: Option<T>, what: &str) -> Result<T, Error> {
    value.ok_or_else(|| Error::internal(format!("Key exchange is missing the {}", what)))
}

/// What the client has when computing its key exchange.
#[derive(Default)]
pub struct ClientKxInput<'a> {
    /// Highest version the client offered. Goes into the RSA pre-master.
    pub version: ProtocolVersion,
    pub local_share: Option<KeyShare>,
    /// Server public value, from ServerKeyExchange or the certificate.
    pub peer_public: Option<&'a [u8]>,
    /// DER certificate for RSA encryption.
    pub peer_certificate: Option<&'a [u8]>,
    pub psk: Option<&'a [u8]>,
}

/// What the server has when processing ClientKeyExchange.
pub struct ServerKxInput<'a> {
    /// The version from ClientHello, checked against the RSA pre-master.
    pub client_version: ProtocolVersion,
    pub local_share: Option<KeyShare>,
    /// The client's public value or encrypted pre-master.
    pub exchange: &'a [u8],
    pub rsa_key: Option<&'a RsaPrivateKey>,
    pub psk: Option<&'a [u8]>,
}

/// A client pre-master secret and the bytes that convey it to the server.
#[derive(Debug)]
pub struct PreMaster {
    pub secret: Secret,
    pub exchange: Vec<u8>,
}

/// PSK pre-master (RFC 4279 section 2, RFC 5489 section 2).
///
/// `uint16 len || other || uint16 len || psk`, where `other` is zeros of the
/// PSK length for plain PSK.
pub fn psk_pre_master(other: Option<&[u8]>, psk: &[u8]) -> Result<Secret, Error> {
    let zeros;
    let other = match other {
        Some(o) => o,
        None => {
            zeros = vec![0u8; psk.len()];
            &zeros
        }
    };

    let other_len = u16::try_from(other.len()).map_err(|_| Error::internal("PSK other secret too long"))?;
    let psk_len = u16::try_from(psk.len()).map_err(|_| Error::internal("PSK too long"))?;

    let mut out = Vec::with_capacity(4 + other.len() + psk.len());
    out.extend_from_slice(&other_len.to_be_bytes());
    out.extend_from_slice(other);
    out.extend_from_slice(&psk_len.to_be_bytes());
    out.extend_from_slice(psk);
    Ok(Secret::new(out))
}

/// Pull the RSA public key out of a DER certificate.
pub fn rsa_public_key_from_certificate(cert_der: &[u8]) -> Result<RsaPublicKey, Error> {
    let cert = X509Certificate::from_der(cert_der).map_err(|e| {
        warn!("Failed to parse certificate: {}", e);
        Error::fatal(AlertDescription::BadCertificate)
    })?;
    let spki = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| Error::internal(format!("Failed to encode SPKI: {}", e)))?;
    RsaPublicKey::from_public_key_der(&spki).map_err(|_| {
        warn!("Certificate does not carry an RSA key");
        Error::fatal(AlertDescription::UnsupportedCertificate)
    })
}

fn rsa_encrypt_pre_master(version: ProtocolVersion, cert_der: &[u8]) -> Result<(Secret, Vec<u8>), Error> {
    let public = rsa_public_key_from_certificate(cert_der)?;
    rsa_encrypt_pre_master_with(version, &public)
}

/// 48 bytes of `version || random(46)` encrypted with PKCS#1 v1.5.
pub fn rsa_encrypt_pre_master_with(
    version: ProtocolVersion,
    public: &RsaPublicKey,
) -> Result<(Secret, Vec<u8>), Error> {
    let mut pms = Zeroizing::new(vec![0u8; RSA_PRE_MASTER_LEN]);
    pms[0] = version.major();
    pms[1] = version.minor();
    OsRng.fill_bytes(&mut pms[2..]);

    let encrypted = public
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, &pms)
        .map_err(|e| Error::internal(format!("RSA encryption failed: {}", e)))?;

    Ok((Secret::from(pms), encrypted))
}

/// Decrypt an RSA pre-master, substituting a random one on any failure so
/// that a bad padding is indistinguishable from a good one (RFC 5246
/// section 7.4.7.1).
pub fn rsa_decrypt_pre_master(
    key: &RsaPrivateKey,
    client_version: ProtocolVersion,
    encrypted: &[u8],
) -> Secret {
    let mut fallback = Zeroizing::new([0u8; RSA_PRE_MASTER_LEN]);
    OsRng.fill_bytes(&mut fallback[..]);

    let decrypted = key.decrypt(Pkcs1v15Encrypt, encrypted).map(Zeroizing::new);
    let candidate = match &decrypted {
        Ok(d) if d.len() == RSA_PRE_MASTER_LEN => Some(d),
        _ => None,
    };
    let ok = Choice::from(candidate.is_some() as u8);

    let mut out = Zeroizing::new(vec![0u8; RSA_PRE_MASTER_LEN]);
    out[0] = client_version.major();
    out[1] = client_version.minor();
    for i in 2..RSA_PRE_MASTER_LEN {
        let real = candidate.map(|d| d[i]).unwrap_or(0);
        out[i] = u8::conditional_select(&fallback[i], &real, ok);
    }

    Secret::from(out)
}

enum ShareInner {
    X25519(x25519_dalek::EphemeralSecret),
    P256(P256EphemeralSecret),
    P384(P384EphemeralSecret),
    Dh { prime: BigUint, private: BigUint },
}

/// An ephemeral key pair for (EC)DH.
pub struct KeyShare {
    group: Option<NamedGroup>,
    public: Vec<u8>,
    inner: ShareInner,
}

impl KeyShare {
    /// Generate a key pair on a named group.
    pub fn generate(group: NamedGroup) -> Result<Self, Error> {
        let (inner, public) = match group {
            NamedGroup::X25519 => {
                let secret = x25519_dalek::EphemeralSecret::random_from_rng(OsRng);
                let public = x25519_dalek::PublicKey::from(&secret).as_bytes().to_vec();
                (ShareInner::X25519(secret), public)
            }
            NamedGroup::Secp256r1 => {
                use elliptic_curve::sec1::ToEncodedPoint;
                let secret = P256EphemeralSecret::random(&mut OsRng);
                let public = p256::PublicKey::from(&secret)
                    .to_encoded_point(false)
                    .as_bytes()
                    .to_vec();
                (ShareInner::P256(secret), public)
            }
            NamedGroup::Secp384r1 => {
                use elliptic_curve::sec1::ToEncodedPoint;
                let secret = P384EphemeralSecret::random(&mut OsRng);
                let public = p384::PublicKey::from(&secret)
                    .to_encoded_point(false)
                    .as_bytes()
                    .to_vec();
                (ShareInner::P384(secret), public)
            }
            _ => {
                return Err(Error::internal(format!(
                    "Cannot generate a key share for {:?}",
                    group
                )))
            }
        };

        Ok(KeyShare {
            group: Some(group),
            public,
            inner,
        })
    }

    /// Generate a finite field DH key pair from explicit parameters.
    pub fn generate_dh(prime: &[u8], generator: &[u8]) -> Result<Self, Error> {
        let prime = BigUint::from_bytes_be(prime);
        let generator = BigUint::from_bytes_be(generator);
        let bits = prime.bits();
        if bits < 16 || generator < BigUint::from(2u8) || generator >= prime {
            return Err(Error::fatal(AlertDescription::IllegalParameter));
        }

        let private: BigUint = RandomBits::new(bits - 1).sample(&mut OsRng);
        let public = generator.modpow(&private, &prime).to_bytes_be();

        Ok(KeyShare {
            group: None,
            public,
            inner: ShareInner::Dh { prime, private },
        })
    }

    /// The named group, `None` for explicit DH parameters.
    pub fn group(&self) -> Option<NamedGroup> {
        self.group
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public
    }

    /// Combine with the peer's public value, consuming the key pair.
    pub fn agree(self, peer_public: &[u8]) -> Result<Secret, Error> {
        let bad_key = || {
            warn!("Invalid peer public key for {:?}", self.group);
            Error::fatal(AlertDescription::IllegalParameter)
        };

        let shared = match &self.inner {
            ShareInner::X25519(_) => None,
            ShareInner::P256(secret) => {
                let peer = p256::PublicKey::from_sec1_bytes(peer_public).map_err(|_| bad_key())?;
                Some(secret.diffie_hellman(&peer).raw_secret_bytes().to_vec())
            }
            ShareInner::P384(secret) => {
                let peer = p384::PublicKey::from_sec1_bytes(peer_public).map_err(|_| bad_key())?;
                Some(secret.diffie_hellman(&peer).raw_secret_bytes().to_vec())
            }
            ShareInner::Dh { prime, private } => {
                let y = BigUint::from_bytes_be(peer_public);
                let one = BigUint::from(1u8);
                if y <= one || y >= prime - &one {
                    return Err(bad_key());
                }
                Some(y.modpow(private, prime).to_bytes_be())
            }
        };

        if let Some(shared) = shared {
            return Ok(Secret::new(shared));
        }

        // x25519 consumes its secret.
        let ShareInner::X25519(secret) = self.inner else {
            return Err(Error::internal("Key share state mismatch"));
        };
        let peer: [u8; 32] = peer_public.try_into().map_err(|_| {
            warn!("x25519 public key must be 32 bytes");
            Error::fatal(AlertDescription::IllegalParameter)
        })?;
        let shared = secret.diffie_hellman(&x25519_dalek::PublicKey::from(peer));
        if !shared.was_contributory() {
            warn!("Non-contributory x25519 public key");
            return Err(Error::fatal(AlertDescription::IllegalParameter));
        }
        Ok(Secret::from_slice(shared.as_bytes()))
    }
}

impl fmt::Debug for KeyShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyShare")
            .field("group", &self.group)
            .field("public_len", &self.public.len())
            .finish_non_exhaustive()
    }
}
