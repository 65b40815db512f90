//! Signatures over ServerKeyExchange parameters.
//!
//! A server signs with its RSA key, PKCS#1 v1.5 or PSS as the negotiated
//! scheme asks. A client verifies RSA and ECDSA (P-256, P-384) signatures
//! with the key of the validated server certificate.

use der::{Decode, Encode};
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use pkcs8::DecodePublicKey;
use rand::rngs::OsRng;
use rsa::{Pkcs1v15Sign, Pss, RsaPrivateKey, RsaPublicKey};
use x509_cert::Certificate as X509Certificate;

use crate::alert::AlertDescription;
use crate::crypto::hash::HashAlgorithm;
use crate::types::SignatureScheme;
use crate::Error;

/// Public key of a peer certificate.
#[derive(Debug, Clone)]
pub enum PeerKey {
    Rsa(RsaPublicKey),
    P256(p256::ecdsa::VerifyingKey),
    P384(p384::ecdsa::VerifyingKey),
}

impl PeerKey {
    pub fn from_certificate(cert_der: &[u8]) -> Result<PeerKey, Error> {
        let cert = X509Certificate::from_der(cert_der).map_err(|e| {
            warn!("Failed to parse certificate: {}", e);
            Error::fatal(AlertDescription::BadCertificate)
        })?;
        let spki = cert
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| Error::internal(format!("Failed to encode SPKI: {}", e)))?;

        if let Ok(key) = RsaPublicKey::from_public_key_der(&spki) {
            return Ok(PeerKey::Rsa(key));
        }
        if let Ok(key) = p256::ecdsa::VerifyingKey::from_public_key_der(&spki) {
            return Ok(PeerKey::P256(key));
        }
        if let Ok(key) = p384::ecdsa::VerifyingKey::from_public_key_der(&spki) {
            return Ok(PeerKey::P384(key));
        }
        warn!("Unsupported certificate key");
        Err(Error::fatal(AlertDescription::UnsupportedCertificate))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Padding {
    Pkcs1,
    Pss,
    Ecdsa,
}

/// Hash and signature family of a TLS 1.2 scheme.
fn scheme_parts(scheme: SignatureScheme) -> Option<(HashAlgorithm, Padding)> {
    use SignatureScheme::*;
    let parts = match scheme {
        RsaPkcs1Sha1 => (HashAlgorithm::Sha1, Padding::Pkcs1),
        RsaPkcs1Sha256 => (HashAlgorithm::Sha256, Padding::Pkcs1),
        RsaPkcs1Sha384 => (HashAlgorithm::Sha384, Padding::Pkcs1),
        RsaPkcs1Sha512 => (HashAlgorithm::Sha512, Padding::Pkcs1),
        RsaPssRsaeSha256 => (HashAlgorithm::Sha256, Padding::Pss),
        RsaPssRsaeSha384 => (HashAlgorithm::Sha384, Padding::Pss),
        RsaPssRsaeSha512 => (HashAlgorithm::Sha512, Padding::Pss),
        EcdsaSha1 => (HashAlgorithm::Sha1, Padding::Ecdsa),
        EcdsaSecp256r1Sha256 => (HashAlgorithm::Sha256, Padding::Ecdsa),
        EcdsaSecp384r1Sha384 => (HashAlgorithm::Sha384, Padding::Ecdsa),
        EcdsaSecp521r1Sha512 => (HashAlgorithm::Sha512, Padding::Ecdsa),
        _ => return None,
    };
    Some(parts)
}

/// Whether an RSA server key can produce `scheme`.
pub fn can_sign_rsa(scheme: SignatureScheme) -> bool {
    matches!(
        scheme_parts(scheme),
        Some((_, Padding::Pkcs1)) | Some((_, Padding::Pss))
    )
}

fn pkcs1(hash: HashAlgorithm) -> Result<Pkcs1v15Sign, Error> {
    Ok(match hash {
        HashAlgorithm::Sha1 => Pkcs1v15Sign::new::<sha1::Sha1>(),
        HashAlgorithm::Sha256 => Pkcs1v15Sign::new::<sha2::Sha256>(),
        HashAlgorithm::Sha384 => Pkcs1v15Sign::new::<sha2::Sha384>(),
        HashAlgorithm::Sha512 => Pkcs1v15Sign::new::<sha2::Sha512>(),
        h => return Err(Error::internal(format!("No PKCS#1 encoding for {:?}", h))),
    })
}

fn pss(hash: HashAlgorithm) -> Result<Pss, Error> {
    Ok(match hash {
        HashAlgorithm::Sha256 => Pss::new::<sha2::Sha256>(),
        HashAlgorithm::Sha384 => Pss::new::<sha2::Sha384>(),
        HashAlgorithm::Sha512 => Pss::new::<sha2::Sha512>(),
        h => return Err(Error::internal(format!("No PSS encoding for {:?}", h))),
    })
}

/// MD5 || SHA-1, signed without a DigestInfo prefix before TLS 1.2.
fn legacy_digest(data: &[u8]) -> Vec<u8> {
    let mut digest = HashAlgorithm::Md5.digest(data);
    digest.extend_from_slice(&HashAlgorithm::Sha1.digest(data));
    digest
}

/// Sign `data` with an RSA key.
///
/// `None` is the pre TLS 1.2 signature over MD5 || SHA-1.
pub fn sign_rsa(
    key: &RsaPrivateKey,
    scheme: Option<SignatureScheme>,
    data: &[u8],
) -> Result<Vec<u8>, Error> {
    let signed = match scheme {
        None => key.sign(Pkcs1v15Sign::new_unprefixed(), &legacy_digest(data)),
        Some(scheme) => match scheme_parts(scheme) {
            Some((hash, Padding::Pkcs1)) => key.sign(pkcs1(hash)?, &hash.digest(data)),
            Some((hash, Padding::Pss)) => key.sign_with_rng(&mut OsRng, pss(hash)?, &hash.digest(data)),
            _ => {
                return Err(Error::internal(format!(
                    "Can not sign {:?} with an RSA key",
                    scheme
                )))
            }
        },
    };
    signed.map_err(|e| Error::internal(format!("RSA signing failed: {}", e)))
}

fn bad_signature() -> Error {
    warn!("Server key exchange signature does not verify");
    Error::fatal(AlertDescription::DecryptError)
}

/// Verify a signature made by the peer.
///
/// `None` is the pre TLS 1.2 form: MD5 || SHA-1 for RSA, SHA-1 for ECDSA.
pub fn verify(
    key: &PeerKey,
    scheme: Option<SignatureScheme>,
    data: &[u8],
    signature: &[u8],
) -> Result<(), Error> {
    let parts = match scheme {
        Some(s) => Some(scheme_parts(s).ok_or_else(|| {
            warn!("Unsupported signature scheme {:?}", s);
            Error::fatal(AlertDescription::IllegalParameter)
        })?),
        None => None,
    };

    match key {
        PeerKey::Rsa(public) => {
            let result = match parts {
                None => public.verify(Pkcs1v15Sign::new_unprefixed(), &legacy_digest(data), signature),
                Some((hash, Padding::Pkcs1)) => public.verify(pkcs1(hash)?, &hash.digest(data), signature),
                Some((hash, Padding::Pss)) => public.verify(pss(hash)?, &hash.digest(data), signature),
                Some((_, Padding::Ecdsa)) => {
                    warn!("ECDSA signature from an RSA certificate");
                    return Err(Error::fatal(AlertDescription::IllegalParameter));
                }
            };
            result.map_err(|_| bad_signature())
        }
        PeerKey::P256(_) | PeerKey::P384(_) => {
            let hash = match parts {
                None => HashAlgorithm::Sha1,
                Some((hash, Padding::Ecdsa)) => hash,
                Some(_) => {
                    warn!("RSA signature from an ECDSA certificate");
                    return Err(Error::fatal(AlertDescription::IllegalParameter));
                }
            };
            let digest = hash.digest(data);
            let ok = match key {
                PeerKey::P256(vk) => p256::ecdsa::Signature::from_der(signature)
                    .map(|sig| vk.verify_prehash(&digest, &sig).is_ok())
                    .unwrap_or(false),
                PeerKey::P384(vk) => p384::ecdsa::Signature::from_der(signature)
                    .map(|sig| vk.verify_prehash(&digest, &sig).is_ok())
                    .unwrap_or(false),
                PeerKey::Rsa(_) => false,
            };
            if ok {
                Ok(())
            } else {
                Err(bad_signature())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> RsaPrivateKey {
        RsaPrivateKey::new(&mut OsRng, 1024).unwrap()
    }

    #[test]
    fn rsa_schemes_verify() {
        let private = key();
        let public = PeerKey::Rsa(RsaPublicKey::from(&private));
        let data = b"client_random server_random params";

        for scheme in [
            None,
            Some(SignatureScheme::RsaPkcs1Sha1),
            Some(SignatureScheme::RsaPkcs1Sha256),
            Some(SignatureScheme::RsaPssRsaeSha256),
        ] {
            let sig = sign_rsa(&private, scheme, data).unwrap();
            verify(&public, scheme, data, &sig).unwrap();

            let err = verify(&public, scheme, b"tampered", &sig).unwrap_err();
            assert_eq!(err.alert().description, AlertDescription::DecryptError);
        }
    }

    #[test]
    fn ecdsa_scheme_against_rsa_key_is_illegal() {
        let private = key();
        let public = PeerKey::Rsa(RsaPublicKey::from(&private));
        let err = verify(&public, Some(SignatureScheme::EcdsaSecp256r1Sha256), b"x", &[0; 8]).unwrap_err();
        assert_eq!(err.alert().description, AlertDescription::IllegalParameter);
    }

    #[test]
    fn p256_prehash_verifies() {
        use p256::ecdsa::signature::hazmat::PrehashSigner;
        use p256::ecdsa::{Signature, SigningKey};

        let signing = SigningKey::random(&mut OsRng);
        let public = PeerKey::P256(*signing.verifying_key());
        let data = b"params";
        let digest = HashAlgorithm::Sha256.digest(data);
        let sig: Signature = signing.sign_prehash(&digest).unwrap();
        let der = sig.to_der();

        verify(&public, Some(SignatureScheme::EcdsaSecp256r1Sha256), data, der.as_bytes()).unwrap();
        assert!(verify(&public, Some(SignatureScheme::EcdsaSecp256r1Sha256), b"other", der.as_bytes()).is_err());
    }

    #[test]
    fn only_rsa_schemes_are_signable() {
        assert!(can_sign_rsa(SignatureScheme::RsaPkcs1Sha256));
        assert!(can_sign_rsa(SignatureScheme::RsaPssRsaeSha384));
        assert!(!can_sign_rsa(SignatureScheme::EcdsaSecp256r1Sha256));
        assert!(!can_sign_rsa(SignatureScheme::Ed25519));
    }
}
