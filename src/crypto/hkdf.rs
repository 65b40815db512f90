//! HKDF (RFC 5869) and the TLS 1.3 `HKDF-Expand-Label` (RFC 8446 section 7.1).

use hkdf::Hkdf;
use sha2::{Sha256, Sha384};
use zeroize::Zeroizing;

use super::hash::HashAlgorithm;
use crate::types::Protocol;

pub fn hkdf_extract(
    hash: HashAlgorithm,
    salt: &[u8],
    ikm: &[u8],
) -> Result<Zeroizing<Vec<u8>>, String> {
    let salt = if salt.is_empty() { None } else { Some(salt) };
    let prk = match hash {
        HashAlgorithm::Sha256 => Hkdf::<Sha256>::extract(salt, ikm).0.to_vec(),
        HashAlgorithm::Sha384 => Hkdf::<Sha384>::extract(salt, ikm).0.to_vec(),
        _ => return Err(format!("Unsupported hash for HKDF: {:?}", hash)),
    };
    Ok(Zeroizing::new(prk))
}

pub fn hkdf_expand(
    hash: HashAlgorithm,
    prk: &[u8],
    info: &[u8],
    output_len: usize,
) -> Result<Zeroizing<Vec<u8>>, String> {
    let mut output = Zeroizing::new(vec![0u8; output_len]);
    match hash {
        HashAlgorithm::Sha256 => Hkdf::<Sha256>::from_prk(prk)
            .map_err(|e| format!("Invalid PRK: {:?}", e))?
            .expand(info, &mut output)
            .map_err(|e| format!("HKDF expand failed: {:?}", e))?,
        HashAlgorithm::Sha384 => Hkdf::<Sha384>::from_prk(prk)
            .map_err(|e| format!("Invalid PRK: {:?}", e))?
            .expand(info, &mut output)
            .map_err(|e| format!("HKDF expand failed: {:?}", e))?,
        _ => return Err(format!("Unsupported hash for HKDF: {:?}", hash)),
    }
    Ok(output)
}

/// `HKDF-Expand-Label(secret, label, context, length)`.
///
/// TLS prefixes the label with `"tls13 "`, DTLS 1.3 with `"dtls13"`
/// (RFC 9147 section 5.9).
pub fn hkdf_expand_label(
    hash: HashAlgorithm,
    protocol: Protocol,
    secret: &[u8],
    label: &[u8],
    context: &[u8],
    output_len: usize,
) -> Result<Zeroizing<Vec<u8>>, String> {
    let prefix: &[u8] = match protocol {
        Protocol::Tls => b"tls13 ",
        Protocol::Dtls => b"dtls13",
    };

    let mut info = Vec::with_capacity(4 + prefix.len() + label.len() + context.len());
    info.extend_from_slice(&(output_len as u16).to_be_bytes());
    info.push((prefix.len() + label.len()) as u8);
    info.extend_from_slice(prefix);
    info.extend_from_slice(label);
    info.push(context.len() as u8);
    info.extend_from_slice(context);

    hkdf_expand(hash, secret, &info, output_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc5869_case_1() {
        let ikm = [0x0b; 22];
        let salt: Vec<u8> = (0x00..=0x0c).collect();
        let info: Vec<u8> = (0xf0..=0xf9).collect();

        let prk = hkdf_extract(HashAlgorithm::Sha256, &salt, &ikm).unwrap();
        assert_eq!(
            &prk[..8],
            &[0x07, 0x77, 0x09, 0x36, 0x2c, 0x2e, 0x32, 0xdf]
        );

        let okm = hkdf_expand(HashAlgorithm::Sha256, &prk, &info, 42).unwrap();
        assert_eq!(
            &okm[..8],
            &[0x3c, 0xb2, 0x5f, 0x25, 0xfa, 0xac, 0xd5, 0x7a]
        );
    }

    #[test]
    fn label_prefix_depends_on_protocol() {
        let secret = [1u8; 32];
        let tls = hkdf_expand_label(HashAlgorithm::Sha256, Protocol::Tls, &secret, b"key", &[], 16)
            .unwrap();
        let dtls =
            hkdf_expand_label(HashAlgorithm::Sha256, Protocol::Dtls, &secret, b"key", &[], 16)
                .unwrap();
        assert_eq!(tls.len(), 16);
        assert_ne!(tls, dtls);
    }

    #[test]
    fn rejects_md5() {
        assert!(hkdf_extract(HashAlgorithm::Md5, &[], &[1]).is_err());
    }
}
