//! Pseudo-random functions for SSL 3.0 through TLS 1.2.

use zeroize::Zeroizing;

use super::hash::{Hash, HashAlgorithm};

/// P_hash from RFC 5246 section 5.
///
/// `P_hash(secret, seed) = HMAC(secret, A(1) + seed) + HMAC(secret, A(2) + seed) + ...`
/// with `A(0) = seed` and `A(i) = HMAC(secret, A(i-1))`.
pub fn p_hash(
    hash: HashAlgorithm,
    secret: &[u8],
    seed: &[u8],
    output_len: usize,
) -> Result<Zeroizing<Vec<u8>>, String> {
    let keyed = hash.new_hmac(secret)?;
    let mut out = Zeroizing::new(Vec::with_capacity(output_len + hash.output_len()));

    // A(1)
    let mut a = {
        let mut m = keyed.clone();
        m.update(seed);
        Zeroizing::new(m.finalize())
    };

    while out.len() < output_len {
        let mut m = keyed.clone();
        m.update(&a);
        m.update(seed);
        let block = Zeroizing::new(m.finalize());

        let to_copy = (output_len - out.len()).min(block.len());
        out.extend_from_slice(&block[..to_copy]);

        if out.len() < output_len {
            let mut m = keyed.clone();
            m.update(&a);
            a = Zeroizing::new(m.finalize());
        }
    }

    Ok(out)
}

fn full_seed(label: &str, seed: &[u8]) -> Vec<u8> {
    let mut full = Vec::with_capacity(label.len() + seed.len());
    full.extend_from_slice(label.as_bytes());
    full.extend_from_slice(seed);
    full
}

/// TLS 1.2 PRF: `P_<hash>(secret, label + seed)`.
pub fn prf_tls12(
    hash: HashAlgorithm,
    secret: &[u8],
    label: &str,
    seed: &[u8],
    output_len: usize,
) -> Result<Zeroizing<Vec<u8>>, String> {
    p_hash(hash, secret, &full_seed(label, seed), output_len)
}

/// TLS 1.0/1.1 PRF (RFC 2246 section 5).
///
/// The secret is split in two halves (sharing the middle byte when its length
/// is odd), then `P_MD5(S1, label + seed) XOR P_SHA1(S2, label + seed)`.
pub fn prf_tls10(
    secret: &[u8],
    label: &str,
    seed: &[u8],
    output_len: usize,
) -> Result<Zeroizing<Vec<u8>>, String> {
    let half = secret.len().div_ceil(2);
    let s1 = &secret[..half];
    let s2 = &secret[secret.len() - half..];

    let seed = full_seed(label, seed);
    let mut out = p_hash(HashAlgorithm::Md5, s1, &seed, output_len)?;
    let sha = p_hash(HashAlgorithm::Sha1, s2, &seed, output_len)?;

    for (o, s) in out.iter_mut().zip(sha.iter()) {
        *o ^= s;
    }

    Ok(out)
}

/// SSL 3.0 key derivation (RFC 6101 section 6.1/6.2.2).
///
/// `MD5(secret + SHA1("A" + secret + seed)) + MD5(secret + SHA1("BB" + secret + seed)) + ...`
pub fn ssl3_derive(secret: &[u8], seed: &[u8], output_len: usize) -> Result<Zeroizing<Vec<u8>>, String> {
    // 26 letters of 16 bytes cover every key block SSL 3.0 suites need.
    if output_len > 26 * 16 {
        return Err(format!("SSL 3.0 derivation cannot produce {} bytes", output_len));
    }

    let mut out = Zeroizing::new(Vec::with_capacity(output_len + 16));
    let mut i = 0u8;
    while out.len() < output_len {
        let letter = b'A' + i;
        let salt = vec![letter; i as usize + 1];

        let mut sha = Hash::new(HashAlgorithm::Sha1);
        sha.update(&salt);
        sha.update(secret);
        sha.update(seed);
        let inner = Zeroizing::new(sha.finalize());

        let mut md5 = Hash::new(HashAlgorithm::Md5);
        md5.update(secret);
        md5.update(&inner);
        out.extend_from_slice(&md5.finalize());

        i += 1;
    }
    out.truncate(output_len);

    Ok(out)
}
