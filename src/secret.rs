//! Secrets and key derivation.
//!
//! Pre-master secret to master secret to key block for SSL 3.0 through
//! TLS 1.2, and the HKDF key schedule for TLS 1.3 / DTLS 1.3.

use std::fmt;

use zeroize::Zeroizing;

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::hkdf::{hkdf_expand_label, hkdf_extract};
use crate::crypto::prf::{prf_tls10, prf_tls12, ssl3_derive};
use crate::types::{Protocol, ProtocolVersion};
use crate::Error;

pub const MASTER_SECRET_LEN: usize = 48;

/// Secret key material that is zeroed on drop or on [`Secret::destroy`].
pub struct Secret {
    bytes: Option<Zeroizing<Vec<u8>>>,
}

impl Secret {
    pub fn new(bytes: Vec<u8>) -> Self {
        Secret {
            bytes: Some(Zeroizing::new(bytes)),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }

    /// The secret bytes. Using a destroyed secret is an internal error.
    pub fn expose(&self) -> Result<&[u8], Error> {
        self.bytes
            .as_deref()
            .map(|b| b.as_slice())
            .ok_or_else(|| Error::internal("Secret used after destroy"))
    }

    pub fn len(&self) -> usize {
        self.bytes.as_ref().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Zero the memory now rather than at drop.
    pub fn destroy(&mut self) {
        self.bytes = None;
    }

    pub fn is_destroyed(&self) -> bool {
        self.bytes.is_none()
    }
}

impl From<Zeroizing<Vec<u8>>> for Secret {
    fn from(value: Zeroizing<Vec<u8>>) -> Self {
        Secret { bytes: Some(value) }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("len", &self.len())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// Derive the 48 byte master secret, consuming the pre-master secret.
///
/// With a `session_hash` the extended master secret (RFC 7627) is derived.
/// The pre-master secret is destroyed whether or not derivation succeeds.
pub fn generate_master_secret(
    pre_master: &mut Secret,
    version: ProtocolVersion,
    prf_hash: HashAlgorithm,
    client_random: &[u8],
    server_random: &[u8],
    session_hash: Option<&[u8]>,
) -> Result<Secret, Error> {
    let result = derive_master(
        pre_master,
        version,
        prf_hash,
        client_random,
        server_random,
        session_hash,
    );
    pre_master.destroy();
    result
}

fn derive_master(
    pre_master: &Secret,
    version: ProtocolVersion,
    prf_hash: HashAlgorithm,
    client_random: &[u8],
    server_random: &[u8],
    session_hash: Option<&[u8]>,
) -> Result<Secret, Error> {
    let pms = pre_master.expose()?;

    let (label, seed) = match session_hash {
        Some(hash) => ("extended master secret", hash.to_vec()),
        None => {
            let mut seed = Vec::with_capacity(client_random.len() + server_random.len());
            seed.extend_from_slice(client_random);
            seed.extend_from_slice(server_random);
            ("master secret", seed)
        }
    };

    let master = match version {
        ProtocolVersion::Ssl3_0 => {
            if session_hash.is_some() {
                return Err(Error::internal("Extended master secret requires TLS 1.0 or later"));
            }
            ssl3_derive(pms, &seed, MASTER_SECRET_LEN)?
        }
        ProtocolVersion::Tls1_0 | ProtocolVersion::Tls1_1 | ProtocolVersion::Dtls1_0 => {
            prf_tls10(pms, label, &seed, MASTER_SECRET_LEN)?
        }
        ProtocolVersion::Tls1_2 | ProtocolVersion::Dtls1_2 => {
            prf_tls12(prf_hash, pms, label, &seed, MASTER_SECRET_LEN)?
        }
        v => {
            return Err(Error::internal(format!(
                "No PRF master secret for {}",
                v
            )))
        }
    };

    debug!("Derived {} for {}", label, version);
    Ok(master.into())
}

/// Compute the `verify_data` of a Finished message before TLS 1.3.
pub fn finished_verify_data(
    master: &Secret,
    version: ProtocolVersion,
    prf_hash: HashAlgorithm,
    label: &str,
    handshake_hash: &[u8],
) -> Result<Vec<u8>, Error> {
    let ms = master.expose()?;
    let out = match version {
        ProtocolVersion::Tls1_0 | ProtocolVersion::Tls1_1 | ProtocolVersion::Dtls1_0 => {
            prf_tls10(ms, label, handshake_hash, 12)?
        }
        ProtocolVersion::Tls1_2 | ProtocolVersion::Dtls1_2 => {
            prf_tls12(prf_hash, ms, label, handshake_hash, 12)?
        }
        v => return Err(Error::internal(format!("No PRF Finished for {}", v))),
    };
    Ok(out.to_vec())
}

/// SSL 3.0 Finished hashes (RFC 6101 section 5.6.9).
///
/// `sender` is `b"CLNT"` or `b"SRVR"`, `messages` the raw handshake messages.
pub fn ssl3_finished(master: &Secret, sender: &[u8; 4], messages: &[u8]) -> Result<Vec<u8>, Error> {
    let ms = master.expose()?;
    let mut out = Vec::with_capacity(36);
    for (hash, pad_len) in [(HashAlgorithm::Md5, 48), (HashAlgorithm::Sha1, 40)] {
        let mut inner = hash.new_hash();
        inner.update(messages);
        inner.update(sender);
        inner.update(ms);
        inner.update(&[0x36; 48][..pad_len]);
        let inner = inner.finalize();

        let mut outer = hash.new_hash();
        outer.update(ms);
        outer.update(&[0x5c; 48][..pad_len]);
        outer.update(&inner);
        out.extend_from_slice(&outer.finalize());
    }
    Ok(out)
}

/// Write keys for one direction.
pub struct DirectionKeys {
    pub mac: Zeroizing<Vec<u8>>,
    pub key: Zeroizing<Vec<u8>>,
    pub iv: Zeroizing<Vec<u8>>,
}

/// The key block split into client and server write keys.
pub struct SessionKeys {
    pub client: DirectionKeys,
    pub server: DirectionKeys,
}

/// Lengths of the pieces carved out of the key block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBlockLayout {
    pub mac_len: usize,
    pub key_len: usize,
    pub iv_len: usize,
}

impl KeyBlockLayout {
    pub fn total(&self) -> usize {
        2 * (self.mac_len + self.key_len + self.iv_len)
    }
}

impl SessionKeys {
    /// Expand the master secret into the key block (RFC 5246 section 6.3).
    pub fn derive(
        master: &Secret,
        version: ProtocolVersion,
        prf_hash: HashAlgorithm,
        client_random: &[u8],
        server_random: &[u8],
        layout: KeyBlockLayout,
    ) -> Result<Self, Error> {
        let ms = master.expose()?;

        // Note the reversed order compared to the master secret seed.
        let mut seed = Vec::with_capacity(client_random.len() + server_random.len());
        seed.extend_from_slice(server_random);
        seed.extend_from_slice(client_random);

        let total = layout.total();
        let block = match version {
            ProtocolVersion::Ssl3_0 => ssl3_derive(ms, &seed, total)?,
            ProtocolVersion::Tls1_0 | ProtocolVersion::Tls1_1 | ProtocolVersion::Dtls1_0 => {
                prf_tls10(ms, "key expansion", &seed, total)?
            }
            ProtocolVersion::Tls1_2 | ProtocolVersion::Dtls1_2 => {
                prf_tls12(prf_hash, ms, "key expansion", &seed, total)?
            }
            v => return Err(Error::internal(format!("No key block for {}", v))),
        };

        let mut rest: &[u8] = &block;
        let mut take = |n: usize| {
            let (head, tail) = rest.split_at(n);
            rest = tail;
            Zeroizing::new(head.to_vec())
        };

        let client_mac = take(layout.mac_len);
        let server_mac = take(layout.mac_len);
        let client_key = take(layout.key_len);
        let server_key = take(layout.key_len);
        let client_iv = take(layout.iv_len);
        let server_iv = take(layout.iv_len);

        Ok(SessionKeys {
            client: DirectionKeys {
                mac: client_mac,
                key: client_key,
                iv: client_iv,
            },
            server: DirectionKeys {
                mac: server_mac,
                key: server_key,
                iv: server_iv,
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Early,
    Handshake,
    Master,
}

/// TLS 1.3 key schedule (RFC 8446 section 7.1).
pub struct KeySchedule {
    hash: HashAlgorithm,
    protocol: Protocol,
    stage: Stage,
    secret: Zeroizing<Vec<u8>>,
}

impl KeySchedule {
    /// Start from the early secret, with or without a PSK.
    pub fn new(hash: HashAlgorithm, protocol: Protocol, psk: Option<&[u8]>) -> Result<Self, Error> {
        let zeros = vec![0u8; hash.output_len()];
        let ikm = psk.unwrap_or(&zeros);
        let secret = hkdf_extract(hash, &[], ikm)?;
        Ok(KeySchedule {
            hash,
            protocol,
            stage: Stage::Early,
            secret,
        })
    }

    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    /// The secret of the current stage.
    pub fn current_secret(&self) -> &[u8] {
        &self.secret
    }

    fn expand_label(&self, secret: &[u8], label: &str, context: &[u8], len: usize) -> Result<Zeroizing<Vec<u8>>, Error> {
        Ok(hkdf_expand_label(
            self.hash,
            self.protocol,
            secret,
            label.as_bytes(),
            context,
            len,
        )?)
    }

    /// `Derive-Secret(current, label, transcript_hash)`.
    pub fn derive_secret(&self, label: &str, transcript_hash: &[u8]) -> Result<Secret, Error> {
        let out = self.expand_label(&self.secret, label, transcript_hash, self.hash.output_len())?;
        Ok(out.into())
    }

    fn next(&mut self, ikm: &[u8], to: Stage) -> Result<(), Error> {
        let empty_hash = self.hash.digest(&[]);
        let derived = self.expand_label(&self.secret, "derived", &empty_hash, self.hash.output_len())?;
        self.secret = hkdf_extract(self.hash, &derived, ikm)?;
        self.stage = to;
        Ok(())
    }

    /// Mix in the (EC)DHE shared secret.
    pub fn into_handshake(&mut self, shared_secret: &[u8]) -> Result<(), Error> {
        if self.stage != Stage::Early {
            return Err(Error::internal("Key schedule is past the early stage"));
        }
        self.next(shared_secret, Stage::Handshake)?;
        debug!("TLS 1.3 handshake secret derived");
        Ok(())
    }

    pub fn into_master(&mut self) -> Result<(), Error> {
        if self.stage != Stage::Handshake {
            return Err(Error::internal("Key schedule is not at the handshake stage"));
        }
        let zeros = vec![0u8; self.hash.output_len()];
        self.next(&zeros, Stage::Master)?;
        debug!("TLS 1.3 master secret derived");
        Ok(())
    }

    /// Client and server traffic secrets for the current stage.
    pub fn traffic_secrets(&self, transcript_hash: &[u8]) -> Result<(Secret, Secret), Error> {
        let (c, s) = match self.stage {
            Stage::Handshake => ("c hs traffic", "s hs traffic"),
            Stage::Master => ("c ap traffic", "s ap traffic"),
            Stage::Early => return Err(Error::internal("No traffic secrets at the early stage")),
        };
        Ok((
            self.derive_secret(c, transcript_hash)?,
            self.derive_secret(s, transcript_hash)?,
        ))
    }

    /// Write key and IV from a traffic secret.
    pub fn traffic_keys(
        &self,
        traffic_secret: &Secret,
        key_len: usize,
        iv_len: usize,
    ) -> Result<DirectionKeys, Error> {
        let secret = traffic_secret.expose()?;
        Ok(DirectionKeys {
            mac: Zeroizing::new(Vec::new()),
            key: self.expand_label(secret, "key", &[], key_len)?,
            iv: self.expand_label(secret, "iv", &[], iv_len)?,
        })
    }

    /// `verify_data` for a TLS 1.3 Finished message.
    pub fn finished_verify_data(&self, base_key: &Secret, transcript_hash: &[u8]) -> Result<Vec<u8>, Error> {
        let finished_key = self.expand_label(base_key.expose()?, "finished", &[], self.hash.output_len())?;
        Ok(self.hash.hmac(&finished_key, &[transcript_hash])?)
    }
}

impl fmt::Debug for KeySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySchedule")
            .field("hash", &self.hash)
            .field("protocol", &self.protocol)
            .field("stage", &self.stage)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    fn master_secret(version: ProtocolVersion) -> Vec<u8> {
        let mut pms = Secret::new(vec![0x03; 48]);
        let ms = generate_master_secret(
            &mut pms,
            version,
            HashAlgorithm::Sha256,
            &[0x11; 32],
            &[0x22; 32],
            None,
        )
        .unwrap();
        assert!(pms.is_destroyed());
        ms.expose().unwrap().to_vec()
    }

    #[test]
    fn tls12_master_secret_vector() {
        assert_eq!(
            master_secret(ProtocolVersion::Tls1_2),
            hex(concat!(
                "7da031d00784132d923d018deb085aaa2303bd551494544ff687cf987cf48efe",
                "17f3cd6d3d9a0771800ee1cc9e137a21"
            ))
        );
    }

    #[test]
    fn tls10_master_secret_vector() {
        // MD5 and SHA-1 halves XORed.
        let expected = hex(concat!(
            "ffb77675db7aa5e645e5de96b26bc47127b3986d3b0d93831b190d4efec383c6",
            "43c795445e09068ffe2158baca9239d5"
        ));
        assert_eq!(master_secret(ProtocolVersion::Tls1_0), expected);
        assert_eq!(master_secret(ProtocolVersion::Tls1_1), expected);
    }

    #[test]
    fn extended_master_secret_differs() {
        let mut pms1 = Secret::new(vec![7; 48]);
        let mut pms2 = Secret::new(vec![7; 48]);
        let plain = generate_master_secret(&mut pms1, ProtocolVersion::Tls1_2, HashAlgorithm::Sha256, &[1; 32], &[2; 32], None).unwrap();
        let ems = generate_master_secret(
            &mut pms2,
            ProtocolVersion::Tls1_2,
            HashAlgorithm::Sha256,
            &[1; 32],
            &[2; 32],
            Some(&[9; 32]),
        )
        .unwrap();
        assert_ne!(plain.expose().unwrap(), ems.expose().unwrap());
    }

    #[test]
    fn every_prf_version_produces_48_bytes() {
        for version in [
            ProtocolVersion::Ssl3_0,
            ProtocolVersion::Tls1_0,
            ProtocolVersion::Tls1_1,
            ProtocolVersion::Dtls1_0,
            ProtocolVersion::Dtls1_2,
        ] {
            let mut pms = Secret::new(vec![5; 48]);
            let ms = generate_master_secret(&mut pms, version, HashAlgorithm::Sha256, &[1; 32], &[2; 32], None).unwrap();
            assert_eq!(ms.len(), 48, "{}", version);
        }
    }

    #[test]
    fn tls13_has_no_prf_master_secret() {
        let mut pms = Secret::new(vec![5; 32]);
        let err = generate_master_secret(&mut pms, ProtocolVersion::Tls1_3, HashAlgorithm::Sha256, &[1; 32], &[2; 32], None)
            .unwrap_err();
        assert!(err.is_internal());
        assert!(pms.is_destroyed());
    }

    #[test]
    fn destroyed_secret_is_internal_error() {
        let mut s = Secret::new(vec![1, 2, 3]);
        assert_eq!(s.expose().unwrap(), &[1, 2, 3]);
        s.destroy();
        assert!(s.expose().unwrap_err().is_internal());
    }

    #[test]
    fn key_block_split() {
        let ms = Secret::new(vec![0x42; 48]);
        let layout = KeyBlockLayout {
            mac_len: 20,
            key_len: 16,
            iv_len: 0,
        };
        let keys = SessionKeys::derive(&ms, ProtocolVersion::Tls1_2, HashAlgorithm::Sha256, &[1; 32], &[2; 32], layout).unwrap();
        assert_eq!(keys.client.mac.len(), 20);
        assert_eq!(keys.server.key.len(), 16);
        assert!(keys.client.iv.is_empty());
        assert_ne!(*keys.client.key, *keys.server.key);

        let block = prf_tls12(HashAlgorithm::Sha256, &[0x42; 48], "key expansion", &[[2u8; 32], [1u8; 32]].concat(), 72).unwrap();
        assert_eq!(&keys.client.mac[..], &block[..20]);
        assert_eq!(&keys.server.key[..], &block[56..72]);
    }

    #[test]
    fn tls13_early_and_derived_secrets() {
        // RFC 8448 section 3, no PSK.
        let ks = KeySchedule::new(HashAlgorithm::Sha256, Protocol::Tls, None).unwrap();
        assert_eq!(
            ks.current_secret(),
            &hex("33ad0a1c607ec03b09e6cd9893680ce210adf300aa1f2660e1b22e10f170f92a")[..]
        );

        let empty = HashAlgorithm::Sha256.digest(&[]);
        let derived = ks.derive_secret("derived", &empty).unwrap();
        assert_eq!(
            derived.expose().unwrap(),
            &hex("6f2615a108c702c5678f54fc9dbab69716c076189c48250cebeac3576c3611ba")[..]
        );
    }

    #[test]
    fn tls13_stages_in_order() {
        let mut ks = KeySchedule::new(HashAlgorithm::Sha384, Protocol::Dtls, None).unwrap();
        assert!(ks.traffic_secrets(&[0; 48]).is_err());
        assert!(ks.into_master().is_err());

        ks.into_handshake(&[9; 32]).unwrap();
        let (c, s) = ks.traffic_secrets(&[1; 48]).unwrap();
        assert_ne!(c.expose().unwrap(), s.expose().unwrap());

        let keys = ks.traffic_keys(&c, 32, 12).unwrap();
        assert_eq!(keys.key.len(), 32);
        assert_eq!(keys.iv.len(), 12);

        ks.into_master().unwrap();
        assert!(ks.into_handshake(&[9; 32]).is_err());
    }

    #[test]
    fn ssl3_finished_depends_on_sender() {
        let ms = Secret::from_slice(&[3; 48]);
        let client = ssl3_finished(&ms, b"CLNT", b"messages").unwrap();
        let server = ssl3_finished(&ms, b"SRVR", b"messages").unwrap();
        assert_eq!(client.len(), 36);
        assert_ne!(client, server);
    }
}
