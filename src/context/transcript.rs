use crate::crypto::hash::HashAlgorithm;
use crate::message::handshake::Header;
use crate::types::{Protocol, ProtocolVersion};

/// Running record of the handshake messages, kept unhashed.
///
/// The hash algorithm and even the header shape (DTLS 1.0/1.2 hash the full
/// 12 byte header, DTLS 1.3 the TLS style one) are only known after
/// ServerHello, so messages are rendered on demand.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<(Header, Vec<u8>)>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, header: Header, body: &[u8]) {
        self.messages.push((header, body.to_vec()));
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The messages as hashed for `version`.
    pub fn bytes(&self, version: ProtocolVersion) -> Vec<u8> {
        let protocol = if version.is_dtls() && !version.is_tls13() {
            Protocol::Dtls
        } else {
            Protocol::Tls
        };
        let mut out = Vec::new();
        for (header, body) in &self.messages {
            let mut h = *header;
            h.fragment_offset = 0;
            h.fragment_length = h.length;
            h.serialize(protocol, &mut out);
            out.extend_from_slice(body);
        }
        out
    }

    pub fn hash(&self, version: ProtocolVersion, hash: HashAlgorithm) -> Vec<u8> {
        hash.digest(&self.bytes(version))
    }

    /// Session/handshake hash for the PRF based versions.
    ///
    /// MD5 || SHA-1 before TLS 1.2, the suite PRF hash from TLS 1.2 on.
    pub fn prf_hash(&self, version: ProtocolVersion, prf_hash: HashAlgorithm) -> Vec<u8> {
        let bytes = self.bytes(version);
        if version.uses_suite_prf() {
            prf_hash.digest(&bytes)
        } else {
            let mut out = HashAlgorithm::Md5.digest(&bytes);
            out.extend_from_slice(&HashAlgorithm::Sha1.digest(&bytes));
            out
        }
    }
}
