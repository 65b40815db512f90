//! Record authentication state.
//!
//! An [`Authenticator`] owns the sequence number of one direction of a
//! connection and builds the associated data that MACs and AEAD tags cover.

use std::fmt;

use arrayvec::ArrayVec;
use zeroize::Zeroizing;

use crate::crypto::hash::{ssl3_mac, HashAlgorithm};
use crate::types::{ContentType, ProtocolVersion};
use crate::Error;

/// Record MAC algorithm for non-AEAD ciphers.
pub enum RecordMac {
    /// HMAC as defined from TLS 1.0 onwards.
    Hmac {
        hash: HashAlgorithm,
        key: Zeroizing<Vec<u8>>,
    },
    /// The SSL 3.0 pad1/pad2 construction.
    Ssl3 {
        hash: HashAlgorithm,
        key: Zeroizing<Vec<u8>>,
    },
}

impl RecordMac {
    pub fn new(version: ProtocolVersion, hash: HashAlgorithm, key: &[u8]) -> Result<Self, Error> {
        if key.len() != hash.output_len() {
            return Err(Error::InvalidKeyLength {
                expected: hash.output_len(),
                actual: key.len(),
            });
        }
        let key = Zeroizing::new(key.to_vec());
        if version == ProtocolVersion::Ssl3_0 {
            Ok(RecordMac::Ssl3 { hash, key })
        } else {
            Ok(RecordMac::Hmac { hash, key })
        }
    }

    pub fn hash(&self) -> HashAlgorithm {
        match self {
            RecordMac::Hmac { hash, .. } | RecordMac::Ssl3 { hash, .. } => *hash,
        }
    }

    pub fn length(&self) -> usize {
        self.hash().output_len()
    }

    fn compute(&self, parts: &[&[u8]]) -> Result<Vec<u8>, Error> {
        let mac = match self {
            RecordMac::Hmac { hash, key } => hash.hmac(key, parts)?,
            RecordMac::Ssl3 { hash, key } => ssl3_mac(*hash, key, parts)?,
        };
        Ok(mac)
    }
}

/// Shape of the associated-data block, fixed by the protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// seq(8) type(1) length(2)
    Ssl3,
    /// seq(8) type(1) version(2) length(2), epoch in the first two seq bytes for DTLS
    Tls,
    /// type(1) legacy_version(2) length(2), sequence only feeds the nonce
    Tls13,
}

pub struct Authenticator {
    version: ProtocolVersion,
    shape: Shape,
    block: ArrayVec<u8, 13>,
    mac: Option<RecordMac>,
    mac_computations: usize,
}

impl Authenticator {
    pub fn new(version: ProtocolVersion, mac: Option<RecordMac>) -> Self {
        let shape = if version == ProtocolVersion::Ssl3_0 {
            Shape::Ssl3
        } else if version.is_tls13() {
            Shape::Tls13
        } else {
            Shape::Tls
        };

        let len = match shape {
            Shape::Ssl3 => 11,
            Shape::Tls => 13,
            Shape::Tls13 => 8,
        };

        let mut block = ArrayVec::new();
        for _ in 0..len {
            block.push(0);
        }
        if shape == Shape::Tls {
            block[9] = version.major();
            block[10] = version.minor();
        }

        Authenticator {
            version,
            shape,
            block,
            mac,
            mac_computations: 0,
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Length of the sequence+header block for this version.
    pub fn block_len(&self) -> usize {
        self.block.len()
    }

    pub fn mac(&self) -> Option<&RecordMac> {
        self.mac.as_ref()
    }

    pub fn mac_length(&self) -> usize {
        self.mac.as_ref().map(|m| m.length()).unwrap_or(0)
    }

    /// The 8 sequence bytes that the next record will use.
    ///
    /// For DTLS the first two bytes are the epoch.
    pub fn sequence_number(&self) -> [u8; 8] {
        let mut seq = [0u8; 8];
        seq.copy_from_slice(&self.block[..8]);
        seq
    }

    fn counter_range(&self) -> std::ops::Range<usize> {
        if self.version.is_dtls() {
            2..8
        } else {
            0..8
        }
    }

    /// True once every sequence byte is `0xFF`.
    pub fn is_exhausted(&self) -> bool {
        self.block[self.counter_range()].iter().all(|b| *b == 0xFF)
    }

    pub fn increase_sequence_number(&mut self) -> Result<(), Error> {
        if self.is_exhausted() {
            return Err(Error::internal("Sequence number exhausted"));
        }
        for i in self.counter_range().rev() {
            let (v, carry) = self.block[i].overflowing_add(1);
            self.block[i] = v;
            if !carry {
                break;
            }
        }
        Ok(())
    }

    /// Set the DTLS epoch and restart the sequence at zero.
    pub fn set_epoch(&mut self, epoch: u16) -> Result<(), Error> {
        if !self.version.is_dtls() {
            return Err(Error::internal("Epochs only exist in DTLS"));
        }
        self.block[..2].copy_from_slice(&epoch.to_be_bytes());
        for b in &mut self.block[2..8] {
            *b = 0;
        }
        Ok(())
    }

    pub fn epoch(&self) -> u16 {
        u16::from_be_bytes([self.block[0], self.block[1]])
    }

    /// Build the associated data for one record.
    ///
    /// With an explicit sequence (received DTLS records) the counter is left
    /// alone, otherwise the current sequence is used and then advanced.
    pub fn create_authentication_block(
        &mut self,
        content_type: ContentType,
        length: usize,
        explicit_sequence: Option<&[u8; 8]>,
    ) -> Result<ArrayVec<u8, 13>, Error> {
        let seq = match explicit_sequence {
            Some(s) => *s,
            None => {
                let s = self.sequence_number();
                self.increase_sequence_number()?;
                s
            }
        };

        let length = u16::try_from(length)
            .map_err(|_| Error::internal(format!("Record length {} overflows", length)))?;

        let mut ad = ArrayVec::new();
        match self.shape {
            Shape::Ssl3 => {
                ad.try_extend_from_slice(&seq).ok();
                ad.push(content_type.as_u8());
                ad.try_extend_from_slice(&length.to_be_bytes()).ok();
            }
            Shape::Tls => {
                ad.try_extend_from_slice(&seq).ok();
                ad.push(content_type.as_u8());
                ad.push(self.version.major());
                ad.push(self.version.minor());
                ad.try_extend_from_slice(&length.to_be_bytes()).ok();
            }
            Shape::Tls13 => {
                ad.push(content_type.as_u8());
                ad.push(0x03);
                ad.push(0x03);
                ad.try_extend_from_slice(&length.to_be_bytes()).ok();
            }
        }

        Ok(ad)
    }

    /// MAC `associated_data || content`.
    pub fn compute_mac(&mut self, associated_data: &[u8], content: &[u8]) -> Result<Vec<u8>, Error> {
        let mac = self
            .mac
            .as_ref()
            .ok_or_else(|| Error::internal("Authenticator has no MAC"))?;
        self.mac_computations += 1;
        mac.compute(&[associated_data, content])
    }

    /// Run the MAC over `len` throwaway bytes, discarding the result.
    pub(crate) fn simulate_mac(&mut self, len: usize) -> Result<(), Error> {
        let ad = [0u8; 13];
        let ad_len = self.block.len().min(13);
        let filler = vec![0u8; len];
        self.compute_mac(&ad[..ad_len], &filler).map(|_| ())
    }

    /// Number of MAC computations performed so far.
    pub fn mac_computations(&self) -> usize {
        self.mac_computations
    }

    #[cfg(test)]
    pub(crate) fn set_sequence_for_test(&mut self, seq: [u8; 8]) {
        self.block[..8].copy_from_slice(&seq);
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("version", &self.version)
            .field("sequence", &self.sequence_number())
            .field("mac", &self.mac.as_ref().map(|m| m.hash()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_u64(seq: [u8; 8]) -> u64 {
        u64::from_be_bytes(seq)
    }

    #[test]
    fn sequence_counts_up() {
        let mut auth = Authenticator::new(ProtocolVersion::Tls1_2, None);
        for _ in 0..1000 {
            auth.increase_sequence_number().unwrap();
        }
        assert_eq!(as_u64(auth.sequence_number()), 1000);
    }

    #[test]
    fn sequence_carries_across_bytes() {
        let mut auth = Authenticator::new(ProtocolVersion::Tls1_2, None);
        auth.set_sequence_for_test([0, 0, 0, 0, 0, 0, 0, 0xFF]);
        auth.increase_sequence_number().unwrap();
        assert_eq!(auth.sequence_number(), [0, 0, 0, 0, 0, 0, 1, 0]);
    }

    #[test]
    fn sequence_overflow_is_internal_error() {
        let mut auth = Authenticator::new(ProtocolVersion::Tls1_2, None);
        auth.set_sequence_for_test([0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE]);
        auth.increase_sequence_number().unwrap();
        assert!(auth.is_exhausted());

        let err = auth.increase_sequence_number().unwrap_err();
        assert!(err.is_internal());
        // Never wraps
        assert_eq!(auth.sequence_number(), [0xFF; 8]);
    }

    #[test]
    fn dtls_overflow_ignores_epoch() {
        let mut auth = Authenticator::new(ProtocolVersion::Dtls1_2, None);
        auth.set_epoch(3).unwrap();
        auth.set_sequence_for_test([0, 3, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(auth.is_exhausted());
        assert!(auth.increase_sequence_number().is_err());
        assert_eq!(auth.epoch(), 3);
    }

    #[test]
    fn set_epoch_resets_sequence() {
        let mut auth = Authenticator::new(ProtocolVersion::Dtls1_2, None);
        auth.increase_sequence_number().unwrap();
        auth.set_epoch(1).unwrap();
        assert_eq!(auth.sequence_number(), [0, 1, 0, 0, 0, 0, 0, 0]);
        assert!(Authenticator::new(ProtocolVersion::Tls1_2, None)
            .set_epoch(1)
            .is_err());
    }

    #[test]
    fn tls12_block() {
        let mut auth = Authenticator::new(ProtocolVersion::Tls1_2, None);
        let ad = auth
            .create_authentication_block(ContentType::ApplicationData, 0x0123, None)
            .unwrap();
        assert_eq!(
            &ad[..],
            &[
                0, 0, 0, 0, 0, 0, 0, 0, // sequence
                23, // type
                0x03, 0x03, // version
                0x01, 0x23, // length
            ]
        );
        assert_eq!(as_u64(auth.sequence_number()), 1);
    }

    #[test]
    fn ssl3_block_has_no_version() {
        let mut auth = Authenticator::new(ProtocolVersion::Ssl3_0, None);
        let ad = auth
            .create_authentication_block(ContentType::Handshake, 5, None)
            .unwrap();
        assert_eq!(ad.len(), 11);
        assert_eq!(&ad[8..], &[22, 0, 5]);
    }

    #[test]
    fn tls13_block_is_five_bytes() {
        let mut auth = Authenticator::new(ProtocolVersion::Tls1_3, None);
        auth.increase_sequence_number().unwrap();
        let ad = auth
            .create_authentication_block(ContentType::ApplicationData, 0x20, None)
            .unwrap();
        assert_eq!(&ad[..], &[23, 0x03, 0x03, 0x00, 0x20]);
        assert_eq!(as_u64(auth.sequence_number()), 2);
    }

    #[test]
    fn explicit_sequence_does_not_advance() {
        let mut auth = Authenticator::new(ProtocolVersion::Dtls1_2, None);
        let explicit = [0, 1, 0, 0, 0, 0, 0, 9];
        let ad = auth
            .create_authentication_block(ContentType::ApplicationData, 4, Some(&explicit))
            .unwrap();
        assert_eq!(&ad[..8], &explicit);
        assert_eq!(&ad[9..11], &[0xFE, 0xFD]);
        assert_eq!(as_u64(auth.sequence_number()), 0);
    }

    #[test]
    fn mac_key_length_checked() {
        assert!(RecordMac::new(ProtocolVersion::Tls1_2, HashAlgorithm::Sha1, &[0; 19]).is_err());
        let mac = RecordMac::new(ProtocolVersion::Ssl3_0, HashAlgorithm::Md5, &[0; 16]).unwrap();
        assert!(matches!(mac, RecordMac::Ssl3 { .. }));
    }
}
