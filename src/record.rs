//! Record layer: fragmenting, protecting and framing records.
//!
//! Each direction starts in plaintext. Keys derived during the handshake are
//! staged as *pending* and switched to by [`RecordLayer::activate_write`] /
//! [`RecordLayer::activate_read`], which is what ChangeCipherSpec does below
//! TLS 1.3. A DTLS activation also moves to the next epoch.

use std::fmt;

use crate::alert::AlertDescription;
use crate::crypto::mode::{CipherMode, RecordMetadata};
use crate::message::record::{parse_record, MAX_CIPHERTEXT_LEN, MAX_FRAGMENT_LEN};
use crate::message::RecordHeader;
use crate::types::{ContentType, Protocol, ProtocolVersion};
use crate::Error;

/// A received record after protection was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub content_type: ContentType,
    pub data: Vec<u8>,
}

#[derive(Default)]
struct Direction {
    mode: Option<CipherMode>,
    pending: Option<CipherMode>,
    epoch: u16,
    /// Sequence for unprotected DTLS records.
    plain_sequence: u64,
}

impl Direction {
    fn activate(&mut self, protocol: Protocol) -> Result<(), Error> {
        let mut mode = self
            .pending
            .take()
            .ok_or_else(|| Error::internal("No pending cipher state"))?;
        if protocol == Protocol::Dtls {
            self.epoch = self
                .epoch
                .checked_add(1)
                .ok_or_else(|| Error::internal("Epoch exhausted"))?;
            mode.authenticator_mut().set_epoch(self.epoch)?;
        }
        self.mode = Some(mode);
        Ok(())
    }
}

pub struct RecordLayer {
    protocol: Protocol,
    version: ProtocolVersion,
    max_fragment_len: usize,
    write: Direction,
    read: Direction,
}

impl RecordLayer {
    pub fn new(protocol: Protocol) -> Self {
        let version = match protocol {
            Protocol::Tls => ProtocolVersion::Tls1_0,
            Protocol::Dtls => ProtocolVersion::Dtls1_0,
        };
        RecordLayer {
            protocol,
            version,
            max_fragment_len: MAX_FRAGMENT_LEN,
            write: Direction::default(),
            read: Direction::default(),
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Version written into record headers. TLS 1.3 writes its legacy version.
    pub fn set_version(&mut self, version: ProtocolVersion) {
        self.version = version.legacy();
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Limit plaintext fragments in both directions.
    pub fn set_max_fragment_len(&mut self, len: usize) {
        self.max_fragment_len = len.min(MAX_FRAGMENT_LEN);
    }

    pub fn max_fragment_len(&self) -> usize {
        self.max_fragment_len
    }

    pub fn set_pending_write(&mut self, mode: CipherMode) {
        self.write.pending = Some(mode);
    }

    pub fn set_pending_read(&mut self, mode: CipherMode) {
        self.read.pending = Some(mode);
    }

    pub fn activate_write(&mut self) -> Result<(), Error> {
        self.write.activate(self.protocol)?;
        debug!("Write protection active, epoch {}", self.write.epoch);
        Ok(())
    }

    pub fn activate_read(&mut self) -> Result<(), Error> {
        self.read.activate(self.protocol)?;
        debug!("Read protection active, epoch {}", self.read.epoch);
        Ok(())
    }

    pub fn is_write_protected(&self) -> bool {
        self.write.mode.is_some()
    }

    pub fn is_read_protected(&self) -> bool {
        self.read.mode.is_some()
    }

    /// Keys are staged for writing but not yet switched to.
    pub fn is_write_pending(&self) -> bool {
        self.write.pending.is_some()
    }

    pub fn is_read_pending(&self) -> bool {
        self.read.pending.is_some()
    }

    /// Fragment, protect and frame `data` into one or more records.
    pub fn seal(&mut self, content_type: ContentType, data: &[u8]) -> Result<Vec<u8>, Error> {
        let mut out = Vec::with_capacity(data.len() + 64);
        if data.is_empty() {
            self.seal_fragment(content_type, data, &mut out)?;
        }
        for chunk in data.chunks(self.max_fragment_len) {
            self.seal_fragment(content_type, chunk, &mut out)?;
        }
        Ok(out)
    }

    fn seal_fragment(
        &mut self,
        content_type: ContentType,
        plaintext: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<(), Error> {
        let (outer_type, sequence, fragment) = match &mut self.write.mode {
            Some(mode) => {
                let sequence = mode.authenticator().sequence_number();
                let fragment = mode.encrypt(content_type, plaintext)?;
                let outer_type = if mode.authenticator().version().is_tls13() {
                    ContentType::ApplicationData
                } else {
                    content_type
                };
                (outer_type, sequence, fragment)
            }
            None => {
                let sequence = self.write.plain_sequence.to_be_bytes();
                self.write.plain_sequence += 1;
                (content_type, sequence, plaintext.to_vec())
            }
        };

        if fragment.len() > MAX_CIPHERTEXT_LEN {
            return Err(Error::internal(format!(
                "Protected fragment of {} bytes",
                fragment.len()
            )));
        }

        let mut seq = [0u8; 8];
        seq[2..].copy_from_slice(&sequence[2..]);
        let header = RecordHeader {
            content_type: outer_type,
            version: self.version,
            epoch: u16::from_be_bytes([sequence[0], sequence[1]]),
            sequence_number: u64::from_be_bytes(seq),
            length: fragment.len() as u16,
        };
        header.serialize(self.protocol, out);
        out.extend_from_slice(&fragment);

        trace!(
            "Sealed {:?} record, {} -> {} bytes",
            content_type,
            plaintext.len(),
            fragment.len()
        );
        Ok(())
    }

    /// Open the record at the front of `input`.
    ///
    /// Returns the number of bytes consumed and the record. Zero bytes consumed
    /// means more input is needed. DTLS records from another epoch are
    /// consumed and discarded as `None`.
    pub fn open(&mut self, input: &[u8]) -> Result<(usize, Option<Record>), Error> {
        let (body, header) = match RecordHeader::parse(input, self.protocol) {
            Ok(parsed) => parsed,
            // Header not complete yet.
            Err(_) => return Ok((0, None)),
        };

        if header.length as usize > MAX_CIPHERTEXT_LEN {
            warn!("Record of {} bytes exceeds the ciphertext limit", header.length);
            return Err(Error::fatal(AlertDescription::RecordOverflow));
        }
        if body.len() < header.length as usize {
            return Ok((0, None));
        }
        let (_, (header, fragment)) = parse_record(input, self.protocol)?;
        let consumed = RecordHeader::len(self.protocol) + fragment.len();

        if self.protocol == Protocol::Dtls && header.epoch != self.read.epoch {
            debug!(
                "Discarding record from epoch {} in epoch {}",
                header.epoch, self.read.epoch
            );
            return Ok((consumed, None));
        }

        let record = match &mut self.read.mode {
            // A TLS 1.3 peer may still send a plaintext change_cipher_spec.
            Some(mode)
                if !(header.content_type == ContentType::ChangeCipherSpec
                    && mode.authenticator().version().is_tls13()) =>
            {
                let metadata = RecordMetadata {
                    content_type: header.content_type,
                    explicit_sequence: (self.protocol == Protocol::Dtls)
                        .then(|| header.explicit_sequence()),
                };
                let (content_type, data) = mode.decrypt(&metadata, fragment)?;
                Record { content_type, data }
            }
            _ => Record {
                content_type: header.content_type,
                data: fragment.to_vec(),
            },
        };

        if record.data.len() > self.max_fragment_len {
            warn!(
                "Record plaintext of {} bytes over the {} limit",
                record.data.len(),
                self.max_fragment_len
            );
            return Err(Error::fatal(AlertDescription::RecordOverflow));
        }

        trace!(
            "Opened {:?} record, {} -> {} bytes",
            record.content_type,
            fragment.len(),
            record.data.len()
        );
        Ok((consumed, Some(record)))
    }
}

impl fmt::Debug for RecordLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordLayer")
            .field("protocol", &self.protocol)
            .field("version", &self.version)
            .field("write_epoch", &self.write.epoch)
            .field("read_epoch", &self.read.epoch)
            .field("write_protected", &self.write.mode.is_some())
            .field("read_protected", &self.read.mode.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plaintext_tls_record() {
        let mut layer = RecordLayer::new(Protocol::Tls);
        layer.set_version(ProtocolVersion::Tls1_2);
        let out = layer.seal(ContentType::Handshake, &[1, 2, 3]).unwrap();
        assert_eq!(out, vec![0x16, 0x03, 0x03, 0x00, 0x03, 1, 2, 3]);

        let (consumed, record) = layer.open(&out).unwrap();
        assert_eq!(consumed, out.len());
        assert_eq!(
            record,
            Some(Record {
                content_type: ContentType::Handshake,
                data: vec![1, 2, 3]
            })
        );
    }

    #[test]
    fn fragments_at_limit() {
        let mut layer = RecordLayer::new(Protocol::Tls);
        layer.set_max_fragment_len(512);
        let out = layer.seal(ContentType::ApplicationData, &[0xAB; 1000]).unwrap();
        // 512 + 488 bytes, each behind a 5 byte header
        assert_eq!(out.len(), 1000 + 2 * 5);
        assert_eq!(&out[3..5], &512u16.to_be_bytes());
    }

    #[test]
    fn oversized_plaintext_is_record_overflow() {
        let mut sender = RecordLayer::new(Protocol::Tls);
        let out = sender.seal(ContentType::ApplicationData, &[0; 600]).unwrap();

        let mut receiver = RecordLayer::new(Protocol::Tls);
        receiver.set_max_fragment_len(512);
        let err = receiver.open(&out).unwrap_err();
        assert_eq!(err.alert().description, AlertDescription::RecordOverflow);
    }

    #[test]
    fn oversized_ciphertext_rejected_from_header() {
        let mut layer = RecordLayer::new(Protocol::Tls);
        let header = [0x17, 0x03, 0x03, 0x4E, 0x20]; // 20000 bytes
        let err = layer.open(&header).unwrap_err();
        assert_eq!(err.alert().description, AlertDescription::RecordOverflow);
    }

    #[test]
    fn partial_record_needs_more() {
        let mut layer = RecordLayer::new(Protocol::Tls);
        let out = layer.seal(ContentType::Handshake, &[1, 2, 3]).unwrap();
        assert_eq!(layer.open(&out[..6]).unwrap(), (0, None));
        assert_eq!(layer.open(&out[..3]).unwrap(), (0, None));
    }

    #[test]
    fn dtls_plaintext_sequence_advances() {
        let mut layer = RecordLayer::new(Protocol::Dtls);
        layer.seal(ContentType::Handshake, &[1]).unwrap();
        let out = layer.seal(ContentType::Handshake, &[2]).unwrap();
        assert_eq!(
            out,
            vec![
                0x16, // handshake
                0xFE, 0xFF, // DTLS 1.0
                0x00, 0x00, // epoch
                0x00, 0x00, 0x00, 0x00, 0x00, 0x01, // sequence
                0x00, 0x01, // length
                0x02
            ]
        );
    }

    #[test]
    fn activate_without_pending_is_internal() {
        let mut layer = RecordLayer::new(Protocol::Tls);
        assert!(layer.activate_write().unwrap_err().is_internal());
    }
}
