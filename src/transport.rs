//! Narrow interfaces to the collaborators around the protocol core.
//!
//! The core never touches sockets. A [`Transport`] moves bytes, a
//! [`CertificateValidator`] decides whether a peer certificate chain is
//! acceptable.

use std::fmt;

use crate::context::{Mode, NegotiationContext};
use crate::record::{Record, RecordLayer};
use crate::Error;

/// Where a connection goes. Also the fallback for server_name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    host: String,
    port: u16,
}

impl Address {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Address {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// A byte pipe supplied by the transport layer.
///
/// Implementations may block. `read` returning `0` means the peer closed.
pub trait Transport {
    fn connect(&mut self, address: &Address) -> Result<(), Error>;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error>;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Error>;

    fn close(&mut self) -> Result<(), Error>;

    fn set_read_buffer_size(&mut self, size: usize) -> Result<(), Error>;

    fn set_write_buffer_size(&mut self, size: usize) -> Result<(), Error>;

    fn set_keep_alive(&mut self, keep_alive: bool) -> Result<(), Error>;
}

/// Write all of `data`, retrying short writes.
pub fn write_all(transport: &mut dyn Transport, mut data: &[u8]) -> Result<(), Error> {
    while !data.is_empty() {
        let n = transport.write(data)?;
        if n == 0 {
            return Err(Error::Transport(std::io::ErrorKind::WriteZero.into()));
        }
        data = &data[n..];
    }
    Ok(())
}

/// Read until `buffer` holds a complete record, then open it.
///
/// Bytes after the record stay in `buffer`. `None` means the peer closed the
/// transport between records.
pub fn read_record(
    transport: &mut dyn Transport,
    records: &mut RecordLayer,
    buffer: &mut Vec<u8>,
) -> Result<Option<Record>, Error> {
    let mut chunk = [0u8; 4096];
    loop {
        let (consumed, record) = records.open(buffer)?;
        if consumed > 0 {
            buffer.drain(..consumed);
            if record.is_some() {
                return Ok(record);
            }
            continue;
        }

        let n = transport.read(&mut chunk)?;
        if n == 0 {
            if buffer.is_empty() {
                return Ok(None);
            }
            warn!("Transport closed inside a record");
            return Err(Error::Transport(std::io::ErrorKind::UnexpectedEof.into()));
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
}

/// Decides whether a peer's certificate chain is acceptable.
///
/// Chains are DER certificates, leaf first. On success the leaf is returned,
/// and its public key is what key exchange and signature checks use.
pub trait CertificateValidator: Send + Sync {
    fn validate(
        &self,
        ctx: &NegotiationContext,
        source: Mode,
        chain: &[Vec<u8>],
    ) -> Result<Vec<u8>, Error>;
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::types::{ContentType, Protocol};

    /// Loopback transport handing out at most `max_read` bytes per read.
    struct Loopback {
        data: VecDeque<u8>,
        max_read: usize,
        max_write: usize,
    }

    impl Transport for Loopback {
        fn connect(&mut self, _address: &Address) -> Result<(), Error> {
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
            let n = buf.len().min(self.max_read).min(self.data.len());
            for b in buf.iter_mut().take(n) {
                *b = self.data.pop_front().unwrap();
            }
            Ok(n)
        }

        fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
            let n = buf.len().min(self.max_write);
            self.data.extend(&buf[..n]);
            Ok(n)
        }

        fn close(&mut self) -> Result<(), Error> {
            Ok(())
        }

        fn set_read_buffer_size(&mut self, _size: usize) -> Result<(), Error> {
            Ok(())
        }

        fn set_write_buffer_size(&mut self, _size: usize) -> Result<(), Error> {
            Ok(())
        }

        fn set_keep_alive(&mut self, _keep_alive: bool) -> Result<(), Error> {
            Ok(())
        }
    }

    #[test]
    fn records_survive_short_reads_and_writes() {
        let mut transport = Loopback {
            data: VecDeque::new(),
            max_read: 3,
            max_write: 2,
        };
        let mut sender = RecordLayer::new(Protocol::Tls);
        let mut receiver = RecordLayer::new(Protocol::Tls);

        let mut wire = sender.seal(ContentType::Handshake, b"hello").unwrap();
        wire.extend(sender.seal(ContentType::Alert, &[1, 0]).unwrap());
        write_all(&mut transport, &wire).unwrap();

        let mut buffer = Vec::new();
        let first = read_record(&mut transport, &mut receiver, &mut buffer)
            .unwrap()
            .unwrap();
        assert_eq!(first.content_type, ContentType::Handshake);
        assert_eq!(first.data, b"hello");

        let second = read_record(&mut transport, &mut receiver, &mut buffer)
            .unwrap()
            .unwrap();
        assert_eq!(second.content_type, ContentType::Alert);

        assert!(read_record(&mut transport, &mut receiver, &mut buffer)
            .unwrap()
            .is_none());
    }

    #[test]
    fn address_display() {
        assert_eq!(Address::new("example.com", 443).to_string(), "example.com:443");
        assert_eq!(Address::new("::1", 8443).to_string(), "[::1]:8443");
    }
}
