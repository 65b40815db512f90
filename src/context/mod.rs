//! Per connection negotiation state.
//!
//! A [`NegotiationContext`] keeps what this side offered (the *negotiable*
//! properties) apart from what both sides settled on (the *negotiated* ones).
//! Extensions write into it while hellos are built and processed, and the
//! handshake steps read from it to run the key exchange and switch the record
//! layer to the derived keys.
//!
//! The handshake is driven one message at a time. Outbound steps return the
//! sealed record bytes to hand to the transport. Inbound steps take one
//! complete handshake message, header included, as opened from a record.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use nom::IResult;

use crate::alert::AlertDescription;
use crate::config::Config;
use crate::message::handshake::{self, Header};
use crate::message::{Extension, MessageType};
use crate::record::{Record, RecordLayer};
use crate::secret::{KeySchedule, Secret};
use crate::suite::CipherSuite;
use crate::transport::Address;
use crate::types::{ContentType, ExtensionType, Protocol, ProtocolVersion};
use crate::Error;

mod exchange;
mod hello;
pub mod property;
mod state;
mod transcript;

pub use property::{KeyShareEntry, Property, PropertyMap};
pub use state::ConnectionState;
pub use transcript::Transcript;

use property::{CIPHER, VERSION};

/// Which end of the connection this context is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Client,
    Server,
}

impl Mode {
    pub fn peer(self) -> Mode {
        match self {
            Mode::Client => Mode::Server,
            Mode::Server => Mode::Client,
        }
    }
}

pub struct NegotiationContext {
    mode: Mode,
    config: Arc<Config>,
    address: Option<Address>,
    local: ConnectionState,
    remote: Option<ConnectionState>,
    negotiable: PropertyMap,
    negotiated: PropertyMap,
    transcript: Transcript,
    sent_extensions: Vec<ExtensionType>,
    send_seq: u16,
    /// ClientHello.client_version. Checked inside the RSA pre-master.
    offered_version: Option<ProtocolVersion>,
    key_schedule: Option<KeySchedule>,
    /// TLS 1.3 client and server handshake traffic secrets.
    handshake_secrets: Option<(Secret, Secret)>,
    /// Server side TLS 1.3 extensions held back from ServerHello.
    encrypted_extensions: Option<Vec<Extension>>,
    records: RecordLayer,
}

impl NegotiationContext {
    pub fn new(mode: Mode, config: Arc<Config>) -> Self {
        let protocol = config.highest_version().protocol();
        NegotiationContext {
            mode,
            config,
            address: None,
            local: ConnectionState::default(),
            remote: None,
            negotiable: PropertyMap::new(),
            negotiated: PropertyMap::new(),
            transcript: Transcript::new(),
            sent_extensions: Vec::new(),
            send_seq: 0,
            offered_version: None,
            key_schedule: None,
            handshake_secrets: None,
            encrypted_extensions: None,
            records: RecordLayer::new(protocol),
        }
    }

    /// The peer address, used as the server name when none is configured.
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    #[inline(always)]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[inline(always)]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_arc(&self) -> Arc<Config> {
        self.config.clone()
    }

    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    pub fn protocol(&self) -> Protocol {
        self.records.protocol()
    }

    pub fn local(&self) -> &ConnectionState {
        &self.local
    }

    pub fn local_mut(&mut self) -> &mut ConnectionState {
        &mut self.local
    }

    /// The peer's state, once its hello was seen.
    pub fn remote(&self) -> Option<&ConnectionState> {
        self.remote.as_ref()
    }

    pub fn remote_mut(&mut self) -> &mut ConnectionState {
        self.remote.get_or_insert_with(ConnectionState::default)
    }

    /// Record what this side offers for `property`, replacing any earlier offer.
    pub fn add_negotiable<I, O>(&mut self, property: &Property<I, O>, value: I)
    where
        I: Any + Send + Sync,
    {
        trace!("Offering {}", property.name());
        self.negotiable.insert(property.name(), value);
    }

    pub fn negotiable<I: Any, O>(&self, property: &Property<I, O>) -> Option<&I> {
        self.negotiable.get(property.name())
    }

    /// Record the agreed value for `property`.
    ///
    /// A property is negotiated once. A second attempt is an internal error.
    pub fn add_negotiated<I, O>(&mut self, property: &Property<I, O>, value: O) -> Result<(), Error>
    where
        O: Any + Send + Sync + fmt::Debug,
    {
        if self.negotiated.contains(property.name()) {
            return Err(Error::internal(format!(
                "Property {} negotiated twice",
                property.name()
            )));
        }
        debug!("Negotiated {}: {:?}", property.name(), value);
        self.negotiated.insert(property.name(), value);
        Ok(())
    }

    pub fn negotiated<I, O: Any>(&self, property: &Property<I, O>) -> Option<&O> {
        self.negotiated.get(property.name())
    }

    /// A negotiated value the handshake can not continue without.
    pub fn negotiated_value<I, O: Any>(&self, property: &Property<I, O>) -> Result<&O, Error> {
        self.negotiated(property).ok_or_else(|| {
            Error::internal(format!("Property {} is not negotiated", property.name()))
        })
    }

    pub fn is_negotiated<I, O>(&self, property: &Property<I, O>) -> bool {
        self.negotiated.contains(property.name())
    }

    /// Whether a flag property was negotiated as `true`.
    pub fn flag(&self, property: &Property<bool, bool>) -> bool {
        self.negotiated(property).copied().unwrap_or(false)
    }

    pub fn version(&self) -> Option<ProtocolVersion> {
        self.negotiated(&VERSION).copied()
    }

    pub fn cipher(&self) -> Option<&'static CipherSuite> {
        self.negotiated(&CIPHER).copied()
    }

    /// Versions the extensions in the next hello are configured for.
    ///
    /// Once a version is negotiated that is the only candidate. Before that a
    /// client considers everything it offers and a server nothing.
    pub fn candidate_versions(&self) -> Vec<ProtocolVersion> {
        if let Some(v) = self.version() {
            return vec![v];
        }
        match self.mode {
            Mode::Client => self
                .negotiable(&VERSION)
                .cloned()
                .unwrap_or_else(|| self.config.versions().to_vec()),
            Mode::Server => Vec::new(),
        }
    }

    /// Whether this client sent an extension, and so accepts it back.
    pub fn was_sent(&self, extension_type: ExtensionType) -> bool {
        self.sent_extensions.contains(&extension_type)
    }

    pub fn mark_sent(&mut self, extension_type: ExtensionType) {
        if !self.was_sent(extension_type) {
            self.sent_extensions.push(extension_type);
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn records(&self) -> &RecordLayer {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut RecordLayer {
        &mut self.records
    }

    /// Seal application data (or an alert) with the current write keys.
    pub fn seal(&mut self, content_type: ContentType, data: &[u8]) -> Result<Vec<u8>, Error> {
        self.records.seal(content_type, data)
    }

    /// Open the record at the front of `input`. See [`RecordLayer::open`].
    pub fn open(&mut self, input: &[u8]) -> Result<(usize, Option<Record>), Error> {
        self.records.open(input)
    }

    /// Route one handshake message to its processing step.
    pub fn process_handshake(&mut self, message: &[u8]) -> Result<MessageType, Error> {
        let (_, (header, _)) = handshake::unwrap(message, self.protocol()).map_err(|_| {
            warn!("Malformed handshake message");
            Error::fatal(AlertDescription::DecodeError)
        })?;
        let msg_type = header.msg_type;

        use MessageType::*;
        match (self.mode, msg_type) {
            (Mode::Server, ClientHello) => self.process_client_hello(message)?,
            (Mode::Client, ServerHello) => self.process_server_hello(message)?,
            (Mode::Client, EncryptedExtensions) => self.process_encrypted_extensions(message)?,
            (Mode::Client, Certificate) => self.process_certificate(message)?,
            (Mode::Client, ServerKeyExchange) => self.process_server_key_exchange(message)?,
            (Mode::Client, ServerHelloDone) => self.process_server_hello_done(message)?,
            (Mode::Server, ClientKeyExchange) => self.process_client_key_exchange(message)?,
            (Mode::Server, NextProtocol) => self.process_next_protocol(message)?,
            (_, Finished) => self.process_finished(message)?,
            _ => {
                warn!("Unexpected {:?} for a {:?}", msg_type, self.mode);
                return Err(Error::fatal(AlertDescription::UnexpectedMessage));
            }
        }
        Ok(msg_type)
    }

    /// Process every handshake message in the data of one record.
    pub fn process_handshake_record(&mut self, data: &[u8]) -> Result<Vec<MessageType>, Error> {
        let mut rest = data;
        let mut processed = Vec::new();
        while !rest.is_empty() {
            let (next, _) = handshake::unwrap(rest, self.protocol()).map_err(|_| {
                warn!("Handshake message split across records");
                Error::fatal(AlertDescription::DecodeError)
            })?;
            let len = rest.len() - next.len();
            processed.push(self.process_handshake(&rest[..len])?);
            rest = next;
        }
        Ok(processed)
    }

    /// Zero every secret held for this connection.
    pub fn destroy(&mut self) {
        self.local.destroy_secrets();
        if let Some(remote) = &mut self.remote {
            remote.destroy_secrets();
        }
        self.drop_handshake_secrets();
        self.key_schedule = None;
        self.encrypted_extensions = None;
    }

    fn drop_handshake_secrets(&mut self) {
        if let Some((mut client, mut server)) = self.handshake_secrets.take() {
            client.destroy();
            server.destroy();
        }
    }

    /// Frame, record and seal an outgoing handshake message.
    fn send_handshake(&mut self, msg_type: MessageType, body: &[u8]) -> Result<Vec<u8>, Error> {
        let header = Header::for_body(msg_type, body.len(), self.send_seq)?;
        self.send_seq = self.send_seq.wrapping_add(1);
        self.transcript.push(header, body);

        let protocol = self.protocol();
        let mut framed = Vec::with_capacity(Header::len(protocol) + body.len());
        header.serialize(protocol, &mut framed);
        framed.extend_from_slice(body);
        trace!("Sending {:?}, {} bytes", msg_type, body.len());
        self.records.seal(ContentType::Handshake, &framed)
    }

    /// Split a received message into header and body, checking its type.
    fn receive<'a>(
        &self,
        expected: MessageType,
        message: &'a [u8],
    ) -> Result<(Header, &'a [u8]), Error> {
        let (rest, (header, body)) = handshake::unwrap(message, self.protocol()).map_err(|_| {
            warn!("Malformed {:?}", expected);
            Error::fatal(AlertDescription::DecodeError)
        })?;
        if !rest.is_empty() {
            warn!("Trailing bytes after {:?}", expected);
            return Err(Error::fatal(AlertDescription::DecodeError));
        }
        if header.msg_type != expected {
            warn!("Expected {:?}, got {:?}", expected, header.msg_type);
            return Err(Error::fatal(AlertDescription::UnexpectedMessage));
        }
        Ok((header, body))
    }

    fn is_tls13(&self) -> bool {
        self.version().map(|v| v.is_tls13()).unwrap_or(false)
    }
}

/// The value of a parse that must consume its whole input.
fn complete<O>(parsed: IResult<&[u8], O>) -> Result<O, Error> {
    match parsed {
        Ok((rest, out)) if rest.is_empty() => Ok(out),
        _ => {
            warn!("Handshake body does not parse");
            Err(Error::fatal(AlertDescription::DecodeError))
        }
    }
}

impl fmt::Debug for NegotiationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NegotiationContext")
            .field("mode", &self.mode)
            .field("version", &self.version())
            .field("cipher", &self.cipher())
            .field("negotiable", &self.negotiable)
            .field("negotiated", &self.negotiated)
            .field("records", &self.records)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::property::{ALPN, ENCRYPT_THEN_MAC};

    fn client() -> NegotiationContext {
        NegotiationContext::new(Mode::Client, Arc::new(Config::default()))
    }

    #[test]
    fn negotiable_and_negotiated_are_separate() {
        let mut ctx = client();
        ctx.add_negotiable(&ALPN, vec!["h2".to_string()]);
        assert!(ctx.negotiated(&ALPN).is_none());
        assert!(!ctx.is_negotiated(&ALPN));

        ctx.add_negotiated(&ALPN, "h2".to_string()).unwrap();
        assert_eq!(ctx.negotiated(&ALPN).map(String::as_str), Some("h2"));
        assert_eq!(ctx.negotiable(&ALPN).map(Vec::len), Some(1));
    }

    #[test]
    fn negotiated_twice_is_internal() {
        let mut ctx = client();
        ctx.add_negotiated(&ENCRYPT_THEN_MAC, true).unwrap();
        let err = ctx.add_negotiated(&ENCRYPT_THEN_MAC, false).unwrap_err();
        assert!(err.is_internal());
        assert!(ctx.flag(&ENCRYPT_THEN_MAC));
    }

    #[test]
    fn missing_required_value_is_internal() {
        let ctx = client();
        let err = ctx.negotiated_value(&CIPHER).unwrap_err();
        assert!(err.is_internal());
        assert_eq!(err.alert().description, AlertDescription::InternalError);
    }

    #[test]
    fn candidates_narrow_to_negotiated() {
        let mut ctx = client();
        assert_eq!(
            ctx.candidate_versions(),
            vec![ProtocolVersion::Tls1_3, ProtocolVersion::Tls1_2]
        );
        ctx.add_negotiated(&VERSION, ProtocolVersion::Tls1_2).unwrap();
        assert_eq!(ctx.candidate_versions(), vec![ProtocolVersion::Tls1_2]);

        let server = NegotiationContext::new(Mode::Server, Arc::new(Config::default()));
        assert!(server.candidate_versions().is_empty());
    }

    #[test]
    fn wrong_message_type_is_unexpected() {
        let mut ctx = client();
        let message = handshake::wrap(MessageType::ClientKeyExchange, Protocol::Tls, 0, &[0]).unwrap();
        let err = ctx.process_handshake(&message).unwrap_err();
        assert_eq!(err.alert().description, AlertDescription::UnexpectedMessage);
    }

    #[test]
    fn truncated_message_is_decode_error() {
        let mut ctx = client();
        let err = ctx.process_handshake(&[0x02, 0x00, 0x00, 0x10, 0x03]).unwrap_err();
        assert_eq!(err.alert().description, AlertDescription::DecodeError);
    }

    #[test]
    fn sent_extensions_are_tracked_once() {
        let mut ctx = client();
        ctx.mark_sent(ExtensionType::ServerName);
        ctx.mark_sent(ExtensionType::ServerName);
        assert!(ctx.was_sent(ExtensionType::ServerName));
        assert!(!ctx.was_sent(ExtensionType::Padding));
        assert_eq!(ctx.sent_extensions.len(), 1);
    }
}
