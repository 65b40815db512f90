//! ClientHello, ServerHello and TLS 1.3 EncryptedExtensions.

use crate::alert::AlertDescription;
use crate::config::Config;
use crate::extension::{configure_all, process_all};
use crate::kx::KeyExchangeAlgorithm;
use crate::message::extension::{parse_block, serialize_block};
use crate::message::{ClientHello, Header, MessageType, Random, ServerHello, SessionId};
use crate::suite::{self, CipherSuite, EMPTY_RENEGOTIATION_INFO_SCSV, FALLBACK_SCSV};
use crate::types::{grease, CompressionMethod, ExtensionType, ProtocolVersion};
use crate::Error;

use super::property::{
    CIPHER, COMPRESSION, KEY_SHARE, MAX_FRAGMENT_LENGTH, SECURE_RENEGOTIATION, SUPPORTED_GROUPS,
    VERSION,
};
use super::{complete, ConnectionState, Mode, NegotiationContext};

/// ServerHello.random of a HelloRetryRequest (RFC 8446 section 4.1.3).
const HELLO_RETRY_REQUEST: [u8; 32] = [
    0xCF, 0x21, 0xAD, 0x74, 0xE5, 0x9A, 0x61, 0x11, 0xBE, 0x1D, 0x8C, 0x02, 0x1E, 0x65, 0xB8, 0x91,
    0xC2, 0xA2, 0x11, 0x16, 0x7A, 0xBB, 0x8C, 0x5E, 0x07, 0x9E, 0x09, 0xE2, 0xC8, 0xA8, 0x33, 0x9C,
];

impl NegotiationContext {
    /// Build the ClientHello and return it sealed.
    pub fn client_hello(&mut self) -> Result<Vec<u8>, Error> {
        if self.mode != Mode::Client {
            return Err(Error::internal("ClientHello from a server"));
        }
        let config = self.config_arc();
        let versions = config.versions().to_vec();
        let highest = config.highest_version();
        let legacy = highest.legacy();

        self.add_negotiable(&VERSION, versions.clone());
        self.offered_version = Some(legacy);

        let session_id = if highest.is_tls13() {
            // Middlebox compatibility mode.
            SessionId::random(32)
        } else {
            SessionId::empty()
        };
        self.local = ConnectionState::new(Random::new(highest), session_id);

        let mut suites: Vec<u16> = config
            .cipher_suites()
            .iter()
            .copied()
            .filter(|id| match suite::lookup(*id).and_then(|e| e.as_suite()) {
                Some(s) => {
                    (!s.key_exchange.is_psk() || config.psk().is_some())
                        && versions.iter().any(|v| s.supports(*v))
                }
                None => false,
            })
            .collect();
        if suites.is_empty() {
            return Err(Error::internal("No configured cipher suite fits the versions"));
        }
        self.add_negotiable(&CIPHER, suites.clone());

        if config.grease() {
            suites.insert(0, grease::random());
        }
        let offers_legacy = versions.iter().any(|v| !v.is_tls13());
        let sends_renegotiation_info = config.extensions().iter().any(|e| {
            e.extension_type() == ExtensionType::RenegotiationInfo
                && e.versions().iter().any(|v| versions.contains(v))
        });
        if offers_legacy && !sends_renegotiation_info {
            suites.push(EMPTY_RENEGOTIATION_INFO_SCSV);
        }
        self.add_negotiable(&COMPRESSION, vec![CompressionMethod::Null]);

        let mut hello = ClientHello::new(legacy, self.local.random, self.local.session_id, suites);
        let mut base = Vec::new();
        hello.serialize(&mut base);
        let base_len = Header::len(self.protocol()) + base.len();

        let extensions = configure_all(self, base_len)?;
        if !extensions.is_empty() {
            hello.extensions = Some(extensions);
        }

        let mut body = Vec::new();
        hello.serialize(&mut body);
        debug!(
            "ClientHello for {:?} with {} suites",
            versions,
            hello.cipher_suites.len()
        );
        self.send_handshake(MessageType::ClientHello, &body)
    }

    /// Server side: pick version, cipher suite and extensions from a
    /// ClientHello.
    pub fn process_client_hello(&mut self, message: &[u8]) -> Result<(), Error> {
        let (header, body) = self.receive(MessageType::ClientHello, message)?;
        let hello = complete(ClientHello::parse(body, self.protocol()))?;
        let config = self.config_arc();

        self.offered_version = Some(hello.client_version);
        self.remote = Some(ConnectionState::new(hello.random, hello.session_id));

        if hello.cipher_suites.contains(&EMPTY_RENEGOTIATION_INFO_SCSV) {
            self.add_negotiated(&SECURE_RENEGOTIATION, true)?;
        }
        if let Some(extensions) = &hello.extensions {
            process_all(self, Mode::Client, extensions)?;
        }

        let version = match self.version() {
            Some(v) => v,
            None => {
                let v = legacy_version(&config, hello.client_version)?;
                self.add_negotiated(&VERSION, v)?;
                v
            }
        };

        if hello.cipher_suites.contains(&FALLBACK_SCSV)
            && version.rank() < config.highest_version().rank()
        {
            warn!("Fallback to {} while {} is supported", version, config.highest_version());
            return Err(Error::fatal(AlertDescription::InappropriateFallback));
        }

        let sent_groups = hello.extension(ExtensionType::SupportedGroups).is_some();
        let cipher = self.choose_cipher(&hello.cipher_suites, version, sent_groups)?;
        self.add_negotiated(&CIPHER, cipher)?;

        if version.is_tls13() && !self.is_negotiated(&KEY_SHARE) {
            warn!("No usable key share and HelloRetryRequest is not supported");
            return Err(Error::fatal(AlertDescription::HandshakeFailure));
        }

        if !hello.compression_methods.contains(&CompressionMethod::Null) {
            warn!("ClientHello without null compression");
            return Err(Error::fatal(AlertDescription::IllegalParameter));
        }
        self.add_negotiated(&COMPRESSION, CompressionMethod::Null)?;

        // Key share selection may already have put key material here.
        self.local.random = Random::for_server(version, config.highest_version());
        self.local.session_id = if version.is_tls13() {
            hello.session_id
        } else {
            SessionId::empty()
        };

        self.records.set_version(version);
        self.transcript.push(header, body);
        debug!("Selected {} with {}", version, cipher);
        Ok(())
    }

    /// Server preference order over the suites the client offered.
    fn choose_cipher(
        &self,
        offered: &[u16],
        version: ProtocolVersion,
        sent_groups: bool,
    ) -> Result<&'static CipherSuite, Error> {
        for id in self.config.cipher_suites() {
            if !offered.contains(id) {
                continue;
            }
            let Some(candidate) = suite::lookup(*id).and_then(|e| e.as_suite()) else {
                continue;
            };
            if !candidate.supports(version) || candidate.is_tls13() != version.is_tls13() {
                continue;
            }
            if !self.can_serve(candidate, sent_groups) {
                trace!("Skipping {}, not servable", candidate);
                continue;
            }
            return suite::select(*id);
        }
        warn!("No cipher suite in common for {}", version);
        Err(Error::fatal(AlertDescription::HandshakeFailure))
    }

    /// Whether this server holds what `suite` needs.
    fn can_serve(&self, suite: &CipherSuite, sent_groups: bool) -> bool {
        use KeyExchangeAlgorithm::*;

        let config = &self.config;
        let kx = suite.key_exchange;
        let rsa = config.rsa_private_key().is_some() && !config.certificate_chain().is_empty();
        let dh = config.dh_params().is_some();

        if kx.is_psk() && config.psk().is_none() {
            return false;
        }
        if kx.is_ecc() && sent_groups && !self.is_negotiated(&SUPPORTED_GROUPS) {
            return false;
        }
        match kx {
            Tls13 | Psk | EcdhAnon | EcdhePsk => true,
            Rsa | RsaPsk | EcdheRsa => rsa,
            DheRsa => rsa && dh,
            DhAnon | DhePsk => dh,
            _ => false,
        }
    }

    /// Build the ServerHello and return it sealed.
    ///
    /// For TLS 1.3 the handshake traffic keys are switched to right after, and
    /// every extension but supported_versions and key_share is held back for
    /// [`encrypted_extensions`](Self::encrypted_extensions).
    pub fn server_hello(&mut self) -> Result<Vec<u8>, Error> {
        if self.mode != Mode::Server {
            return Err(Error::internal("ServerHello from a client"));
        }
        let version = *self.negotiated_value(&VERSION)?;
        let cipher = *self.negotiated_value(&CIPHER)?;

        let mut hello = ServerHello::new(
            version.legacy(),
            self.local.random,
            self.local.session_id,
            cipher.id,
        );
        let mut base = Vec::new();
        hello.serialize(&mut base);
        let base_len = Header::len(self.protocol()) + base.len();

        let mut extensions = configure_all(self, base_len)?;
        if version.is_tls13() {
            let (in_hello, encrypted): (Vec<_>, Vec<_>) =
                extensions.into_iter().partition(|e| {
                    matches!(
                        e.extension_type,
                        ExtensionType::SupportedVersions | ExtensionType::KeyShare
                    )
                });
            self.encrypted_extensions = Some(encrypted);
            extensions = in_hello;
        }
        if !extensions.is_empty() {
            hello.extensions = Some(extensions);
        }

        let mut body = Vec::new();
        hello.serialize(&mut body);
        let out = self.send_handshake(MessageType::ServerHello, &body)?;

        self.apply_max_fragment_length();
        if version.is_tls13() {
            self.install_handshake_keys()?;
        }
        Ok(out)
    }

    /// Client side: check the server's choices against what was offered.
    pub fn process_server_hello(&mut self, message: &[u8]) -> Result<(), Error> {
        let (header, body) = self.receive(MessageType::ServerHello, message)?;
        let hello = complete(ServerHello::parse(body))?;
        if hello.random.0 == HELLO_RETRY_REQUEST {
            warn!("HelloRetryRequest is not supported");
            return Err(Error::fatal(AlertDescription::HandshakeFailure));
        }
        let config = self.config_arc();

        self.remote = Some(ConnectionState::new(hello.random, hello.session_id));
        if let Some(extensions) = &hello.extensions {
            process_all(self, Mode::Server, extensions)?;
        }

        let version = match self.version() {
            Some(v) => v,
            None => {
                let v = hello.server_version;
                let offered = self
                    .negotiable(&VERSION)
                    .map(|o| o.contains(&v))
                    .unwrap_or(false);
                if !offered || v.is_tls13() {
                    warn!("Server selected unoffered version {}", v);
                    return Err(Error::fatal(AlertDescription::ProtocolVersion));
                }
                self.add_negotiated(&VERSION, v)?;
                v
            }
        };

        if !version.is_tls13() && config.highest_version().is_tls13() && hello.random.is_downgrade()
        {
            warn!("Downgrade to {} signalled in ServerHello.random", version);
            return Err(Error::fatal(AlertDescription::IllegalParameter));
        }
        if version.is_tls13() && hello.session_id != self.local.session_id {
            warn!("Server did not echo the session id");
            return Err(Error::fatal(AlertDescription::IllegalParameter));
        }

        let cipher = suite::select(hello.cipher_suite)?;
        let offered = self
            .negotiable(&CIPHER)
            .map(|o| o.contains(&hello.cipher_suite))
            .unwrap_or(false);
        if !offered || !cipher.supports(version) || cipher.is_tls13() != version.is_tls13() {
            warn!("Server selected {} for {}", cipher, version);
            return Err(Error::fatal(AlertDescription::IllegalParameter));
        }
        self.add_negotiated(&CIPHER, cipher)?;

        if hello.compression_method != CompressionMethod::Null {
            warn!("Server selected compression {:?}", hello.compression_method);
            return Err(Error::fatal(AlertDescription::IllegalParameter));
        }
        self.add_negotiated(&COMPRESSION, CompressionMethod::Null)?;

        self.records.set_version(version);
        self.transcript.push(header, body);
        self.apply_max_fragment_length();

        if version.is_tls13() {
            if self.local.pre_master.is_none() {
                warn!("TLS 1.3 ServerHello without a key share");
                return Err(Error::fatal(AlertDescription::MissingExtension));
            }
            self.install_handshake_keys()?;
        } else {
            // Shares offered for TLS 1.3 go unused.
            self.local.key_shares.clear();
        }
        debug!("Server selected {} with {}", version, cipher);
        Ok(())
    }

    /// Send the extensions held back from a TLS 1.3 ServerHello.
    pub fn encrypted_extensions(&mut self) -> Result<Vec<u8>, Error> {
        let extensions = self
            .encrypted_extensions
            .take()
            .ok_or_else(|| Error::internal("EncryptedExtensions outside a TLS 1.3 handshake"))?;
        let mut body = Vec::new();
        serialize_block(Some(&extensions), &mut body);
        self.send_handshake(MessageType::EncryptedExtensions, &body)
    }

    pub fn process_encrypted_extensions(&mut self, message: &[u8]) -> Result<(), Error> {
        if !self.is_tls13() {
            warn!("EncryptedExtensions below TLS 1.3");
            return Err(Error::fatal(AlertDescription::UnexpectedMessage));
        }
        let (header, body) = self.receive(MessageType::EncryptedExtensions, message)?;
        let extensions = complete(parse_block(body))?.unwrap_or_default();
        process_all(self, Mode::Server, &extensions)?;
        self.transcript.push(header, body);
        self.apply_max_fragment_length();
        Ok(())
    }

    fn apply_max_fragment_length(&mut self) {
        if let Some(limit) = self.negotiated(&MAX_FRAGMENT_LENGTH).copied() {
            self.records.set_max_fragment_len(limit.length());
        }
    }
}

/// Version for a ClientHello without supported_versions: the highest below
/// TLS 1.3 we share with the client.
fn legacy_version(config: &Config, client: ProtocolVersion) -> Result<ProtocolVersion, Error> {
    let ours = config.highest_version();
    let client_rank = if client.is_known() {
        if client.protocol() != ours.protocol() {
            warn!("ClientHello for {} on a {:?} server", client, ours.protocol());
            return Err(Error::fatal(AlertDescription::ProtocolVersion));
        }
        client.rank()
    } else if client.major() == ours.legacy().major() {
        // A future version of our protocol.
        u8::MAX
    } else {
        0
    };

    config
        .versions()
        .iter()
        .copied()
        .filter(|v| !v.is_tls13() && v.rank() <= client_rank)
        .max_by_key(|v| v.rank())
        .ok_or_else(|| {
            warn!("No version in common with {}", client);
            Error::fatal(AlertDescription::ProtocolVersion)
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::message::handshake;
    use crate::types::Protocol;

    fn context(mode: Mode, config: Config) -> NegotiationContext {
        NegotiationContext::new(mode, Arc::new(config))
    }

    /// Strip the record header off a sealed plaintext record.
    fn message(record: &[u8]) -> &[u8] {
        &record[5..]
    }

    fn tls12_only() -> Config {
        Config::builder()
            .versions(&[ProtocolVersion::Tls1_2])
            .cipher_suites(&[0xC02B, 0xC018])
            .build()
            .unwrap()
    }

    #[test]
    fn client_hello_offers_configured_suites() {
        let _ = env_logger::try_init();
        let mut client = context(Mode::Client, tls12_only());
        let record = client.client_hello().unwrap();
        let (_, (header, body)) = handshake::unwrap(message(&record), Protocol::Tls).unwrap();
        assert_eq!(header.msg_type, MessageType::ClientHello);

        let (_, hello) = ClientHello::parse(body, Protocol::Tls).unwrap();
        assert_eq!(hello.client_version, ProtocolVersion::Tls1_2);
        assert_eq!(hello.cipher_suites, vec![0xC02B, 0xC018]);
        assert!(hello.session_id.is_empty());
        assert!(hello.extension(ExtensionType::RenegotiationInfo).is_some());
        assert!(hello.extension(ExtensionType::SupportedVersions).is_none());
        assert!(client.was_sent(ExtensionType::SupportedGroups));
    }

    #[test]
    fn scsv_without_renegotiation_info() {
        let extensions = crate::extension::builtin()
            .into_iter()
            .filter(|e| e.extension_type() != ExtensionType::RenegotiationInfo)
            .collect();
        let config = Config::builder()
            .versions(&[ProtocolVersion::Tls1_2])
            .extensions(extensions)
            .build()
            .unwrap();
        let mut client = context(Mode::Client, config);
        let record = client.client_hello().unwrap();
        let (_, (_, body)) = handshake::unwrap(message(&record), Protocol::Tls).unwrap();
        let (_, hello) = ClientHello::parse(body, Protocol::Tls).unwrap();
        assert_eq!(hello.cipher_suites.last(), Some(&EMPTY_RENEGOTIATION_INFO_SCSV));
    }

    #[test]
    fn tls13_hello_carries_a_session_id_and_shares() {
        let mut client = context(Mode::Client, Config::default());
        let record = client.client_hello().unwrap();
        let (_, (_, body)) = handshake::unwrap(message(&record), Protocol::Tls).unwrap();
        let (_, hello) = ClientHello::parse(body, Protocol::Tls).unwrap();
        assert_eq!(hello.client_version, ProtocolVersion::Tls1_2);
        assert_eq!(hello.session_id.len(), 32);
        assert!(hello.extension(ExtensionType::KeyShare).is_some());
        assert!(!client.local().key_shares.is_empty());
    }

    #[test]
    fn server_picks_its_preference() {
        let _ = env_logger::try_init();
        let mut client = context(Mode::Client, tls12_only());
        let hello = client.client_hello().unwrap();

        let server_config = Config::builder()
            .versions(&[ProtocolVersion::Tls1_2])
            .cipher_suites(&[0xC018, 0xC02B])
            .build()
            .unwrap();
        let mut server = context(Mode::Server, server_config);
        server.process_client_hello(message(&hello)).unwrap();
        assert_eq!(server.version(), Some(ProtocolVersion::Tls1_2));
        // ECDH_anon suites need no certificate.
        assert_eq!(server.cipher().map(|c| c.id), Some(0xC018));
    }

    #[test]
    fn tls13_shares_dropped_when_tls12_is_chosen() {
        let _ = env_logger::try_init();
        let client_config = Config::builder()
            .versions(&[ProtocolVersion::Tls1_3, ProtocolVersion::Tls1_2])
            .cipher_suites(&[0x1301, 0xC018])
            .build()
            .unwrap();
        let mut client = context(Mode::Client, client_config);
        let hello = client.client_hello().unwrap();
        assert!(!client.local().key_shares.is_empty());

        let server_config = Config::builder()
            .versions(&[ProtocolVersion::Tls1_2])
            .cipher_suites(&[0xC018])
            .build()
            .unwrap();
        let mut server = context(Mode::Server, server_config);
        server.process_client_hello(message(&hello)).unwrap();
        let server_hello = server.server_hello().unwrap();

        client.process_server_hello(message(&server_hello)).unwrap();
        assert_eq!(client.version(), Some(ProtocolVersion::Tls1_2));
        assert!(client.local().key_shares.is_empty());
    }

    #[test]
    fn no_shared_suite_is_handshake_failure() {
        let mut client = context(Mode::Client, tls12_only());
        let hello = client.client_hello().unwrap();

        // Nothing the client offered.
        let server_config = Config::builder()
            .versions(&[ProtocolVersion::Tls1_2])
            .cipher_suites(&[0x002F])
            .build()
            .unwrap();
        let mut server = context(Mode::Server, server_config);
        let err = server.process_client_hello(message(&hello)).unwrap_err();
        assert_eq!(err.alert().description, AlertDescription::HandshakeFailure);
    }

    #[test]
    fn legacy_version_selection() {
        let config = Config::builder()
            .versions(&[ProtocolVersion::Tls1_2, ProtocolVersion::Tls1_1])
            .build()
            .unwrap();
        assert_eq!(
            legacy_version(&config, ProtocolVersion::Tls1_2).unwrap(),
            ProtocolVersion::Tls1_2
        );
        assert_eq!(
            legacy_version(&config, ProtocolVersion::Tls1_1).unwrap(),
            ProtocolVersion::Tls1_1
        );
        assert_eq!(
            legacy_version(&config, ProtocolVersion::from_u16(0x0305)).unwrap(),
            ProtocolVersion::Tls1_2
        );
        let err = legacy_version(&config, ProtocolVersion::Tls1_0).unwrap_err();
        assert_eq!(err.alert().description, AlertDescription::ProtocolVersion);
    }

    #[test]
    fn hello_retry_request_is_refused() {
        let mut client = context(Mode::Client, Config::default());
        client.client_hello().unwrap();

        let hrr = ServerHello::new(
            ProtocolVersion::Tls1_2,
            Random(HELLO_RETRY_REQUEST),
            client.local().session_id,
            0x1301,
        );
        let mut body = Vec::new();
        hrr.serialize(&mut body);
        let framed = handshake::wrap(MessageType::ServerHello, Protocol::Tls, 0, &body).unwrap();

        let err = client.process_server_hello(&framed).unwrap_err();
        assert_eq!(err.alert().description, AlertDescription::HandshakeFailure);
    }

    #[test]
    fn unoffered_cipher_is_illegal() {
        let mut client = context(Mode::Client, tls12_only());
        client.client_hello().unwrap();

        let hello = ServerHello::new(
            ProtocolVersion::Tls1_2,
            Random::new(ProtocolVersion::Tls1_2),
            SessionId::empty(),
            0x009C,
        );
        let mut body = Vec::new();
        hello.serialize(&mut body);
        let framed = handshake::wrap(MessageType::ServerHello, Protocol::Tls, 0, &body).unwrap();

        let err = client.process_server_hello(&framed).unwrap_err();
        assert_eq!(err.alert().description, AlertDescription::IllegalParameter);
    }
}
