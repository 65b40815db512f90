//! Certificate, key exchange, ChangeCipherSpec and Finished.
//!
//! Below TLS 1.3 the pre-master secret comes out of ClientKeyExchange, the
//! master secret and key block follow, and ChangeCipherSpec switches each
//! direction to the staged keys. TLS 1.3 derives handshake keys right after
//! ServerHello and application keys once the server Finished is in the
//! transcript.

use subtle::ConstantTimeEq;

use crate::alert::AlertDescription;
use crate::crypto::signing::{self, PeerKey};
use crate::kx::{ClientKxInput, KeyExchangeAlgorithm, KeyShare, ServerKxInput};
use crate::message::{
    signature_scheme, CertificateList, ClientKeyExchange, KxParams, MessageType, NextProtocol,
    ServerKeyExchange,
};
use crate::record::RecordLayer;
use crate::secret::{
    finished_verify_data, generate_master_secret, ssl3_finished, KeySchedule, Secret, SessionKeys,
};
use crate::suite::CipherSuite;
use crate::types::{ContentType, ProtocolVersion, SignatureScheme};
use crate::util::{push_u16_prefixed, u16_prefixed};
use crate::Error;

use super::property::{
    CIPHER, ENCRYPT_THEN_MAC, EXTENDED_MASTER_SECRET, NPN, SIGNATURE_ALGORITHMS, SUPPORTED_GROUPS,
    VERSION,
};
use super::{complete, Mode, NegotiationContext};

impl NegotiationContext {
    fn negotiated_suite(&self) -> Result<(ProtocolVersion, &'static CipherSuite), Error> {
        Ok((*self.negotiated_value(&VERSION)?, *self.negotiated_value(&CIPHER)?))
    }

    /// Whether the negotiated key exchange authenticates the server with a
    /// certificate.
    pub fn expects_certificate(&self) -> bool {
        use KeyExchangeAlgorithm::*;
        matches!(
            self.cipher().map(|c| c.key_exchange),
            Some(Rsa | RsaPsk | DheRsa | DheDss | EcdheRsa | EcdheEcdsa | DhRsa | DhDss | EcdhRsa | EcdhEcdsa)
        )
    }

    /// Whether the server sends a ServerKeyExchange for the negotiated suite.
    pub fn expects_server_key_exchange(&self) -> bool {
        use KeyExchangeAlgorithm::*;
        matches!(
            self.cipher().map(|c| c.key_exchange),
            Some(DheRsa | DheDss | DhAnon | DhePsk | EcdheRsa | EcdheEcdsa | EcdhAnon | EcdhePsk)
        )
    }

    /// Send the configured certificate chain.
    pub fn certificate(&mut self) -> Result<Vec<u8>, Error> {
        if self.is_tls13() {
            return Err(Error::NotImplemented("TLS 1.3 certificate authentication"));
        }
        let chain = self.config.certificate_chain().to_vec();
        if chain.is_empty() {
            return Err(Error::internal("No certificate chain configured"));
        }
        let mut body = Vec::new();
        CertificateList::new(chain).serialize(&mut body);
        self.send_handshake(MessageType::Certificate, &body)
    }

    /// Have the configured validator check the peer chain and keep the leaf.
    pub fn process_certificate(&mut self, message: &[u8]) -> Result<(), Error> {
        let (header, body) = self.receive(MessageType::Certificate, message)?;
        let list = complete(CertificateList::parse(body))?;
        if list.chain.is_empty() {
            warn!("Empty certificate chain");
            return Err(Error::fatal(AlertDescription::BadCertificate));
        }

        let config = self.config_arc();
        let validator = config.certificate_validator().ok_or_else(|| {
            warn!("No certificate validator configured");
            Error::fatal(AlertDescription::CertificateUnknown)
        })?;
        let leaf = validator.validate(self, self.mode.peer(), &list.chain)?;
        debug!("Peer certificate chain of {} accepted", list.chain.len());

        self.remote_mut().certificate = Some(leaf);
        self.transcript.push(header, body);
        Ok(())
    }

    /// Build the ServerKeyExchange, or `None` when the suite has none.
    pub fn server_key_exchange(&mut self) -> Result<Option<Vec<u8>>, Error> {
        use KeyExchangeAlgorithm::*;

        let (version, cipher) = self.negotiated_suite()?;
        let kx = cipher.key_exchange;
        let config = self.config_arc();

        let params = match kx {
            EcdheRsa | EcdhAnon | EcdhePsk => {
                let group = match self.negotiated(&SUPPORTED_GROUPS) {
                    Some(group) => *group,
                    None => config
                        .supported_groups()
                        .iter()
                        .copied()
                        .find(|g| g.is_supported() && g.is_ecdhe())
                        .ok_or_else(|| Error::fatal(AlertDescription::HandshakeFailure))?,
                };
                let share = KeyShare::generate(group)?;
                let public = share.public_key().to_vec();
                self.local.key_shares.push(share);
                self.local.public_key = Some(public.clone());
                KxParams::Ecdh { group, public }
            }
            DheRsa | DhAnon | DhePsk => {
                let (p, g) = config
                    .dh_params()
                    .ok_or_else(|| Error::internal("DHE suite without DH parameters"))?;
                let share = KeyShare::generate_dh(p, g)?;
                let public = share.public_key().to_vec();
                self.local.key_shares.push(share);
                self.local.public_key = Some(public.clone());
                self.local.dh_params = Some((p.to_vec(), g.to_vec()));
                KxParams::Dh {
                    p: p.to_vec(),
                    g: g.to_vec(),
                    public,
                }
            }
            _ => return Ok(None),
        };

        let mut ske = ServerKeyExchange {
            psk_identity_hint: kx.is_psk().then(Vec::new),
            params: Some(params),
            signature: None,
        };

        if matches!(kx, DheRsa | EcdheRsa) {
            let key = config
                .rsa_private_key()
                .ok_or_else(|| Error::internal("RSA suite without a private key"))?;
            let signed = self.signed_params(&ske)?;
            let mut signature = Vec::new();
            if version.uses_suite_prf() {
                let scheme = self.rsa_signature_scheme()?;
                signature.extend_from_slice(&scheme.as_u16().to_be_bytes());
                push_u16_prefixed(&mut signature, &signing::sign_rsa(key, Some(scheme), &signed)?);
            } else {
                push_u16_prefixed(&mut signature, &signing::sign_rsa(key, None, &signed)?);
            }
            ske.signature = Some(signature);
        }

        let mut body = Vec::new();
        ske.serialize(&mut body);
        Ok(Some(self.send_handshake(MessageType::ServerKeyExchange, &body)?))
    }

    /// client_random || server_random || params.
    fn signed_params(&self, ske: &ServerKeyExchange) -> Result<Vec<u8>, Error> {
        let remote = self
            .remote
            .as_ref()
            .ok_or_else(|| Error::internal("No peer hello processed"))?;
        let (client, server) = match self.mode {
            Mode::Client => (&self.local.random, &remote.random),
            Mode::Server => (&remote.random, &self.local.random),
        };
        let mut signed = Vec::with_capacity(64 + 128);
        signed.extend_from_slice(&client.0);
        signed.extend_from_slice(&server.0);
        signed.extend(ske.signed_params());
        Ok(signed)
    }

    /// First scheme the client accepts that an RSA key can produce.
    ///
    /// A client without signature_algorithms implies SHA-1.
    fn rsa_signature_scheme(&self) -> Result<SignatureScheme, Error> {
        let Some(accepted) = self.negotiated(&SIGNATURE_ALGORITHMS) else {
            return Ok(SignatureScheme::RsaPkcs1Sha1);
        };
        accepted
            .iter()
            .copied()
            .find(|s| signing::can_sign_rsa(*s))
            .ok_or_else(|| {
                warn!("No RSA signature scheme in {:?}", accepted);
                Error::fatal(AlertDescription::HandshakeFailure)
            })
    }

    /// Client side: check the signature and prepare our half of the exchange.
    pub fn process_server_key_exchange(&mut self, message: &[u8]) -> Result<(), Error> {
        use KeyExchangeAlgorithm::*;

        let (header, body) = self.receive(MessageType::ServerKeyExchange, message)?;
        let (version, cipher) = self.negotiated_suite()?;
        let kx = cipher.key_exchange;
        let ske = complete(ServerKeyExchange::parse(body, kx))?;

        if matches!(kx, DheRsa | DheDss | EcdheEcdsa | EcdheRsa) {
            self.verify_server_signature(version, &ske)?;
        }

        match &ske.params {
            Some(KxParams::Ecdh { group, public }) => {
                let offered = match self.negotiable(&SUPPORTED_GROUPS) {
                    Some(offer) => offer.contains(group),
                    None => self.config.supported_groups().contains(group),
                };
                if !offered || !group.is_supported() {
                    warn!("Server key exchange on unoffered group {:?}", group);
                    return Err(Error::fatal(AlertDescription::IllegalParameter));
                }
                self.local.key_shares.push(KeyShare::generate(*group)?);
                self.remote_mut().public_key = Some(public.clone());
            }
            Some(KxParams::Dh { p, g, public }) => {
                self.local.key_shares.push(KeyShare::generate_dh(p, g)?);
                let remote = self.remote_mut();
                remote.dh_params = Some((p.clone(), g.clone()));
                remote.public_key = Some(public.clone());
            }
            None => {}
        }

        self.transcript.push(header, body);
        Ok(())
    }

    fn verify_server_signature(
        &self,
        version: ProtocolVersion,
        ske: &ServerKeyExchange,
    ) -> Result<(), Error> {
        let certificate = self
            .remote
            .as_ref()
            .and_then(|r| r.certificate.as_deref())
            .ok_or_else(|| {
                warn!("Signed ServerKeyExchange before a server certificate");
                Error::fatal(AlertDescription::UnexpectedMessage)
            })?;
        let key = PeerKey::from_certificate(certificate)?;

        let raw = ske.signature.as_deref().ok_or_else(|| {
            warn!("ServerKeyExchange is missing its signature");
            Error::fatal(AlertDescription::DecodeError)
        })?;
        let (scheme, rest) = if version.uses_suite_prf() {
            let (rest, id) = signature_scheme(raw)
                .map_err(|_| Error::fatal(AlertDescription::DecodeError))?;
            let scheme = SignatureScheme::from_u16(id);
            let offered = self
                .negotiable(&SIGNATURE_ALGORITHMS)
                .map(|o| o.contains(&scheme))
                .unwrap_or(false);
            if !offered {
                warn!("Server signed with unoffered {:?}", scheme);
                return Err(Error::fatal(AlertDescription::IllegalParameter));
            }
            (Some(scheme), rest)
        } else {
            (None, raw)
        };
        let signature = complete(u16_prefixed(rest))?;

        signing::verify(&key, scheme, &self.signed_params(ske)?, signature)
    }

    /// Supply the server's static DH or ECDH public value from its certificate.
    pub fn set_peer_key(&mut self, params: KxParams) -> Result<(), Error> {
        let share = match &params {
            KxParams::Ecdh { group, .. } => KeyShare::generate(*group)?,
            KxParams::Dh { p, g, .. } => KeyShare::generate_dh(p, g)?,
        };
        self.local.key_shares.push(share);
        let remote = self.remote_mut();
        if let KxParams::Dh { p, g, .. } = &params {
            remote.dh_params = Some((p.clone(), g.clone()));
        }
        remote.public_key = Some(params.public().to_vec());
        Ok(())
    }

    pub fn server_hello_done(&mut self) -> Result<Vec<u8>, Error> {
        self.send_handshake(MessageType::ServerHelloDone, &[])
    }

    pub fn process_server_hello_done(&mut self, message: &[u8]) -> Result<(), Error> {
        let (header, body) = self.receive(MessageType::ServerHelloDone, message)?;
        if !body.is_empty() {
            warn!("ServerHelloDone with a body");
            return Err(Error::fatal(AlertDescription::DecodeError));
        }
        self.transcript.push(header, body);
        Ok(())
    }

    /// Compute the pre-master secret, send it and stage the session keys.
    pub fn client_key_exchange(&mut self) -> Result<Vec<u8>, Error> {
        let (version, cipher) = self.negotiated_suite()?;
        let kx = cipher.key_exchange;
        let config = self.config_arc();
        let psk = config.psk();

        let local_share = self.local.key_shares.pop();
        let remote = self
            .remote
            .as_ref()
            .ok_or_else(|| Error::internal("No ServerHello processed"))?;
        let pre_master = kx.client_pre_master(ClientKxInput {
            version: self.offered_version.unwrap_or(version),
            local_share,
            peer_public: remote.public_key.as_deref(),
            peer_certificate: remote.certificate.as_deref(),
            psk: psk.map(|p| p.key.as_slice()),
        })?;

        if kx.is_key_agreement() {
            self.local.public_key = Some(pre_master.exchange.clone());
        }
        let cke = ClientKeyExchange {
            identity: psk.filter(|_| kx.is_psk()).map(|p| p.identity.clone()),
            exchange: pre_master.exchange,
        };
        let mut body = Vec::new();
        cke.serialize(kx, version, &mut body)?;
        self.local.pre_master = Some(pre_master.secret);

        let out = self.send_handshake(MessageType::ClientKeyExchange, &body)?;
        self.derive_master_secret(version, cipher)?;
        self.stage_session_keys(version, cipher)?;
        Ok(out)
    }

    /// Recover the pre-master secret and stage the session keys.
    pub fn process_client_key_exchange(&mut self, message: &[u8]) -> Result<(), Error> {
        let (header, body) = self.receive(MessageType::ClientKeyExchange, message)?;
        let (version, cipher) = self.negotiated_suite()?;
        let kx = cipher.key_exchange;
        let cke = complete(ClientKeyExchange::parse(body, kx, version))?;
        let config = self.config_arc();

        let psk = match config.psk() {
            Some(psk) if kx.is_psk() => {
                if cke.identity.as_deref() != Some(psk.identity.as_slice()) {
                    warn!("Unknown PSK identity");
                    return Err(Error::fatal(AlertDescription::UnknownPskIdentity));
                }
                Some(psk.key.as_slice())
            }
            None if kx.is_psk() => return Err(Error::internal("PSK suite without a PSK")),
            _ => None,
        };

        let local_share = self.local.key_shares.pop();
        let secret = kx.server_pre_master(ServerKxInput {
            client_version: self.offered_version.unwrap_or(version),
            local_share,
            exchange: &cke.exchange,
            rsa_key: config.rsa_private_key(),
            psk,
        })?;
        if kx.is_key_agreement() {
            self.remote_mut().public_key = Some(cke.exchange.clone());
        }
        self.local.pre_master = Some(secret);

        self.transcript.push(header, body);
        self.derive_master_secret(version, cipher)?;
        self.stage_session_keys(version, cipher)
    }

    /// Client and server random, in that order.
    fn randoms(&self) -> Result<([u8; 32], [u8; 32]), Error> {
        let remote = self
            .remote
            .as_ref()
            .ok_or_else(|| Error::internal("No peer random"))?
            .random
            .0;
        let local = self.local.random.0;
        Ok(match self.mode {
            Mode::Client => (local, remote),
            Mode::Server => (remote, local),
        })
    }

    fn derive_master_secret(
        &mut self,
        version: ProtocolVersion,
        cipher: &'static CipherSuite,
    ) -> Result<(), Error> {
        let mut pre_master = self
            .local
            .pre_master
            .take()
            .ok_or_else(|| Error::internal("No pre-master secret"))?;
        let session_hash = self
            .flag(&EXTENDED_MASTER_SECRET)
            .then(|| self.transcript.prf_hash(version, cipher.prf_hash()));
        let (client_random, server_random) = self.randoms()?;

        let master = generate_master_secret(
            &mut pre_master,
            version,
            cipher.prf_hash(),
            &client_random,
            &server_random,
            session_hash.as_deref(),
        )?;
        self.local.master = Some(master);
        Ok(())
    }

    fn stage_session_keys(
        &mut self,
        version: ProtocolVersion,
        cipher: &'static CipherSuite,
    ) -> Result<(), Error> {
        let (client_random, server_random) = self.randoms()?;
        let master = self
            .local
            .master
            .as_ref()
            .ok_or_else(|| Error::internal("No master secret"))?;
        let keys = SessionKeys::derive(
            master,
            version,
            cipher.prf_hash(),
            &client_random,
            &server_random,
            cipher.key_block_layout(version),
        )?;

        let etm = self.flag(&ENCRYPT_THEN_MAC);
        let (write, read) = match self.mode {
            Mode::Client => (&keys.client, &keys.server),
            Mode::Server => (&keys.server, &keys.client),
        };
        self.records
            .set_pending_write(cipher.new_mode(version, true, write, etm)?);
        self.records
            .set_pending_read(cipher.new_mode(version, false, read, etm)?);
        debug!("Session keys staged for {}", cipher);
        Ok(())
    }

    /// Send ChangeCipherSpec and switch to the staged write keys.
    pub fn change_cipher_spec(&mut self) -> Result<Vec<u8>, Error> {
        let out = self.records.seal(ContentType::ChangeCipherSpec, &[1])?;
        self.records.activate_write()?;
        Ok(out)
    }

    /// Switch to the staged read keys on the peer's ChangeCipherSpec.
    pub fn process_change_cipher_spec(&mut self, data: &[u8]) -> Result<(), Error> {
        if data != [1] {
            warn!("Malformed ChangeCipherSpec {:02x?}", data);
            return Err(Error::fatal(AlertDescription::UnexpectedMessage));
        }
        if !self.records.is_read_pending() {
            warn!("ChangeCipherSpec before the key exchange");
            return Err(Error::fatal(AlertDescription::UnexpectedMessage));
        }
        self.records.activate_read()
    }

    /// `verify_data` of the Finished sent by `sender`, over the transcript so far.
    fn verify_data(&self, sender: Mode) -> Result<Vec<u8>, Error> {
        let (version, cipher) = self.negotiated_suite()?;

        if version.is_tls13() {
            let schedule = self
                .key_schedule
                .as_ref()
                .ok_or_else(|| Error::internal("No TLS 1.3 key schedule"))?;
            let (client, server) = self
                .handshake_secrets
                .as_ref()
                .ok_or_else(|| Error::internal("No handshake traffic secrets"))?;
            let base_key = match sender {
                Mode::Client => client,
                Mode::Server => server,
            };
            let transcript_hash = self.transcript.hash(version, schedule.hash());
            return schedule.finished_verify_data(base_key, &transcript_hash);
        }

        let master = self
            .local
            .master
            .as_ref()
            .ok_or_else(|| Error::internal("No master secret"))?;
        if version == ProtocolVersion::Ssl3_0 {
            let sender = match sender {
                Mode::Client => b"CLNT",
                Mode::Server => b"SRVR",
            };
            return ssl3_finished(master, sender, &self.transcript.bytes(version));
        }
        let label = match sender {
            Mode::Client => "client finished",
            Mode::Server => "server finished",
        };
        let handshake_hash = self.transcript.prf_hash(version, cipher.prf_hash());
        finished_verify_data(master, version, cipher.prf_hash(), label, &handshake_hash)
    }

    /// Send Finished.
    ///
    /// A TLS 1.3 server moves its writes to the application keys right after,
    /// a TLS 1.3 client once its Finished is out.
    pub fn finished(&mut self) -> Result<Vec<u8>, Error> {
        if !self.records.is_write_protected() {
            return Err(Error::internal("Finished before ChangeCipherSpec"));
        }
        let verify_data = self.verify_data(self.mode)?;
        let out = self.send_handshake(MessageType::Finished, &verify_data)?;

        if self.is_tls13() {
            match self.mode {
                Mode::Server => self.install_application_keys()?,
                Mode::Client => {
                    self.records.activate_write()?;
                    self.drop_handshake_secrets();
                }
            }
        }
        Ok(out)
    }

    pub fn process_finished(&mut self, message: &[u8]) -> Result<(), Error> {
        let (header, body) = self.receive(MessageType::Finished, message)?;
        if !self.records.is_read_protected() {
            warn!("Finished received in plaintext");
            return Err(Error::fatal(AlertDescription::UnexpectedMessage));
        }
        let expected = self.verify_data(self.mode.peer())?;
        if !bool::from(expected.as_slice().ct_eq(body)) {
            warn!("Finished verify_data mismatch");
            return Err(Error::fatal(AlertDescription::DecryptError));
        }
        self.transcript.push(header, body);
        debug!("{:?} Finished verified", self.mode.peer());

        if self.is_tls13() {
            match self.mode {
                Mode::Client => self.install_application_keys()?,
                Mode::Server => {
                    self.records.activate_read()?;
                    self.drop_handshake_secrets();
                }
            }
        }
        Ok(())
    }

    /// Client side: announce the protocol picked from the server's NPN list.
    ///
    /// Sent after ChangeCipherSpec and before Finished. `None` when NPN was not
    /// negotiated.
    pub fn next_protocol(&mut self) -> Result<Option<Vec<u8>>, Error> {
        if self.mode != Mode::Client {
            return Err(Error::internal("NextProtocol from a server"));
        }
        let Some(selected) = self.negotiated(&NPN).cloned() else {
            return Ok(None);
        };
        let mut body = Vec::new();
        NextProtocol::new(selected).serialize(&mut body);
        Ok(Some(self.send_handshake(MessageType::NextProtocol, &body)?))
    }

    pub fn process_next_protocol(&mut self, message: &[u8]) -> Result<(), Error> {
        let (header, body) = self.receive(MessageType::NextProtocol, message)?;
        if self.negotiable(&NPN).is_none() {
            warn!("NextProtocol without next_protocol_negotiation");
            return Err(Error::fatal(AlertDescription::UnexpectedMessage));
        }
        let next = complete(NextProtocol::parse_complete(body))?;
        self.add_negotiated(&NPN, next.selected)?;
        self.transcript.push(header, body);
        Ok(())
    }

    /// TLS 1.3: run the key schedule into the handshake secret and switch
    /// both directions to the handshake traffic keys.
    pub(super) fn install_handshake_keys(&mut self) -> Result<(), Error> {
        let (version, cipher) = self.negotiated_suite()?;
        let mut shared = self
            .local
            .pre_master
            .take()
            .ok_or_else(|| Error::internal("No (EC)DHE shared secret"))?;

        let mut schedule = KeySchedule::new(cipher.prf_hash(), self.protocol(), None)?;
        let entered = shared
            .expose()
            .and_then(|secret| schedule.into_handshake(secret));
        shared.destroy();
        entered?;

        let transcript_hash = self.transcript.hash(version, schedule.hash());
        let (client, server) = schedule.traffic_secrets(&transcript_hash)?;
        stage_traffic_keys(
            &mut self.records,
            &schedule,
            self.mode,
            version,
            cipher,
            &client,
            &server,
        )?;
        self.records.activate_write()?;
        self.records.activate_read()?;

        self.key_schedule = Some(schedule);
        self.handshake_secrets = Some((client, server));
        Ok(())
    }

    /// TLS 1.3: derive the application traffic keys once the server Finished
    /// is in the transcript. The server writes with them from now on, the
    /// client reads with them.
    fn install_application_keys(&mut self) -> Result<(), Error> {
        let (version, cipher) = self.negotiated_suite()?;
        let schedule = self
            .key_schedule
            .as_mut()
            .ok_or_else(|| Error::internal("No TLS 1.3 key schedule"))?;
        schedule.into_master()?;

        let transcript_hash = self.transcript.hash(version, schedule.hash());
        let (mut client, mut server) = schedule.traffic_secrets(&transcript_hash)?;
        let staged = stage_traffic_keys(
            &mut self.records,
            schedule,
            self.mode,
            version,
            cipher,
            &client,
            &server,
        );
        client.destroy();
        server.destroy();
        staged?;

        match self.mode {
            Mode::Server => self.records.activate_write(),
            Mode::Client => self.records.activate_read(),
        }
    }
}

/// Stage record protection from a pair of TLS 1.3 traffic secrets.
fn stage_traffic_keys(
    records: &mut RecordLayer,
    schedule: &KeySchedule,
    mode: Mode,
    version: ProtocolVersion,
    cipher: &CipherSuite,
    client: &Secret,
    server: &Secret,
) -> Result<(), Error> {
    let layout = cipher.key_block_layout(version);
    let client = schedule.traffic_keys(client, layout.key_len, layout.iv_len)?;
    let server = schedule.traffic_keys(server, layout.key_len, layout.iv_len)?;
    let (write, read) = match mode {
        Mode::Client => (&client, &server),
        Mode::Server => (&server, &client),
    };
    records.set_pending_write(cipher.new_mode(version, true, write, false)?);
    records.set_pending_read(cipher.new_mode(version, false, read, false)?);
    Ok(())
}
