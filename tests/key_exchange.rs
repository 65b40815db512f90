use tlscore::kx::{ClientKxInput, KeyExchangeAlgorithm, KeyShare, ServerKxInput};
use tlscore::secret::{generate_master_secret, Secret, SessionKeys};
use tlscore::suite;
use tlscore::types::NamedGroup;
use tlscore::{ContentType, Error, Protocol, ProtocolVersion, RecordLayer};

const CLIENT_RANDOM: [u8; 32] = [0x11; 32];
const SERVER_RANDOM: [u8; 32] = [0x22; 32];

/// Run `kx` between a client and a server and return both master secrets.
fn agree(kx: KeyExchangeAlgorithm, group: NamedGroup, psk: Option<&[u8]>) -> (Secret, Secret) {
    let server_share = KeyShare::generate(group).unwrap();
    let server_public = server_share.public_key().to_vec();

    let client = kx
        .client_pre_master(ClientKxInput {
            version: ProtocolVersion::Tls1_2,
            local_share: Some(KeyShare::generate(group).unwrap()),
            peer_public: Some(&server_public),
            peer_certificate: None,
            psk,
        })
        .unwrap();
    let mut server_pms = kx
        .server_pre_master(ServerKxInput {
            client_version: ProtocolVersion::Tls1_2,
            local_share: Some(server_share),
            exchange: &client.exchange,
            rsa_key: None,
            psk,
        })
        .unwrap();
    let mut client_pms = client.secret;

    let master = |pms: &mut Secret| {
        generate_master_secret(
            pms,
            ProtocolVersion::Tls1_2,
            suite::select(0xC02B).unwrap().prf_hash(),
            &CLIENT_RANDOM,
            &SERVER_RANDOM,
            None,
        )
        .unwrap()
    };
    let client_master = master(&mut client_pms);
    let server_master = master(&mut server_pms);
    assert!(client_pms.is_destroyed());
    assert!(server_pms.is_destroyed());
    (client_master, server_master)
}

#[test]
fn ecdhe_groups_reach_the_same_master_secret() {
    let _ = env_logger::try_init();
    for group in [NamedGroup::X25519, NamedGroup::Secp256r1, NamedGroup::Secp384r1] {
        let (client, server) = agree(KeyExchangeAlgorithm::EcdhAnon, group, None);
        assert_eq!(client.expose().unwrap(), server.expose().unwrap());
        assert_eq!(client.len(), 48);
    }
}

#[test]
fn ecdhe_psk_mixes_in_the_key() {
    let _ = env_logger::try_init();
    let (client, server) = agree(KeyExchangeAlgorithm::EcdhePsk, NamedGroup::X25519, Some(b"k"));
    assert_eq!(client.expose().unwrap(), server.expose().unwrap());
}

#[test]
fn unsupported_families_are_not_implemented() {
    let _ = env_logger::try_init();
    for kx in [KeyExchangeAlgorithm::Srp, KeyExchangeAlgorithm::Gost] {
        let err = kx.client_pre_master(ClientKxInput::default()).unwrap_err();
        assert!(matches!(err, Error::NotImplemented(_)));
    }
}

/// Two record layers keyed from one master secret, one per side.
fn keyed_pair(id: u16, version: ProtocolVersion, etm: bool) -> (RecordLayer, RecordLayer) {
    let cipher = suite::select(id).unwrap();
    let (master, _) = agree(KeyExchangeAlgorithm::EcdhAnon, NamedGroup::X25519, None);
    let keys = SessionKeys::derive(
        &master,
        version,
        cipher.prf_hash(),
        &CLIENT_RANDOM,
        &SERVER_RANDOM,
        cipher.key_block_layout(version),
    )
    .unwrap();

    let protocol = if version.is_dtls() {
        Protocol::Dtls
    } else {
        Protocol::Tls
    };
    let mut client = RecordLayer::new(protocol);
    let mut server = RecordLayer::new(protocol);
    for layer in [&mut client, &mut server] {
        layer.set_version(version);
    }
    client.set_pending_write(cipher.new_mode(version, true, &keys.client, etm).unwrap());
    client.set_pending_read(cipher.new_mode(version, false, &keys.server, etm).unwrap());
    server.set_pending_write(cipher.new_mode(version, true, &keys.server, etm).unwrap());
    server.set_pending_read(cipher.new_mode(version, false, &keys.client, etm).unwrap());
    for layer in [&mut client, &mut server] {
        layer.activate_write().unwrap();
        layer.activate_read().unwrap();
    }
    (client, server)
}

#[test]
fn records_protected_both_ways() {
    let _ = env_logger::try_init();
    let cases = [
        (0xC02B, ProtocolVersion::Tls1_2, false),
        (0xC018, ProtocolVersion::Tls1_2, true),
        (0xC018, ProtocolVersion::Tls1_2, false),
        (0xC018, ProtocolVersion::Tls1_0, false),
        (0xCCA8, ProtocolVersion::Tls1_2, false),
        (0xC02B, ProtocolVersion::Dtls1_2, false),
    ];
    for (id, version, etm) in cases {
        let (mut client, mut server) = keyed_pair(id, version, etm);
        for round in 0..3u8 {
            let message = vec![round; 100 + round as usize];
            let sealed = client.seal(ContentType::ApplicationData, &message).unwrap();
            let (used, record) = server.open(&sealed).unwrap();
            assert_eq!(used, sealed.len());
            assert_eq!(record.unwrap().data, message, "{:04X} {:?}", id, version);

            let sealed = server.seal(ContentType::ApplicationData, &message).unwrap();
            let (_, record) = client.open(&sealed).unwrap();
            assert_eq!(record.unwrap().data, message);
        }
    }
}

#[test]
fn tampered_record_is_bad_record_mac() {
    let _ = env_logger::try_init();
    let (mut client, mut server) = keyed_pair(0xC02B, ProtocolVersion::Tls1_2, false);
    let mut sealed = client.seal(ContentType::ApplicationData, b"attack at dawn").unwrap();
    let last = sealed.len() - 1;
    sealed[last] ^= 0x01;

    let err = server.open(&sealed).unwrap_err();
    assert_eq!(err.alert().description, tlscore::AlertDescription::BadRecordMac);
}
