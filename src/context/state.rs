use crate::kx::KeyShare;
use crate::message::{Random, SessionId};
use crate::secret::Secret;
use crate::types::NamedGroup;

/// One side's view of a connection.
///
/// The local state owns key pairs and secrets. The remote state only ever
/// holds what the peer sent.
#[derive(Debug, Default)]
pub struct ConnectionState {
    pub random: Random,
    pub session_id: SessionId,
    /// Ephemeral key pairs. A TLS 1.3 client may hold one per offered group.
    pub key_shares: Vec<KeyShare>,
    /// Public value this side contributed to the key exchange.
    pub public_key: Option<Vec<u8>>,
    /// Explicit DH prime and generator.
    pub dh_params: Option<(Vec<u8>, Vec<u8>)>,
    /// Validated leaf certificate, DER.
    pub certificate: Option<Vec<u8>>,
    /// Groups listed in supported_groups, in the sender's order.
    pub groups: Vec<NamedGroup>,
    pub pre_master: Option<Secret>,
    pub master: Option<Secret>,
}

impl ConnectionState {
    pub fn new(random: Random, session_id: SessionId) -> Self {
        ConnectionState {
            random,
            session_id,
            ..Default::default()
        }
    }

    /// Remove and return the key share for `group`.
    pub fn take_key_share(&mut self, group: Option<NamedGroup>) -> Option<KeyShare> {
        let pos = self.key_shares.iter().position(|k| k.group() == group)?;
        Some(self.key_shares.remove(pos))
    }

    /// Zero every secret this state holds.
    pub fn destroy_secrets(&mut self) {
        if let Some(s) = &mut self.pre_master {
            s.destroy();
        }
        if let Some(s) = &mut self.master {
            s.destroy();
        }
        self.key_shares.clear();
    }
}
