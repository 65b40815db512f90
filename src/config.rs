use std::fmt;
use std::sync::Arc;

use rsa::RsaPrivateKey;
use zeroize::Zeroizing;

use crate::extension::{self, ConfigurableExtension, MaxFragmentLength};
use crate::suite::{self, CatalogEntry};
use crate::transport::CertificateValidator;
use crate::types::{CompressionMethod, NamedGroup, ProtocolVersion, SignatureScheme};
use crate::Error;

/// A pre-shared key and the identity naming it.
#[derive(Clone)]
pub struct Psk {
    pub identity: Vec<u8>,
    pub key: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for Psk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Psk")
            .field("identity", &String::from_utf8_lossy(&self.identity))
            .finish()
    }
}

/// TLS/DTLS configuration
///
/// Immutable once built. Share it between connections with `Arc<Config>`.
#[derive(Clone)]
pub struct Config {
    versions: Vec<ProtocolVersion>,
    cipher_suites: Vec<u16>,
    compression_methods: Vec<CompressionMethod>,
    supported_groups: Vec<NamedGroup>,
    key_share_groups: Vec<NamedGroup>,
    signature_schemes: Vec<SignatureScheme>,
    alpn_protocols: Vec<String>,
    npn_protocols: Vec<String>,
    server_name: Option<String>,
    psk: Option<Psk>,
    encrypt_then_mac: bool,
    extended_master_secret: bool,
    post_handshake_auth: bool,
    grease: bool,
    padding_target: Option<usize>,
    max_fragment_length: Option<MaxFragmentLength>,
    dh_params: Option<(Vec<u8>, Vec<u8>)>,
    rsa_private_key: Option<Arc<RsaPrivateKey>>,
    certificate_chain: Vec<Vec<u8>>,
    extensions: Vec<Arc<dyn ConfigurableExtension>>,
    certificate_validator: Option<Arc<dyn CertificateValidator>>,
}

impl Config {
    /// Create a new configuration builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            versions: vec![ProtocolVersion::Tls1_3, ProtocolVersion::Tls1_2],
            cipher_suites: suite::default_ids(),
            compression_methods: vec![CompressionMethod::Null],
            supported_groups: NamedGroup::supported().to_vec(),
            key_share_groups: vec![NamedGroup::X25519],
            signature_schemes: SignatureScheme::defaults().to_vec(),
            alpn_protocols: Vec::new(),
            npn_protocols: Vec::new(),
            server_name: None,
            psk: None,
            encrypt_then_mac: true,
            extended_master_secret: true,
            post_handshake_auth: false,
            grease: false,
            padding_target: Some(512),
            max_fragment_length: None,
            dh_params: None,
            rsa_private_key: None,
            certificate_chain: Vec::new(),
            extensions: None,
            certificate_validator: None,
        }
    }

    /// Versions in preference order, highest first.
    ///
    /// All TLS or all DTLS.
    #[inline(always)]
    pub fn versions(&self) -> &[ProtocolVersion] {
        &self.versions
    }

    /// The most preferred version.
    #[inline(always)]
    pub fn highest_version(&self) -> ProtocolVersion {
        // build() refuses an empty list
        self.versions[0]
    }

    /// Cipher suite ids in preference order.
    #[inline(always)]
    pub fn cipher_suites(&self) -> &[u16] {
        &self.cipher_suites
    }

    #[inline(always)]
    pub fn compression_methods(&self) -> &[CompressionMethod] {
        &self.compression_methods
    }

    /// Groups for (EC)DHE, in preference order.
    #[inline(always)]
    pub fn supported_groups(&self) -> &[NamedGroup] {
        &self.supported_groups
    }

    /// Groups a TLS 1.3 client sends a key share for up front.
    #[inline(always)]
    pub fn key_share_groups(&self) -> &[NamedGroup] {
        &self.key_share_groups
    }

    #[inline(always)]
    pub fn signature_schemes(&self) -> &[SignatureScheme] {
        &self.signature_schemes
    }

    /// ALPN protocol names (rfc7301).
    #[inline(always)]
    pub fn alpn_protocols(&self) -> &[String] {
        &self.alpn_protocols
    }

    /// Next protocol negotiation names.
    #[inline(always)]
    pub fn npn_protocols(&self) -> &[String] {
        &self.npn_protocols
    }

    /// Host name sent in server_name instead of the connection address.
    #[inline(always)]
    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    #[inline(always)]
    pub fn psk(&self) -> Option<&Psk> {
        self.psk.as_ref()
    }

    /// Whether to offer/accept encrypt_then_mac (rfc7366).
    #[inline(always)]
    pub fn encrypt_then_mac(&self) -> bool {
        self.encrypt_then_mac
    }

    /// Whether to offer/accept extended_master_secret (rfc7627).
    #[inline(always)]
    pub fn extended_master_secret(&self) -> bool {
        self.extended_master_secret
    }

    #[inline(always)]
    pub fn post_handshake_auth(&self) -> bool {
        self.post_handshake_auth
    }

    /// Whether a client advertises GREASE values (rfc8701).
    #[inline(always)]
    pub fn grease(&self) -> bool {
        self.grease
    }

    /// ClientHello size the padding extension (rfc7685) pads towards.
    #[inline(always)]
    pub fn padding_target(&self) -> Option<usize> {
        self.padding_target
    }

    #[inline(always)]
    pub fn max_fragment_length(&self) -> Option<MaxFragmentLength> {
        self.max_fragment_length
    }

    /// Prime and generator a server uses for finite field DHE.
    #[inline(always)]
    pub fn dh_params(&self) -> Option<(&[u8], &[u8])> {
        self.dh_params
            .as_ref()
            .map(|(p, g)| (p.as_slice(), g.as_slice()))
    }

    /// Server key for RSA key exchange and ServerKeyExchange signatures.
    #[inline(always)]
    pub fn rsa_private_key(&self) -> Option<&RsaPrivateKey> {
        self.rsa_private_key.as_deref()
    }

    /// DER certificates sent in Certificate, leaf first.
    #[inline(always)]
    pub fn certificate_chain(&self) -> &[Vec<u8>] {
        &self.certificate_chain
    }

    /// Registered extensions, in send order.
    #[inline(always)]
    pub fn extensions(&self) -> &[Arc<dyn ConfigurableExtension>] {
        &self.extensions
    }

    #[inline(always)]
    pub fn certificate_validator(&self) -> Option<&dyn CertificateValidator> {
        self.certificate_validator.as_deref()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("versions", &self.versions)
            .field("cipher_suites", &self.cipher_suites.len())
            .field("supported_groups", &self.supported_groups)
            .field("alpn_protocols", &self.alpn_protocols)
            .field("server_name", &self.server_name)
            .field("psk", &self.psk)
            .field("grease", &self.grease)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

/// Builder for TLS/DTLS configuration.
pub struct ConfigBuilder {
    versions: Vec<ProtocolVersion>,
    cipher_suites: Vec<u16>,
    compression_methods: Vec<CompressionMethod>,
    supported_groups: Vec<NamedGroup>,
    key_share_groups: Vec<NamedGroup>,
    signature_schemes: Vec<SignatureScheme>,
    alpn_protocols: Vec<String>,
    npn_protocols: Vec<String>,
    server_name: Option<String>,
    psk: Option<Psk>,
    encrypt_then_mac: bool,
    extended_master_secret: bool,
    post_handshake_auth: bool,
    grease: bool,
    padding_target: Option<usize>,
    max_fragment_length: Option<MaxFragmentLength>,
    dh_params: Option<(Vec<u8>, Vec<u8>)>,
    rsa_private_key: Option<Arc<RsaPrivateKey>>,
    certificate_chain: Vec<Vec<u8>>,
    extensions: Option<Vec<Arc<dyn ConfigurableExtension>>>,
    certificate_validator: Option<Arc<dyn CertificateValidator>>,
}

impl ConfigBuilder {
    /// Set the protocol versions, most preferred first.
    ///
    /// Defaults to TLS 1.3, TLS 1.2.
    pub fn versions(mut self, versions: &[ProtocolVersion]) -> Self {
        self.versions = versions.to_vec();
        self
    }

    /// Set the cipher suite ids, most preferred first.
    ///
    /// Defaults to AEAD suites for TLS 1.3 and 1.2, then ECDHE CBC and RSA suites.
    pub fn cipher_suites(mut self, ids: &[u16]) -> Self {
        self.cipher_suites = ids.to_vec();
        self
    }

    /// Set the compression methods.
    ///
    /// Defaults to null only. DEFLATE is never offered.
    pub fn compression_methods(mut self, methods: &[CompressionMethod]) -> Self {
        self.compression_methods = methods.to_vec();
        self
    }

    /// Set the groups for (EC)DHE.
    ///
    /// Defaults to x25519, secp256r1, secp384r1.
    pub fn supported_groups(mut self, groups: &[NamedGroup]) -> Self {
        self.supported_groups = groups.to_vec();
        self
    }

    /// Set the groups a TLS 1.3 client sends key shares for.
    ///
    /// Defaults to x25519.
    pub fn key_share_groups(mut self, groups: &[NamedGroup]) -> Self {
        self.key_share_groups = groups.to_vec();
        self
    }

    /// Set the signature schemes.
    ///
    /// Defaults to ECDSA, RSA-PSS and PKCS#1 with SHA-2.
    pub fn signature_schemes(mut self, schemes: &[SignatureScheme]) -> Self {
        self.signature_schemes = schemes.to_vec();
        self
    }

    /// Set the ALPN protocols, most preferred first.
    ///
    /// Defaults to none.
    pub fn alpn_protocols(mut self, protocols: &[&str]) -> Self {
        self.alpn_protocols = protocols.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Set the next protocol negotiation names, most preferred first.
    ///
    /// Defaults to none.
    pub fn npn_protocols(mut self, protocols: &[&str]) -> Self {
        self.npn_protocols = protocols.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Set the host name sent in server_name.
    ///
    /// Defaults to the host of the connection address.
    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    /// Set the pre-shared key for the PSK suites.
    pub fn psk(mut self, identity: &[u8], key: &[u8]) -> Self {
        self.psk = Some(Psk {
            identity: identity.to_vec(),
            key: Zeroizing::new(key.to_vec()),
        });
        self
    }

    /// Set whether to use encrypt_then_mac (rfc7366).
    ///
    /// Defaults to true.
    pub fn encrypt_then_mac(mut self, enabled: bool) -> Self {
        self.encrypt_then_mac = enabled;
        self
    }

    /// Set whether to use extended_master_secret (rfc7627).
    ///
    /// Defaults to true.
    pub fn extended_master_secret(mut self, enabled: bool) -> Self {
        self.extended_master_secret = enabled;
        self
    }

    /// Set whether to offer post_handshake_auth.
    ///
    /// Defaults to false.
    pub fn post_handshake_auth(mut self, enabled: bool) -> Self {
        self.post_handshake_auth = enabled;
        self
    }

    /// Set whether to advertise GREASE values.
    ///
    /// Defaults to false.
    pub fn grease(mut self, enabled: bool) -> Self {
        self.grease = enabled;
        self
    }

    /// Set the ClientHello size to pad towards, `None` to never pad.
    ///
    /// Defaults to 512.
    pub fn padding_target(mut self, target: Option<usize>) -> Self {
        self.padding_target = target;
        self
    }

    /// Set the max_fragment_length to request.
    ///
    /// Defaults to none.
    pub fn max_fragment_length(mut self, limit: Option<MaxFragmentLength>) -> Self {
        self.max_fragment_length = limit;
        self
    }

    /// Set the DH prime and generator for finite field DHE suites.
    pub fn dh_params(mut self, prime: &[u8], generator: &[u8]) -> Self {
        self.dh_params = Some((prime.to_vec(), generator.to_vec()));
        self
    }

    /// Set the server RSA key.
    pub fn rsa_private_key(mut self, key: RsaPrivateKey) -> Self {
        self.rsa_private_key = Some(Arc::new(key));
        self
    }

    /// Set the certificate chain to send, DER encoded, leaf first.
    pub fn certificate_chain(mut self, chain: Vec<Vec<u8>>) -> Self {
        self.certificate_chain = chain;
        self
    }

    /// Replace the registered extensions.
    ///
    /// Defaults to every built-in extension.
    pub fn extensions(mut self, extensions: Vec<Arc<dyn ConfigurableExtension>>) -> Self {
        self.extensions = Some(extensions);
        self
    }

    /// Set the validator for peer certificate chains.
    ///
    /// Without one, a received Certificate is refused.
    pub fn certificate_validator(mut self, validator: Arc<dyn CertificateValidator>) -> Self {
        self.certificate_validator = Some(validator);
        self
    }

    /// Build the configuration.
    ///
    /// Returns `Error::Internal` for an empty or mixed TLS/DTLS version list,
    /// an unknown cipher suite id, or key share groups that can not be
    /// generated.
    pub fn build(self) -> Result<Config, Error> {
        let Some(first) = self.versions.first() else {
            return Err(Error::internal("No protocol versions configured"));
        };
        let protocol = first.protocol();
        if let Some(v) = self
            .versions
            .iter()
            .find(|v| !v.is_known() || v.protocol() != protocol)
        {
            return Err(Error::internal(format!(
                "Version {} does not belong with {}",
                v, first
            )));
        }

        if self.cipher_suites.is_empty() {
            return Err(Error::internal("No cipher suites configured"));
        }
        for id in &self.cipher_suites {
            match suite::lookup(*id) {
                Some(CatalogEntry::Suite(_)) => {}
                _ => {
                    return Err(Error::internal(format!(
                        "Unknown cipher suite 0x{:04X}",
                        id
                    )))
                }
            }
        }

        if !self.compression_methods.contains(&CompressionMethod::Null) {
            return Err(Error::internal("Null compression must be offered"));
        }

        if let Some(g) = self.key_share_groups.iter().find(|g| !g.is_supported()) {
            return Err(Error::internal(format!("Can not generate key shares for {:?}", g)));
        }

        Ok(Config {
            versions: self.versions,
            cipher_suites: self.cipher_suites,
            compression_methods: self.compression_methods,
            supported_groups: self.supported_groups,
            key_share_groups: self.key_share_groups,
            signature_schemes: self.signature_schemes,
            alpn_protocols: self.alpn_protocols,
            npn_protocols: self.npn_protocols,
            server_name: self.server_name,
            psk: self.psk,
            encrypt_then_mac: self.encrypt_then_mac,
            extended_master_secret: self.extended_master_secret,
            post_handshake_auth: self.post_handshake_auth,
            grease: self.grease,
            padding_target: self.padding_target,
            max_fragment_length: self.max_fragment_length,
            dh_params: self.dh_params,
            rsa_private_key: self.rsa_private_key,
            certificate_chain: self.certificate_chain,
            extensions: self.extensions.unwrap_or_else(extension::builtin),
            certificate_validator: self.certificate_validator,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::builder()
            .build()
            .expect("Default config should always validate")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = Config::default();
        assert_eq!(config.highest_version(), ProtocolVersion::Tls1_3);
        assert_eq!(config.padding_target(), Some(512));
        assert!(!config.extensions().is_empty());
    }

    #[test]
    fn mixed_families_rejected() {
        let err = Config::builder()
            .versions(&[ProtocolVersion::Tls1_2, ProtocolVersion::Dtls1_2])
            .build()
            .unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn empty_versions_rejected() {
        assert!(Config::builder().versions(&[]).build().is_err());
    }

    #[test]
    fn unknown_or_signaling_suite_rejected() {
        assert!(Config::builder().cipher_suites(&[0x1301, 0xBEEF]).build().is_err());
        assert!(Config::builder().cipher_suites(&[0x0A0A]).build().is_err());
    }

    #[test]
    fn key_share_group_must_be_generatable() {
        let err = Config::builder()
            .key_share_groups(&[NamedGroup::X448])
            .build()
            .unwrap_err();
        assert!(err.is_internal());
    }
}
