use std::sync::Arc;

use crate::crypto::{PrivateKey, SigningKey};
use crate::message::extensions::KeyShareEntry;
use crate::message::KeyUpdateRequest;
use crate::negotiate::NegotiationPolicy;
use crate::ocsp::CertificateStatusSource;
use crate::types::{CipherSuite, ClientCertificateType, ECPointFormat, HashAlgorithm};
use crate::types::{NamedGroup, SignatureAlgorithm, SignatureAndHashAlgorithm};
use crate::Error;

/// Engine configuration.
///
/// Preference lists arrive here already validated. Shared between
/// connections as `Arc<Config>`.
#[derive(Clone)]
pub struct Config {
    cipher_suites: Vec<CipherSuite>,
    named_groups: Vec<NamedGroup>,
    key_share_groups: Vec<NamedGroup>,
    point_formats: Vec<ECPointFormat>,
    signature_algorithms: Vec<SignatureAndHashAlgorithm>,
    negotiation_policy: NegotiationPolicy,
    key_update_request: KeyUpdateRequest,
    rng_seed: Option<u64>,
    signing_key: Option<SigningKey>,
    esni_cipher_suites: Vec<CipherSuite>,
    esni_named_groups: Vec<NamedGroup>,
    esni_server_cipher_suites: Vec<CipherSuite>,
    esni_server_key_shares: Vec<KeyShareEntry>,
    esni_server_private_keys: Vec<PrivateKey>,
    esni_record: Vec<u8>,
    esni_padded_length: usize,
    padding_length: usize,
    signed_certificate_timestamp: Vec<u8>,
    client_certificate_types: Vec<ClientCertificateType>,
    distinguished_names: Vec<Vec<u8>>,
    certificate_request_context: Vec<u8>,
    ocsp_response: Vec<u8>,
    certificate_status_source: Option<Arc<dyn CertificateStatusSource>>,
}

impl Config {
    /// Create a new configuration builder.
    pub fn builder() -> ConfigBuilder {
        let ecdsa = |hash| SignatureAndHashAlgorithm::new(hash, SignatureAlgorithm::ECDSA);
        ConfigBuilder {
            cipher_suites: vec![
                CipherSuite::TLS_AES_128_GCM_SHA256,
                CipherSuite::TLS_AES_256_GCM_SHA384,
                CipherSuite::TLS_CHACHA20_POLY1305_SHA256,
            ],
            named_groups: vec![
                NamedGroup::X25519,
                NamedGroup::Secp256r1,
                NamedGroup::Secp384r1,
                NamedGroup::X448,
            ],
            key_share_groups: vec![NamedGroup::X25519],
            point_formats: vec![ECPointFormat::Uncompressed],
            signature_algorithms: vec![ecdsa(HashAlgorithm::SHA256), ecdsa(HashAlgorithm::SHA384)],
            negotiation_policy: NegotiationPolicy::Permissive,
            key_update_request: KeyUpdateRequest::UpdateNotRequested,
            rng_seed: None,
            signing_key: None,
            esni_cipher_suites: vec![CipherSuite::TLS_AES_128_GCM_SHA256],
            esni_named_groups: vec![NamedGroup::X25519],
            esni_server_cipher_suites: vec![CipherSuite::TLS_AES_128_GCM_SHA256],
            esni_server_key_shares: Vec::new(),
            esni_server_private_keys: Vec::new(),
            esni_record: Vec::new(),
            esni_padded_length: 260,
            padding_length: 6,
            signed_certificate_timestamp: Vec::new(),
            client_certificate_types: vec![ClientCertificateType::EcdsaSign],
            distinguished_names: Vec::new(),
            certificate_request_context: Vec::new(),
            ocsp_response: Vec::new(),
            certificate_status_source: None,
        }
    }

    /// Cipher suites in local preference order.
    #[inline(always)]
    pub fn cipher_suites(&self) -> &[CipherSuite] {
        &self.cipher_suites
    }

    /// Named groups in local preference order.
    #[inline(always)]
    pub fn named_groups(&self) -> &[NamedGroup] {
        &self.named_groups
    }

    /// Groups a client generates key shares for.
    #[inline(always)]
    pub fn key_share_groups(&self) -> &[NamedGroup] {
        &self.key_share_groups
    }

    /// EC point formats in local preference order.
    #[inline(always)]
    pub fn point_formats(&self) -> &[ECPointFormat] {
        &self.point_formats
    }

    /// Signature and hash algorithm pairs in local preference order.
    #[inline(always)]
    pub fn signature_algorithms(&self) -> &[SignatureAndHashAlgorithm] {
        &self.signature_algorithms
    }

    /// What to do when local and peer lists share nothing.
    #[inline(always)]
    pub fn negotiation_policy(&self) -> NegotiationPolicy {
        self.negotiation_policy
    }

    /// request_update for outgoing KeyUpdate messages that do not set one.
    #[inline(always)]
    pub fn key_update_request(&self) -> KeyUpdateRequest {
        self.key_update_request
    }

    /// Seed for the per-connection random generator.
    ///
    /// `None` draws from the thread RNG.
    #[inline(always)]
    pub fn rng_seed(&self) -> Option<u64> {
        self.rng_seed
    }

    /// Key used to sign ServerKeyExchange parameters.
    #[inline(always)]
    pub fn signing_key(&self) -> Option<&SigningKey> {
        self.signing_key.as_ref()
    }

    /// ESNI cipher suites a client is willing to use.
    #[inline(always)]
    pub fn esni_cipher_suites(&self) -> &[CipherSuite] {
        &self.esni_cipher_suites
    }

    /// ESNI groups a client is willing to use.
    #[inline(always)]
    pub fn esni_named_groups(&self) -> &[NamedGroup] {
        &self.esni_named_groups
    }

    /// Cipher suites the server publishes in its ESNI record.
    #[inline(always)]
    pub fn esni_server_cipher_suites(&self) -> &[CipherSuite] {
        &self.esni_server_cipher_suites
    }

    /// Static public keys the server publishes in its ESNI record.
    #[inline(always)]
    pub fn esni_server_key_shares(&self) -> &[KeyShareEntry] {
        &self.esni_server_key_shares
    }

    /// Static private keys a server decrypts ESNI with.
    #[inline(always)]
    pub fn esni_server_private_keys(&self) -> &[PrivateKey] {
        &self.esni_server_private_keys
    }

    /// Raw ESNIKeys record, hashed into the record digest.
    #[inline(always)]
    pub fn esni_record(&self) -> &[u8] {
        &self.esni_record
    }

    /// Length the inner server name list is padded to.
    #[inline(always)]
    pub fn esni_padded_length(&self) -> usize {
        self.esni_padded_length
    }

    /// Body length of an outgoing padding extension.
    #[inline(always)]
    pub fn padding_length(&self) -> usize {
        self.padding_length
    }

    /// Body of an outgoing signed_certificate_timestamp extension.
    #[inline(always)]
    pub fn signed_certificate_timestamp(&self) -> &[u8] {
        &self.signed_certificate_timestamp
    }

    /// Certificate types requested from a client (TLS 1.2).
    #[inline(always)]
    pub fn client_certificate_types(&self) -> &[ClientCertificateType] {
        &self.client_certificate_types
    }

    /// DER encoded distinguished names of acceptable CAs.
    #[inline(always)]
    pub fn distinguished_names(&self) -> &[Vec<u8>] {
        &self.distinguished_names
    }

    /// certificate_request_context for TLS 1.3 CertificateRequest.
    #[inline(always)]
    pub fn certificate_request_context(&self) -> &[u8] {
        &self.certificate_request_context
    }

    /// OCSP response a server staples into CertificateStatus.
    #[inline(always)]
    pub fn ocsp_response(&self) -> &[u8] {
        &self.ocsp_response
    }

    /// Collaborator resolving stapled OCSP responses.
    #[inline(always)]
    pub fn certificate_status_source(&self) -> Option<&Arc<dyn CertificateStatusSource>> {
        self.certificate_status_source.as_ref()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::from_builder(Config::builder())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("cipher_suites", &self.cipher_suites)
            .field("named_groups", &self.named_groups)
            .field("point_formats", &self.point_formats)
            .field("negotiation_policy", &self.negotiation_policy)
            .field("rng_seed", &self.rng_seed)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Config`].
pub struct ConfigBuilder {
    cipher_suites: Vec<CipherSuite>,
    named_groups: Vec<NamedGroup>,
    key_share_groups: Vec<NamedGroup>,
    point_formats: Vec<ECPointFormat>,
    signature_algorithms: Vec<SignatureAndHashAlgorithm>,
    negotiation_policy: NegotiationPolicy,
    key_update_request: KeyUpdateRequest,
    rng_seed: Option<u64>,
    signing_key: Option<SigningKey>,
    esni_cipher_suites: Vec<CipherSuite>,
    esni_named_groups: Vec<NamedGroup>,
    esni_server_cipher_suites: Vec<CipherSuite>,
    esni_server_key_shares: Vec<KeyShareEntry>,
    esni_server_private_keys: Vec<PrivateKey>,
    esni_record: Vec<u8>,
    esni_padded_length: usize,
    padding_length: usize,
    signed_certificate_timestamp: Vec<u8>,
    client_certificate_types: Vec<ClientCertificateType>,
    distinguished_names: Vec<Vec<u8>>,
    certificate_request_context: Vec<u8>,
    ocsp_response: Vec<u8>,
    certificate_status_source: Option<Arc<dyn CertificateStatusSource>>,
}

impl ConfigBuilder {
    /// Set the cipher suites.
    ///
    /// Defaults to AES-128-GCM, AES-256-GCM, ChaCha20-Poly1305.
    pub fn cipher_suites(mut self, suites: &[CipherSuite]) -> Self {
        self.cipher_suites = suites.to_vec();
        self
    }

    /// Set the named groups.
    ///
    /// Defaults to X25519, P-256, P-384, X448.
    pub fn named_groups(mut self, groups: &[NamedGroup]) -> Self {
        self.named_groups = groups.to_vec();
        self
    }

    /// Set the groups a client sends key shares for.
    ///
    /// Defaults to X25519.
    pub fn key_share_groups(mut self, groups: &[NamedGroup]) -> Self {
        self.key_share_groups = groups.to_vec();
        self
    }

    /// Set the EC point formats.
    ///
    /// Defaults to uncompressed only.
    pub fn point_formats(mut self, formats: &[ECPointFormat]) -> Self {
        self.point_formats = formats.to_vec();
        self
    }

    /// Set the signature and hash algorithms.
    ///
    /// Defaults to ECDSA with SHA-256, then ECDSA with SHA-384.
    pub fn signature_algorithms(mut self, algorithms: &[SignatureAndHashAlgorithm]) -> Self {
        self.signature_algorithms = algorithms.to_vec();
        self
    }

    /// Set the negotiation policy.
    ///
    /// Defaults to [`NegotiationPolicy::Permissive`].
    pub fn negotiation_policy(mut self, policy: NegotiationPolicy) -> Self {
        self.negotiation_policy = policy;
        self
    }

    /// Set the default KeyUpdate request.
    ///
    /// Defaults to `update_not_requested`.
    pub fn key_update_request(mut self, request: KeyUpdateRequest) -> Self {
        self.key_update_request = request;
        self
    }

    /// Seed the per-connection random generator.
    ///
    /// Defaults to unseeded.
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Set the ServerKeyExchange signing key.
    ///
    /// Without one, signatures are sent empty.
    pub fn signing_key(mut self, key: SigningKey) -> Self {
        self.signing_key = Some(key);
        self
    }

    /// Set the ESNI cipher suites a client offers.
    ///
    /// Defaults to AES-128-GCM.
    pub fn esni_cipher_suites(mut self, suites: &[CipherSuite]) -> Self {
        self.esni_cipher_suites = suites.to_vec();
        self
    }

    /// Set the ESNI groups a client offers.
    ///
    /// Defaults to X25519.
    pub fn esni_named_groups(mut self, groups: &[NamedGroup]) -> Self {
        self.esni_named_groups = groups.to_vec();
        self
    }

    /// Set the cipher suites published in the server ESNI record.
    ///
    /// Defaults to AES-128-GCM.
    pub fn esni_server_cipher_suites(mut self, suites: &[CipherSuite]) -> Self {
        self.esni_server_cipher_suites = suites.to_vec();
        self
    }

    /// Set the server's published ESNI public keys.
    pub fn esni_server_key_shares(mut self, entries: Vec<KeyShareEntry>) -> Self {
        self.esni_server_key_shares = entries;
        self
    }

    /// Set the server's ESNI private keys.
    pub fn esni_server_private_keys(mut self, keys: Vec<PrivateKey>) -> Self {
        self.esni_server_private_keys = keys;
        self
    }

    /// Set the raw ESNIKeys record.
    pub fn esni_record(mut self, record: &[u8]) -> Self {
        self.esni_record = record.to_vec();
        self
    }

    /// Set the inner server name padding target.
    ///
    /// Defaults to 260.
    pub fn esni_padded_length(mut self, len: usize) -> Self {
        self.esni_padded_length = len;
        self
    }

    /// Set the padding extension body length.
    ///
    /// Defaults to 6.
    pub fn padding_length(mut self, len: usize) -> Self {
        self.padding_length = len;
        self
    }

    /// Set the signed_certificate_timestamp body.
    pub fn signed_certificate_timestamp(mut self, sct: &[u8]) -> Self {
        self.signed_certificate_timestamp = sct.to_vec();
        self
    }

    /// Set the certificate types requested from a client.
    ///
    /// Defaults to ecdsa_sign.
    pub fn client_certificate_types(mut self, types: &[ClientCertificateType]) -> Self {
        self.client_certificate_types = types.to_vec();
        self
    }

    /// Set the acceptable CA distinguished names.
    pub fn distinguished_names(mut self, names: Vec<Vec<u8>>) -> Self {
        self.distinguished_names = names;
        self
    }

    /// Set the TLS 1.3 certificate_request_context.
    ///
    /// Defaults to empty.
    pub fn certificate_request_context(mut self, context: &[u8]) -> Self {
        self.certificate_request_context = context.to_vec();
        self
    }

    /// Set the OCSP response stapled by a server.
    pub fn ocsp_response(mut self, response: &[u8]) -> Self {
        self.ocsp_response = response.to_vec();
        self
    }

    /// Set the collaborator resolving stapled OCSP responses.
    ///
    /// Without one every status is reported as unknown.
    pub fn certificate_status_source(mut self, source: Arc<dyn CertificateStatusSource>) -> Self {
        self.certificate_status_source = Some(source);
        self
    }

    /// Build the configuration.
    ///
    /// Fails if a list negotiation needs to fall back on is empty.
    pub fn build(self) -> Result<Config, Error> {
        if self.cipher_suites.is_empty() {
            return Err(Error::InvalidConfig("cipher_suites is empty"));
        }
        if self.named_groups.is_empty() {
            return Err(Error::InvalidConfig("named_groups is empty"));
        }
        if self.point_formats.is_empty() {
            return Err(Error::InvalidConfig("point_formats is empty"));
        }
        if self.signature_algorithms.is_empty() {
            return Err(Error::InvalidConfig("signature_algorithms is empty"));
        }
        Ok(Config::from_builder(self))
    }
}

impl Config {
    fn from_builder(b: ConfigBuilder) -> Config {
        Config {
            cipher_suites: b.cipher_suites,
            named_groups: b.named_groups,
            key_share_groups: b.key_share_groups,
            point_formats: b.point_formats,
            signature_algorithms: b.signature_algorithms,
            negotiation_policy: b.negotiation_policy,
            key_update_request: b.key_update_request,
            rng_seed: b.rng_seed,
            signing_key: b.signing_key,
            esni_cipher_suites: b.esni_cipher_suites,
            esni_named_groups: b.esni_named_groups,
            esni_server_cipher_suites: b.esni_server_cipher_suites,
            esni_server_key_shares: b.esni_server_key_shares,
            esni_server_private_keys: b.esni_server_private_keys,
            esni_record: b.esni_record,
            esni_padded_length: b.esni_padded_length,
            padding_length: b.padding_length,
            signed_certificate_timestamp: b.signed_certificate_timestamp,
            client_certificate_types: b.client_certificate_types,
            distinguished_names: b.distinguished_names,
            certificate_request_context: b.certificate_request_context,
            ocsp_response: b.ocsp_response,
            certificate_status_source: b.certificate_status_source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.cipher_suites()[0], CipherSuite::TLS_AES_128_GCM_SHA256);
        assert_eq!(config.named_groups()[0], NamedGroup::X25519);
        assert_eq!(config.negotiation_policy(), NegotiationPolicy::Permissive);
        assert_eq!(config.padding_length(), 6);
        assert!(config.signing_key().is_none());
    }

    #[test]
    fn empty_lists_are_rejected() {
        let err = Config::builder().named_groups(&[]).build().unwrap_err();
        assert_eq!(err, Error::InvalidConfig("named_groups is empty"));
        assert!(Config::builder().cipher_suites(&[]).build().is_err());
    }

    #[test]
    fn builder_overrides() {
        let config = Config::builder()
            .negotiation_policy(NegotiationPolicy::Strict)
            .rng_seed(42)
            .key_update_request(KeyUpdateRequest::UpdateRequested)
            .build()
            .unwrap();
        assert_eq!(config.negotiation_policy(), NegotiationPolicy::Strict);
        assert_eq!(config.rng_seed(), Some(42));
        assert_eq!(config.key_update_request(), KeyUpdateRequest::UpdateRequested);
    }
}
