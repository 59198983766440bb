//! Live state of one connection.
//!
//! Every message handler reads and mutates a [`ConnectionState`]. A state is
//! created per connection attempt, owned by exactly one pipeline and dropped
//! at teardown. Secrets are zeroized on drop.

use std::sync::Arc;

use zeroize::Zeroize;

use crate::buffer::hex;
use crate::crypto::PrivateKey;
use crate::message::extensions::{KeyShareEntry, ServerName};
use crate::ocsp::CertificateStatus;
use crate::record::{Direction, RecordCipher};
use crate::rng::SeededRng;
use crate::types::{CipherSuite, ConnectionEnd, ContentType, ECPointFormat, NamedGroup};
use crate::types::{ProtocolVersion, SignatureAndHashAlgorithm};
use crate::{Config, Error};

/// Installed cipher plus the sequence number that belongs to it.
///
/// Replaced as a unit so a cipher can never be paired with a stale
/// sequence number.
#[derive(Debug, Default)]
struct CipherState {
    cipher: Option<RecordCipher>,
    seq: u64,
}

/// Negotiated parameters, secrets and record state of one connection.
pub struct ConnectionState {
    config: Arc<Config>,
    rng: SeededRng,

    local_role: ConnectionEnd,
    talking_end: ConnectionEnd,
    version: ProtocolVersion,
    cipher_suite: Option<CipherSuite>,
    named_group: Option<NamedGroup>,

    client_random: [u8; 32],
    server_random: [u8; 32],

    client_handshake_traffic_secret: Vec<u8>,
    server_handshake_traffic_secret: Vec<u8>,
    client_application_traffic_secret: Vec<u8>,
    server_application_traffic_secret: Vec<u8>,

    read: CipherState,
    write: CipherState,

    peer_named_groups: Vec<NamedGroup>,
    peer_point_formats: Vec<ECPointFormat>,
    peer_signature_algorithms: Vec<SignatureAndHashAlgorithm>,

    client_key_shares: Vec<KeyShareEntry>,
    server_key_share: Option<KeyShareEntry>,
    key_share_private_keys: Vec<PrivateKey>,
    key_exchange_private_key: Option<PrivateKey>,
    peer_ephemeral_public_key: Vec<u8>,
    premaster_secret: Vec<u8>,

    esni_client_nonce: Option<[u8; 16]>,
    esni_server_names: Vec<ServerName>,

    certificate_status: Option<CertificateStatus>,
    signed_certificate_timestamp: Vec<u8>,
    extended_master_secret: bool,
    certificate_request_context: Vec<u8>,
    client_authentication_requested: bool,
}

impl ConnectionState {
    /// Fresh state for `local_role`. The local role is fixed for the life of
    /// the connection.
    pub fn new(config: Arc<Config>, local_role: ConnectionEnd) -> Self {
        let rng = SeededRng::new(config.rng_seed());
        ConnectionState {
            config,
            rng,
            local_role,
            talking_end: local_role,
            version: ProtocolVersion::Tls13,
            cipher_suite: None,
            named_group: None,
            client_random: [0; 32],
            server_random: [0; 32],
            client_handshake_traffic_secret: Vec::new(),
            server_handshake_traffic_secret: Vec::new(),
            client_application_traffic_secret: Vec::new(),
            server_application_traffic_secret: Vec::new(),
            read: CipherState::default(),
            write: CipherState::default(),
            peer_named_groups: Vec::new(),
            peer_point_formats: Vec::new(),
            peer_signature_algorithms: Vec::new(),
            client_key_shares: Vec::new(),
            server_key_share: None,
            key_share_private_keys: Vec::new(),
            key_exchange_private_key: None,
            peer_ephemeral_public_key: Vec::new(),
            premaster_secret: Vec::new(),
            esni_client_nonce: None,
            esni_server_names: Vec::new(),
            certificate_status: None,
            signed_certificate_timestamp: Vec::new(),
            extended_master_secret: false,
            certificate_request_context: Vec::new(),
            client_authentication_requested: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle on the configuration, for callers that also need
    /// `&mut self`.
    pub(crate) fn config_arc(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    pub(crate) fn rng(&mut self) -> &mut SeededRng {
        &mut self.rng
    }

    pub fn local_role(&self) -> ConnectionEnd {
        self.local_role
    }

    /// Role about to transmit the next message.
    pub fn talking_end(&self) -> ConnectionEnd {
        self.talking_end
    }

    pub fn set_talking_end(&mut self, end: ConnectionEnd) {
        self.talking_end = end;
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn set_version(&mut self, version: ProtocolVersion) {
        self.version = version;
    }

    pub fn cipher_suite(&self) -> Option<CipherSuite> {
        self.cipher_suite
    }

    /// Select the cipher suite. Changing an already selected suite is
    /// allowed but logged.
    pub fn set_cipher_suite(&mut self, suite: CipherSuite) {
        if let Some(old) = self.cipher_suite {
            if old != suite {
                warn!("Cipher suite changed mid-connection: {:?} -> {:?}", old, suite);
            }
        }
        self.cipher_suite = Some(suite);
    }

    pub fn named_group(&self) -> Option<NamedGroup> {
        self.named_group
    }

    /// Select the named group. Changing an already selected group is
    /// allowed but logged.
    pub fn set_named_group(&mut self, group: NamedGroup) {
        if let Some(old) = self.named_group {
            if old != group {
                warn!("Named group changed mid-connection: {:?} -> {:?}", old, group);
            }
        }
        self.named_group = Some(group);
    }

    pub fn client_random(&self) -> &[u8; 32] {
        &self.client_random
    }

    pub fn set_client_random(&mut self, random: [u8; 32]) {
        self.client_random = random;
    }

    pub fn server_random(&self) -> &[u8; 32] {
        &self.server_random
    }

    pub fn set_server_random(&mut self, random: [u8; 32]) {
        self.server_random = random;
    }

    pub fn client_handshake_traffic_secret(&self) -> &[u8] {
        &self.client_handshake_traffic_secret
    }

    pub fn server_handshake_traffic_secret(&self) -> &[u8] {
        &self.server_handshake_traffic_secret
    }

    pub fn set_handshake_traffic_secrets(&mut self, client: &[u8], server: &[u8]) {
        self.client_handshake_traffic_secret.zeroize();
        self.server_handshake_traffic_secret.zeroize();
        self.client_handshake_traffic_secret = client.to_vec();
        self.server_handshake_traffic_secret = server.to_vec();
    }

    pub fn client_application_traffic_secret(&self) -> &[u8] {
        &self.client_application_traffic_secret
    }

    pub fn server_application_traffic_secret(&self) -> &[u8] {
        &self.server_application_traffic_secret
    }

    pub fn set_application_traffic_secrets(&mut self, client: &[u8], server: &[u8]) {
        self.client_application_traffic_secret.zeroize();
        self.server_application_traffic_secret.zeroize();
        self.client_application_traffic_secret = client.to_vec();
        self.server_application_traffic_secret = server.to_vec();
        trace!(
            "Application traffic secrets: client {} server {}",
            hex(client),
            hex(server)
        );
    }

    pub fn read_seq(&self) -> u64 {
        self.read.seq
    }

    pub fn write_seq(&self) -> u64 {
        self.write.seq
    }

    pub fn read_cipher(&self) -> Option<&RecordCipher> {
        self.read.cipher.as_ref()
    }

    pub fn write_cipher(&self) -> Option<&RecordCipher> {
        self.write.cipher.as_ref()
    }

    /// Install `cipher` for `direction` with its sequence number at zero.
    pub(crate) fn install_cipher(&mut self, direction: Direction, cipher: RecordCipher) {
        let fresh = CipherState {
            cipher: Some(cipher),
            seq: 0,
        };
        match direction {
            Direction::Read => self.read = fresh,
            Direction::Write => self.write = fresh,
        }
    }

    /// Protect an outgoing record with the write cipher.
    pub fn encrypt_record(
        &mut self,
        content_type: ContentType,
        payload: &[u8],
    ) -> Result<Vec<u8>, Error> {
        let cipher = self
            .write
            .cipher
            .as_ref()
            .ok_or_else(|| Error::PreparationError("no write cipher installed".into()))?;
        let record = cipher.encrypt(self.write.seq, content_type, payload)?;
        self.write.seq += 1;
        Ok(record)
    }

    /// Open an incoming record with the read cipher.
    ///
    /// The read sequence number only advances on success.
    pub fn decrypt_record(&mut self, record: &[u8]) -> Result<(ContentType, Vec<u8>), Error> {
        let cipher = self
            .read
            .cipher
            .as_ref()
            .ok_or_else(|| Error::PreparationError("no read cipher installed".into()))?;
        let opened = cipher.decrypt(self.read.seq, record)?;
        self.read.seq += 1;
        Ok(opened)
    }

    pub fn peer_named_groups(&self) -> &[NamedGroup] {
        &self.peer_named_groups
    }

    pub fn set_peer_named_groups(&mut self, groups: &[NamedGroup]) {
        self.peer_named_groups = groups.to_vec();
    }

    pub fn peer_point_formats(&self) -> &[ECPointFormat] {
        &self.peer_point_formats
    }

    pub fn set_peer_point_formats(&mut self, formats: &[ECPointFormat]) {
        self.peer_point_formats = formats.to_vec();
    }

    pub fn peer_signature_algorithms(&self) -> &[SignatureAndHashAlgorithm] {
        &self.peer_signature_algorithms
    }

    pub fn set_peer_signature_algorithms(&mut self, algorithms: &[SignatureAndHashAlgorithm]) {
        self.peer_signature_algorithms = algorithms.to_vec();
    }

    /// Key shares offered in the ClientHello.
    pub fn client_key_shares(&self) -> &[KeyShareEntry] {
        &self.client_key_shares
    }

    pub fn set_client_key_shares(&mut self, entries: Vec<KeyShareEntry>) {
        self.client_key_shares = entries;
    }

    /// Key share selected in the ServerHello.
    pub fn server_key_share(&self) -> Option<&KeyShareEntry> {
        self.server_key_share.as_ref()
    }

    pub fn set_server_key_share(&mut self, entry: KeyShareEntry) {
        self.server_key_share = Some(entry);
    }

    /// Private keys behind our own key shares.
    pub fn key_share_private_keys(&self) -> &[PrivateKey] {
        &self.key_share_private_keys
    }

    pub(crate) fn set_key_share_private_keys(&mut self, keys: Vec<PrivateKey>) {
        self.key_share_private_keys = keys;
    }

    /// Private key behind our ECDHE ServerKeyExchange.
    pub fn key_exchange_private_key(&self) -> Option<&PrivateKey> {
        self.key_exchange_private_key.as_ref()
    }

    pub(crate) fn set_key_exchange_private_key(&mut self, key: PrivateKey) {
        self.key_exchange_private_key = Some(key);
    }

    /// Ephemeral public key sent by the server in ServerKeyExchange.
    pub fn peer_ephemeral_public_key(&self) -> &[u8] {
        &self.peer_ephemeral_public_key
    }

    pub fn set_peer_ephemeral_public_key(&mut self, key: &[u8]) {
        self.peer_ephemeral_public_key = key.to_vec();
    }

    /// (EC)DHE shared secret of the handshake key exchange.
    pub fn premaster_secret(&self) -> &[u8] {
        &self.premaster_secret
    }

    pub fn set_premaster_secret(&mut self, secret: Vec<u8>) {
        self.premaster_secret.zeroize();
        self.premaster_secret = secret;
    }

    /// Nonce from the decrypted (server) or sent (client) ClientESNIInner.
    pub fn esni_client_nonce(&self) -> Option<&[u8; 16]> {
        self.esni_client_nonce.as_ref()
    }

    pub fn set_esni_client_nonce(&mut self, nonce: [u8; 16]) {
        self.esni_client_nonce = Some(nonce);
    }

    pub fn esni_server_names(&self) -> &[ServerName] {
        &self.esni_server_names
    }

    pub fn set_esni_server_names(&mut self, names: Vec<ServerName>) {
        self.esni_server_names = names;
    }

    pub fn certificate_status(&self) -> Option<&CertificateStatus> {
        self.certificate_status.as_ref()
    }

    pub fn set_certificate_status(&mut self, status: CertificateStatus) {
        self.certificate_status = Some(status);
    }

    pub fn signed_certificate_timestamp(&self) -> &[u8] {
        &self.signed_certificate_timestamp
    }

    pub fn set_signed_certificate_timestamp(&mut self, sct: &[u8]) {
        self.signed_certificate_timestamp = sct.to_vec();
    }

    pub fn extended_master_secret(&self) -> bool {
        self.extended_master_secret
    }

    pub fn set_extended_master_secret(&mut self, enabled: bool) {
        self.extended_master_secret = enabled;
    }

    pub fn certificate_request_context(&self) -> &[u8] {
        &self.certificate_request_context
    }

    pub fn set_certificate_request_context(&mut self, context: &[u8]) {
        self.certificate_request_context = context.to_vec();
    }

    pub fn client_authentication_requested(&self) -> bool {
        self.client_authentication_requested
    }

    pub fn set_client_authentication_requested(&mut self, requested: bool) {
        self.client_authentication_requested = requested;
    }
}

impl Drop for ConnectionState {
    fn drop(&mut self) {
        self.client_handshake_traffic_secret.zeroize();
        self.server_handshake_traffic_secret.zeroize();
        self.client_application_traffic_secret.zeroize();
        self.server_application_traffic_secret.zeroize();
        self.premaster_secret.zeroize();
    }
}

impl std::fmt::Debug for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionState")
            .field("local_role", &self.local_role)
            .field("talking_end", &self.talking_end)
            .field("version", &self.version)
            .field("cipher_suite", &self.cipher_suite)
            .field("named_group", &self.named_group)
            .field("read_seq", &self.read.seq)
            .field("write_seq", &self.write.seq)
            .finish_non_exhaustive()
    }
}
