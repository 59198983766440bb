//! Encrypted SNI key derivation and sealing.
//!
//! Both directions share one derivation:
//!
//! ```text
//! contents      = u16 len || record_digest || group || u16 len || key_share || client_random
//! contents_hash = Hash(contents)
//! master        = HKDF-Extract(0, ECDH(esni key, peer key))
//! key           = HKDF-Expand-Label(master, "esni key", contents_hash, key_len)
//! iv            = HKDF-Expand-Label(master, "esni iv", contents_hash, 12)
//! ```
//!
//! The sealed payload is authenticated with the ClientHello `client_shares`
//! list as associated data.

use zeroize::Zeroize;

use crate::buffer::{hex, Buf};
use crate::crypto::hash;
use crate::crypto::key_schedule::{expand_label, extract};
use crate::crypto::{compute_shared_secret, generate_ephemeral, AeadCipher, PrivateKey};
use crate::crypto::{CipherSuiteDescriptor, AEAD_IV_LEN};
use crate::message::extensions::{serialize_client_shares, ClientEncryptedSni, KeyShareEntry};
use crate::negotiate::negotiate;
use crate::rng::SeededRng;
use crate::types::{CipherSuite, NamedGroup};
use crate::{Config, Error};

/// Groups with an ESNI implementation.
pub const ESNI_GROUPS: &[NamedGroup] = &[NamedGroup::X25519, NamedGroup::X448, NamedGroup::Secp256r1];

/// Suites with an ESNI implementation.
pub const ESNI_CIPHER_SUITES: &[CipherSuite] = &[
    CipherSuite::TLS_AES_128_GCM_SHA256,
    CipherSuite::TLS_AES_256_GCM_SHA384,
    CipherSuite::TLS_CHACHA20_POLY1305_SHA256,
    CipherSuite::TLS_AES_128_CCM_SHA256,
    CipherSuite::TLS_AES_128_CCM_8_SHA256,
];

/// Intermediate values of one ESNI derivation. Zeroized on drop.
#[derive(Debug, Clone, Default)]
pub struct EsniComputations {
    pub shared_secret: Vec<u8>,
    pub contents: Vec<u8>,
    pub contents_hash: Vec<u8>,
    pub master_secret: Vec<u8>,
    pub key: Vec<u8>,
    pub iv: Vec<u8>,
    /// Serialized `client_shares`, used as AAD.
    pub client_hello_key_share: Vec<u8>,
}

impl Drop for EsniComputations {
    fn drop(&mut self) {
        self.shared_secret.zeroize();
        self.master_secret.zeroize();
        self.key.zeroize();
        self.iv.zeroize();
    }
}

impl EsniComputations {
    fn nonce(&self) -> Result<[u8; AEAD_IV_LEN], Error> {
        self.iv
            .as_slice()
            .try_into()
            .map_err(|_| Error::CryptoOperationError("ESNI IV must be 12 bytes".into()))
    }
}

/// ESNI engine over one configuration.
pub struct EsniCodec<'a> {
    config: &'a Config,
}

impl<'a> EsniCodec<'a> {
    pub fn new(config: &'a Config) -> Self {
        EsniCodec { config }
    }

    /// Cipher suite and group for a client ESNI extension.
    ///
    /// Candidates are the client's configured entries that have an
    /// implementation, matched against what the server publishes.
    pub fn negotiate(&self) -> Result<(CipherSuite, NamedGroup), Error> {
        let policy = self.config.negotiation_policy();

        let mut suites: Vec<CipherSuite> = self
            .config
            .esni_cipher_suites()
            .iter()
            .copied()
            .filter(|s| ESNI_CIPHER_SUITES.contains(s))
            .collect();
        if suites.is_empty() {
            warn!("No implemented ESNI cipher suite configured");
            suites.push(ESNI_CIPHER_SUITES[0]);
        }
        let suite = negotiate(
            "ESNI cipher suite",
            &suites,
            self.config.esni_server_cipher_suites(),
            policy,
        )?;

        let mut groups: Vec<NamedGroup> = self
            .config
            .esni_named_groups()
            .iter()
            .copied()
            .filter(|g| ESNI_GROUPS.contains(g))
            .collect();
        if groups.is_empty() {
            warn!("No implemented ESNI group configured");
            groups.push(ESNI_GROUPS[0]);
        }
        let server_groups: Vec<NamedGroup> = self
            .config
            .esni_server_key_shares()
            .iter()
            .map(|e| e.group)
            .collect();
        let group = negotiate("ESNI named group", &groups, &server_groups, policy)?;

        debug!("ESNI using {:?} with {:?}", suite, group);
        Ok((suite, group))
    }

    /// Published server key for `group`, or the first one with a warning.
    pub fn server_public_key(&self, group: NamedGroup) -> Result<&'a KeyShareEntry, Error> {
        let shares = self.config.esni_server_key_shares();
        if let Some(entry) = shares.iter().find(|e| e.group == group) {
            return Ok(entry);
        }
        let first = shares
            .first()
            .ok_or_else(|| Error::PreparationError("no ESNI server key shares".into()))?;
        warn!("No ESNI server key for {:?}, using the {:?} key", group, first.group);
        Ok(first)
    }

    /// Static private key for `group`, or the first one with a warning.
    pub fn server_private_key(&self, group: NamedGroup) -> Result<&'a PrivateKey, Error> {
        let keys = self.config.esni_server_private_keys();
        if let Some(key) = keys.iter().find(|k| k.group() == group) {
            return Ok(key);
        }
        let first = keys
            .first()
            .ok_or_else(|| Error::PreparationError("no ESNI server private keys".into()))?;
        warn!("No ESNI private key for {:?}, using the {:?} key", group, first.group());
        Ok(first)
    }

    /// Digest of the published ESNIKeys record.
    pub fn record_digest(&self, suite: CipherSuite) -> Result<Vec<u8>, Error> {
        let descriptor = CipherSuiteDescriptor::lookup(suite)?;
        hash::digest(descriptor.hash, self.config.esni_record())
    }

    /// Seal `inner` for the server.
    ///
    /// Returns the wire fields and the derivation that produced them.
    pub fn encrypt(
        &self,
        rng: &mut SeededRng,
        client_random: &[u8],
        client_shares: &[KeyShareEntry],
        inner: &[u8],
    ) -> Result<(ClientEncryptedSni, EsniComputations), Error> {
        let (suite, group) = self.negotiate()?;
        let (private, public) = generate_ephemeral(group, rng)?;
        let key_share = KeyShareEntry::new(group, &public);

        let server_key = self.server_public_key(group)?;
        let shared = compute_shared_secret(&private, &server_key.key_exchange, group)?;
        let record_digest = self.record_digest(suite)?;

        let computations =
            derive(suite, shared, &record_digest, &key_share, client_random, client_shares)?;

        let descriptor = CipherSuiteDescriptor::lookup(suite)?;
        let cipher = AeadCipher::new(descriptor.aead, &computations.key)?;
        let encrypted_sni = cipher.seal(
            &computations.nonce()?,
            &computations.client_hello_key_share,
            inner,
        )?;
        debug!("Encrypted SNI: {}", hex(&encrypted_sni));

        Ok((
            ClientEncryptedSni {
                cipher_suite: suite,
                key_share,
                record_digest,
                encrypted_sni,
            },
            computations,
        ))
    }

    /// Open a client's encrypted SNI with the server's static key.
    pub fn decrypt(
        &self,
        esni: &ClientEncryptedSni,
        client_random: &[u8],
        client_shares: &[KeyShareEntry],
    ) -> Result<(Vec<u8>, EsniComputations), Error> {
        let descriptor = CipherSuiteDescriptor::lookup(esni.cipher_suite)?;
        let group = esni.key_share.group;
        let private = self.server_private_key(group)?;
        let shared = compute_shared_secret(private, &esni.key_share.key_exchange, group)?;

        let computations = derive(
            esni.cipher_suite,
            shared,
            &esni.record_digest,
            &esni.key_share,
            client_random,
            client_shares,
        )?;

        let cipher = AeadCipher::new(descriptor.aead, &computations.key)?;
        let inner = cipher.open(
            &computations.nonce()?,
            &computations.client_hello_key_share,
            &esni.encrypted_sni,
        )?;
        debug!("Decrypted ClientESNIInner: {}", hex(&inner));
        Ok((inner, computations))
    }
}

/// ESNIContents for a key share.
pub fn esni_contents(record_digest: &[u8], key_share: &KeyShareEntry, client_random: &[u8]) -> Vec<u8> {
    let mut out = Buf::new();
    out.push_vec_u16(record_digest);
    key_share.serialize(&mut out);
    out.extend_from_slice(client_random);
    out.into_vec()
}

fn derive(
    suite: CipherSuite,
    shared_secret: Vec<u8>,
    record_digest: &[u8],
    key_share: &KeyShareEntry,
    client_random: &[u8],
    client_shares: &[KeyShareEntry],
) -> Result<EsniComputations, Error> {
    let descriptor = CipherSuiteDescriptor::lookup(suite)?;
    let hash_alg = descriptor.hash;

    let mut c = EsniComputations::default();
    c.shared_secret = shared_secret;
    c.contents = esni_contents(record_digest, key_share, client_random);
    c.contents_hash = hash::digest(hash_alg, &c.contents)?;
    c.master_secret = extract(hash_alg, None, &c.shared_secret)?;
    c.key = expand_label(hash_alg, &c.master_secret, "esni key", &c.contents_hash, descriptor.key_len)?;
    c.iv = expand_label(hash_alg, &c.master_secret, "esni iv", &c.contents_hash, AEAD_IV_LEN)?;

    let mut aad = Buf::new();
    serialize_client_shares(client_shares, &mut aad);
    c.client_hello_key_share = aad.into_vec();

    trace!("ESNI contents hash: {}", hex(&c.contents_hash));
    trace!("ESNI master secret: {}", hex(&c.master_secret));
    trace!("ESNI key: {} iv: {}", hex(&c.key), hex(&c.iv));
    Ok(c)
}
