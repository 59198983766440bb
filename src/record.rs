//! TLS 1.3 record protection and rekeying.
//!
//! A rekey touches exactly one direction. Which one follows from comparing
//! the locally modelled role with the talking end:
//!
//! | local  | talking | relation  | direction |
//! |--------|---------|-----------|-----------|
//! | client | client  | same      | write     |
//! | client | server  | different | read      |
//! | server | server  | same      | write     |
//! | server | client  | different | read      |
//!
//! Keys always come from the traffic secret of the talking end, since the
//! talking end is the role whose write keys are being installed.

use zeroize::Zeroize;

use crate::buffer::hex;
use crate::crypto::key_schedule::derive_traffic_key_iv;
use crate::crypto::{AeadCipher, CipherSuiteDescriptor, AEAD_IV_LEN};
use crate::state::ConnectionState;
use crate::types::{CipherSuite, ConnectionEnd, ContentType};
use crate::Error;

const RECORD_HEADER_LEN: usize = 5;
const LEGACY_RECORD_VERSION: [u8; 2] = [0x03, 0x03];
const MAX_CIPHERTEXT_LEN: usize = (1 << 14) + 256;

/// Which traffic secrets a key set is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySetType {
    HandshakeTrafficSecrets,
    ApplicationTrafficSecrets,
}

/// Direction of a record cipher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoleRelation {
    Same,
    Different,
}

const REKEY_TABLE: [(RoleRelation, Direction); 2] = [
    (RoleRelation::Same, Direction::Write),
    (RoleRelation::Different, Direction::Read),
];

/// Direction a rekey installs into for this `(local_role, talking_end)` pair.
pub fn resolve_direction(local_role: ConnectionEnd, talking_end: ConnectionEnd) -> Direction {
    let relation = if local_role == talking_end {
        RoleRelation::Same
    } else {
        RoleRelation::Different
    };
    REKEY_TABLE
        .iter()
        .find(|(r, _)| *r == relation)
        .map(|(_, d)| *d)
        .unwrap_or(Direction::Read)
}

/// Symmetric key material for one record epoch.
///
/// A fresh set is built on every rekey and zeroized when dropped.
pub struct KeySet {
    pub client_write_key: Vec<u8>,
    pub client_write_iv: Vec<u8>,
    pub server_write_key: Vec<u8>,
    pub server_write_iv: Vec<u8>,
}

impl KeySet {
    /// Derive client and server write keys from their traffic secrets.
    pub fn derive(
        suite: CipherSuite,
        client_secret: &[u8],
        server_secret: &[u8],
    ) -> Result<KeySet, Error> {
        let d = CipherSuiteDescriptor::lookup(suite)?;
        let (client_write_key, client_write_iv) =
            derive_traffic_key_iv(d.hash, client_secret, d.key_len, d.iv_len)?;
        let (server_write_key, server_write_iv) =
            derive_traffic_key_iv(d.hash, server_secret, d.key_len, d.iv_len)?;
        Ok(KeySet {
            client_write_key,
            client_write_iv,
            server_write_key,
            server_write_iv,
        })
    }

    /// Key set holding only the write key and IV of `end`.
    pub fn derive_for_end(
        suite: CipherSuite,
        end: ConnectionEnd,
        secret: &[u8],
    ) -> Result<KeySet, Error> {
        let d = CipherSuiteDescriptor::lookup(suite)?;
        let (key, iv) = derive_traffic_key_iv(d.hash, secret, d.key_len, d.iv_len)?;
        let mut keys = KeySet {
            client_write_key: Vec::new(),
            client_write_iv: Vec::new(),
            server_write_key: Vec::new(),
            server_write_iv: Vec::new(),
        };
        match end {
            ConnectionEnd::Client => {
                keys.client_write_key = key;
                keys.client_write_iv = iv;
            }
            ConnectionEnd::Server => {
                keys.server_write_key = key;
                keys.server_write_iv = iv;
            }
        }
        Ok(keys)
    }

    /// Write key and IV of `end`.
    pub fn for_end(&self, end: ConnectionEnd) -> (&[u8], &[u8]) {
        match end {
            ConnectionEnd::Client => (&self.client_write_key, &self.client_write_iv),
            ConnectionEnd::Server => (&self.server_write_key, &self.server_write_iv),
        }
    }
}

impl Drop for KeySet {
    fn drop(&mut self) {
        self.client_write_key.zeroize();
        self.client_write_iv.zeroize();
        self.server_write_key.zeroize();
        self.server_write_iv.zeroize();
    }
}

impl std::fmt::Debug for KeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySet")
            .field("key_len", &self.client_write_key.len())
            .finish_non_exhaustive()
    }
}

/// AEAD bound to one role's write key and IV.
#[derive(Debug)]
pub struct RecordCipher {
    suite: CipherSuite,
    owner: ConnectionEnd,
    aead: AeadCipher,
    iv: [u8; AEAD_IV_LEN],
}

impl RecordCipher {
    /// Cipher using the write key of `owner` from `keys`.
    pub fn new(suite: CipherSuite, keys: &KeySet, owner: ConnectionEnd) -> Result<Self, Error> {
        let d = CipherSuiteDescriptor::lookup(suite)?;
        let (key, iv) = keys.for_end(owner);
        let iv: [u8; AEAD_IV_LEN] = iv.try_into().map_err(|_| {
            Error::CryptoOperationError(format!("record IV must be 12 bytes, got {}", iv.len()))
        })?;
        Ok(RecordCipher {
            suite,
            owner,
            aead: AeadCipher::new(d.aead, key)?,
            iv,
        })
    }

    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    /// Role whose write keys this cipher holds.
    pub fn owner(&self) -> ConnectionEnd {
        self.owner
    }

    /// Per-record nonce: the IV xor the left padded sequence number.
    fn nonce(&self, seq: u64) -> [u8; AEAD_IV_LEN] {
        let mut nonce = self.iv;
        for (n, s) in nonce[AEAD_IV_LEN - 8..].iter_mut().zip(seq.to_be_bytes()) {
            *n ^= s;
        }
        nonce
    }

    /// Protect `payload` as a full TLSCiphertext record.
    pub fn encrypt(
        &self,
        seq: u64,
        content_type: ContentType,
        payload: &[u8],
    ) -> Result<Vec<u8>, Error> {
        let d = CipherSuiteDescriptor::lookup(self.suite)?;

        let mut inner = Vec::with_capacity(payload.len() + 1);
        inner.extend_from_slice(payload);
        inner.push(content_type.as_u8());

        let len = inner.len() + d.tag_len;
        if len > MAX_CIPHERTEXT_LEN {
            return Err(Error::PreparationError(format!(
                "record of {} bytes exceeds the {} byte limit",
                len, MAX_CIPHERTEXT_LEN
            )));
        }
        let mut record = Vec::with_capacity(RECORD_HEADER_LEN + len);
        record.push(ContentType::ApplicationData.as_u8());
        record.extend_from_slice(&LEGACY_RECORD_VERSION);
        record.extend_from_slice(&(len as u16).to_be_bytes());

        let sealed = self.aead.seal(&self.nonce(seq), &record, &inner)?;
        record.extend_from_slice(&sealed);
        Ok(record)
    }

    /// Open a TLSCiphertext record, returning the inner content type and payload.
    pub fn decrypt(&self, seq: u64, record: &[u8]) -> Result<(ContentType, Vec<u8>), Error> {
        if record.len() < RECORD_HEADER_LEN {
            return Err(Error::ParseError("record shorter than its header".into()));
        }
        let (header, body) = record.split_at(RECORD_HEADER_LEN);
        let len = u16::from_be_bytes([header[3], header[4]]) as usize;
        if len != body.len() || len > MAX_CIPHERTEXT_LEN {
            return Err(Error::ParseError(format!(
                "record length {} does not match body of {}",
                len,
                body.len()
            )));
        }

        let mut inner = self.aead.open(&self.nonce(seq), header, body)?;

        let Some(end) = inner.iter().rposition(|b| *b != 0) else {
            return Err(Error::ParseError("record has no content type".into()));
        };
        let content_type = ContentType::from_u8(inner[end]);
        inner.truncate(end);
        Ok((content_type, inner))
    }
}

/// Derive fresh keys for one direction and install them.
///
/// The cipher and its zeroed sequence number are swapped in together. Only
/// the talking end's secret is read. Returns the direction that was rekeyed.
pub fn rekey(
    conn: &mut ConnectionState,
    epoch: KeySetType,
    local_role: ConnectionEnd,
    talking_end: ConnectionEnd,
) -> Result<Direction, Error> {
    let direction = resolve_direction(local_role, talking_end);
    let suite = conn
        .cipher_suite()
        .ok_or_else(|| Error::PreparationError("rekey without a selected cipher suite".into()))?;

    let owning_secret = match (epoch, talking_end) {
        (KeySetType::HandshakeTrafficSecrets, ConnectionEnd::Client) => {
            conn.client_handshake_traffic_secret()
        }
        (KeySetType::HandshakeTrafficSecrets, ConnectionEnd::Server) => {
            conn.server_handshake_traffic_secret()
        }
        (KeySetType::ApplicationTrafficSecrets, ConnectionEnd::Client) => {
            conn.client_application_traffic_secret()
        }
        (KeySetType::ApplicationTrafficSecrets, ConnectionEnd::Server) => {
            conn.server_application_traffic_secret()
        }
    };
    if owning_secret.is_empty() {
        return Err(Error::PreparationError(format!(
            "no {:?} {:?} secret to rekey from",
            talking_end, epoch
        )));
    }

    let keys = KeySet::derive_for_end(suite, talking_end, owning_secret)?;
    let cipher = RecordCipher::new(suite, &keys, talking_end)?;
    trace!(
        "{:?} {:?} key {}",
        talking_end,
        epoch,
        hex(keys.for_end(talking_end).0)
    );

    conn.install_cipher(direction, cipher);
    debug!(
        "Rekeyed {:?} side with {:?} (local {:?}, talking {:?})",
        direction, epoch, local_role, talking_end
    );
    Ok(direction)
}
