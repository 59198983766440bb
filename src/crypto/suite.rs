//! Static facts about the TLS 1.3 cipher suites.

use crate::types::{CipherSuite, HashAlgorithm};
use crate::Error;

/// AEAD constructions behind the TLS 1.3 suites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeadAlgorithm {
    Aes128Gcm,
    Aes256Gcm,
    ChaCha20Poly1305,
    Aes128Ccm,
    Aes128Ccm8,
}

/// Key, IV and tag sizes plus the HKDF hash of one suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherSuiteDescriptor {
    pub suite: CipherSuite,
    pub aead: AeadAlgorithm,
    pub key_len: usize,
    pub iv_len: usize,
    pub tag_len: usize,
    pub hash: HashAlgorithm,
}

/// Every AEAD IV in TLS 1.3 is 12 bytes.
pub const AEAD_IV_LEN: usize = 12;

static DESCRIPTORS: &[CipherSuiteDescriptor] = &[
    CipherSuiteDescriptor {
        suite: CipherSuite::TLS_AES_128_GCM_SHA256,
        aead: AeadAlgorithm::Aes128Gcm,
        key_len: 16,
        iv_len: AEAD_IV_LEN,
        tag_len: 16,
        hash: HashAlgorithm::SHA256,
    },
    CipherSuiteDescriptor {
        suite: CipherSuite::TLS_AES_256_GCM_SHA384,
        aead: AeadAlgorithm::Aes256Gcm,
        key_len: 32,
        iv_len: AEAD_IV_LEN,
        tag_len: 16,
        hash: HashAlgorithm::SHA384,
    },
    CipherSuiteDescriptor {
        suite: CipherSuite::TLS_CHACHA20_POLY1305_SHA256,
        aead: AeadAlgorithm::ChaCha20Poly1305,
        key_len: 32,
        iv_len: AEAD_IV_LEN,
        tag_len: 16,
        hash: HashAlgorithm::SHA256,
    },
    CipherSuiteDescriptor {
        suite: CipherSuite::TLS_AES_128_CCM_SHA256,
        aead: AeadAlgorithm::Aes128Ccm,
        key_len: 16,
        iv_len: AEAD_IV_LEN,
        tag_len: 16,
        hash: HashAlgorithm::SHA256,
    },
    CipherSuiteDescriptor {
        suite: CipherSuite::TLS_AES_128_CCM_8_SHA256,
        aead: AeadAlgorithm::Aes128Ccm8,
        key_len: 16,
        iv_len: AEAD_IV_LEN,
        tag_len: 8,
        hash: HashAlgorithm::SHA256,
    },
];

impl CipherSuiteDescriptor {
    /// Descriptor for `suite`, or `UnsupportedAlgorithm` for unknown code points.
    pub fn lookup(suite: CipherSuite) -> Result<&'static CipherSuiteDescriptor, Error> {
        DESCRIPTORS
            .iter()
            .find(|d| d.suite == suite)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("cipher suite {:?}", suite)))
    }

    /// Suites with an AEAD implementation, in preference order.
    pub fn implemented() -> impl Iterator<Item = CipherSuite> {
        DESCRIPTORS.iter().map(|d| d.suite)
    }
}
