//! ECDSA signing for ServerKeyExchange parameters.

use rand::{CryptoRng, RngCore};
use signature::Signer;

use crate::types::{HashAlgorithm, SignatureAlgorithm, SignatureAndHashAlgorithm};
use crate::Error;

/// ECDSA private key used to sign handshake parameters.
#[derive(Clone)]
pub enum SigningKey {
    P256(p256::ecdsa::SigningKey),
    P384(p384::ecdsa::SigningKey),
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SigningKey::P256(_) => f.debug_tuple("SigningKey::P256").finish(),
            SigningKey::P384(_) => f.debug_tuple("SigningKey::P384").finish(),
        }
    }
}

impl SigningKey {
    /// P-256 key from a raw 32 byte scalar.
    pub fn p256_from_bytes(scalar: &[u8]) -> Result<Self, Error> {
        p256::ecdsa::SigningKey::from_slice(scalar)
            .map(SigningKey::P256)
            .map_err(|_| Error::InvalidConfig("invalid P-256 signing key"))
    }

    /// P-384 key from a raw 48 byte scalar.
    pub fn p384_from_bytes(scalar: &[u8]) -> Result<Self, Error> {
        p384::ecdsa::SigningKey::from_slice(scalar)
            .map(SigningKey::P384)
            .map_err(|_| Error::InvalidConfig("invalid P-384 signing key"))
    }

    pub fn generate_p256<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        SigningKey::P256(p256::ecdsa::SigningKey::random(rng))
    }

    /// The algorithm pair this key produces.
    pub fn algorithm(&self) -> SignatureAndHashAlgorithm {
        match self {
            SigningKey::P256(_) => {
                SignatureAndHashAlgorithm::new(HashAlgorithm::SHA256, SignatureAlgorithm::ECDSA)
            }
            SigningKey::P384(_) => {
                SignatureAndHashAlgorithm::new(HashAlgorithm::SHA384, SignatureAlgorithm::ECDSA)
            }
        }
    }

    /// DER encoded ECDSA signature over `data`.
    ///
    /// The curve fixes the digest, so `algorithm` must match
    /// [`SigningKey::algorithm`].
    pub fn sign(&self, algorithm: SignatureAndHashAlgorithm, data: &[u8]) -> Result<Vec<u8>, Error> {
        if algorithm != self.algorithm() {
            return Err(Error::UnsupportedAlgorithm(format!(
                "{:?} with a {:?} key",
                algorithm,
                self.algorithm()
            )));
        }

        let failed = |_| Error::CryptoOperationError("ECDSA signing failed".to_string());
        let der = match self {
            SigningKey::P256(key) => {
                let sig: p256::ecdsa::Signature = key.try_sign(data).map_err(failed)?;
                sig.to_der().as_bytes().to_vec()
            }
            SigningKey::P384(key) => {
                let sig: p384::ecdsa::Signature = key.try_sign(data).map_err(failed)?;
                sig.to_der().as_bytes().to_vec()
            }
        };
        Ok(der)
    }
}
