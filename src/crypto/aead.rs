//! AEAD primitives for the five TLS 1.3 suites, using RustCrypto.

use aes::Aes128;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use ccm::consts::{U12, U16, U8};
use ccm::Ccm;
use chacha20poly1305::ChaCha20Poly1305;

use super::suite::AeadAlgorithm;
use crate::Error;

type Aes128Ccm = Ccm<Aes128, U16, U12>;
type Aes128Ccm8 = Ccm<Aes128, U8, U12>;

/// A keyed AEAD instance.
pub enum AeadCipher {
    Aes128Gcm(Box<Aes128Gcm>),
    Aes256Gcm(Box<Aes256Gcm>),
    ChaCha20Poly1305(Box<ChaCha20Poly1305>),
    Aes128Ccm(Box<Aes128Ccm>),
    Aes128Ccm8(Box<Aes128Ccm8>),
}

impl std::fmt::Debug for AeadCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AeadCipher").field(&self.algorithm()).finish()
    }
}

fn bad_key(algorithm: AeadAlgorithm, len: usize) -> Error {
    Error::CryptoOperationError(format!("invalid key length {} for {:?}", len, algorithm))
}

impl AeadCipher {
    pub fn new(algorithm: AeadAlgorithm, key: &[u8]) -> Result<Self, Error> {
        let err = |_| bad_key(algorithm, key.len());
        let cipher = match algorithm {
            AeadAlgorithm::Aes128Gcm => {
                AeadCipher::Aes128Gcm(Box::new(Aes128Gcm::new_from_slice(key).map_err(err)?))
            }
            AeadAlgorithm::Aes256Gcm => {
                AeadCipher::Aes256Gcm(Box::new(Aes256Gcm::new_from_slice(key).map_err(err)?))
            }
            AeadAlgorithm::ChaCha20Poly1305 => AeadCipher::ChaCha20Poly1305(Box::new(
                ChaCha20Poly1305::new_from_slice(key).map_err(err)?,
            )),
            AeadAlgorithm::Aes128Ccm => {
                AeadCipher::Aes128Ccm(Box::new(Aes128Ccm::new_from_slice(key).map_err(err)?))
            }
            AeadAlgorithm::Aes128Ccm8 => {
                AeadCipher::Aes128Ccm8(Box::new(Aes128Ccm8::new_from_slice(key).map_err(err)?))
            }
        };
        Ok(cipher)
    }

    pub fn algorithm(&self) -> AeadAlgorithm {
        match self {
            AeadCipher::Aes128Gcm(_) => AeadAlgorithm::Aes128Gcm,
            AeadCipher::Aes256Gcm(_) => AeadAlgorithm::Aes256Gcm,
            AeadCipher::ChaCha20Poly1305(_) => AeadAlgorithm::ChaCha20Poly1305,
            AeadCipher::Aes128Ccm(_) => AeadAlgorithm::Aes128Ccm,
            AeadCipher::Aes128Ccm8(_) => AeadAlgorithm::Aes128Ccm8,
        }
    }

    /// Encrypt and append the tag.
    pub fn seal(&self, nonce: &[u8; 12], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        let nonce = GenericArray::from_slice(nonce);
        let payload = Payload {
            msg: plaintext,
            aad,
        };
        let sealed = match self {
            AeadCipher::Aes128Gcm(c) => c.encrypt(nonce, payload),
            AeadCipher::Aes256Gcm(c) => c.encrypt(nonce, payload),
            AeadCipher::ChaCha20Poly1305(c) => c.encrypt(nonce, payload),
            AeadCipher::Aes128Ccm(c) => c.encrypt(nonce, payload),
            AeadCipher::Aes128Ccm8(c) => c.encrypt(nonce, payload),
        };
        sealed.map_err(|_| {
            Error::CryptoOperationError(format!("{:?} encryption failed", self.algorithm()))
        })
    }

    /// Verify the tag and decrypt.
    pub fn open(&self, nonce: &[u8; 12], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        let nonce = GenericArray::from_slice(nonce);
        let payload = Payload {
            msg: ciphertext,
            aad,
        };
        let opened = match self {
            AeadCipher::Aes128Gcm(c) => c.decrypt(nonce, payload),
            AeadCipher::Aes256Gcm(c) => c.decrypt(nonce, payload),
            AeadCipher::ChaCha20Poly1305(c) => c.decrypt(nonce, payload),
            AeadCipher::Aes128Ccm(c) => c.decrypt(nonce, payload),
            AeadCipher::Aes128Ccm8(c) => c.decrypt(nonce, payload),
        };
        opened.map_err(|_| {
            Error::CryptoOperationError(format!(
                "{:?} decryption failed (bad tag)",
                self.algorithm()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::hex;

    const AAD: &[u8] = &[0x17, 0x03, 0x03, 0x00, 0x14];

    fn nonce() -> [u8; 12] {
        let mut n = [0u8; 12];
        for (i, b) in n.iter_mut().enumerate() {
            *b = 0x10 + i as u8;
        }
        n
    }

    fn key(len: u8) -> Vec<u8> {
        (0..len).collect()
    }

    fn seal_hex(alg: AeadAlgorithm, key_len: u8) -> String {
        let cipher = AeadCipher::new(alg, &key(key_len)).unwrap();
        hex(&cipher.seal(&nonce(), AAD, b"abc").unwrap())
    }

    #[test]
    fn aes_128_gcm_three_byte_vector() {
        // 3 bytes ciphertext followed by the 16 byte tag.
        assert_eq!(
            seal_hex(AeadAlgorithm::Aes128Gcm, 16),
            "a54c602d3a8fbaf11714f1e584274927fc4ece"
        );
    }

    #[test]
    fn chacha20_poly1305_vector() {
        assert_eq!(
            seal_hex(AeadAlgorithm::ChaCha20Poly1305, 32),
            "3fa826dd6ac406e52834b6dc57a59174837a3f"
        );
    }

    #[test]
    fn ccm_vectors() {
        assert_eq!(
            seal_hex(AeadAlgorithm::Aes128Ccm, 16),
            "42d7da685ff61784ae9aca49c1d37bb50e5156"
        );
        assert_eq!(seal_hex(AeadAlgorithm::Aes128Ccm8, 16), "42d7dad0c34d76ff71ba4a");
    }

    #[test]
    fn open_reverses_seal_and_rejects_tampering() {
        let cipher = AeadCipher::new(AeadAlgorithm::Aes256Gcm, &key(32)).unwrap();
        let mut sealed = cipher.seal(&nonce(), AAD, b"hello").unwrap();
        assert_eq!(cipher.open(&nonce(), AAD, &sealed).unwrap(), b"hello");

        sealed[0] ^= 1;
        assert!(matches!(
            cipher.open(&nonce(), AAD, &sealed),
            Err(Error::CryptoOperationError(_))
        ));
    }

    #[test]
    fn wrong_key_length_is_an_error() {
        assert!(AeadCipher::new(AeadAlgorithm::Aes128Gcm, &key(15)).is_err());
    }
}
