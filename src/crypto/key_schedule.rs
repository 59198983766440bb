//! TLS 1.3 key schedule primitives (RFC 8446 Section 7.1)
//!
//! Only the pieces the message handlers need:
//!
//! ```text
//! HKDF-Expand-Label(Secret, Label, Context, Length) =
//!      HKDF-Expand(Secret, HkdfLabel, Length)
//!
//! struct {
//!     uint16 length = Length;
//!     opaque label<7..255> = "tls13 " + Label;
//!     opaque context<0..255> = Context;
//! } HkdfLabel;
//!
//! application_traffic_secret_N+1 =
//!      HKDF-Expand-Label(application_traffic_secret_N,
//!                        "traffic upd", "", Hash.length)
//! ```
//!
//! Everything here is a pure function. Callers own the state they mutate.

use hkdf::Hkdf;
use sha2::{Sha256, Sha384};

use crate::crypto::hash;
use crate::types::HashAlgorithm;
use crate::Error;

const LABEL_PREFIX: &[u8] = b"tls13 ";

/// HKDF-Extract. A `None` salt is a zero-filled salt of the hash length.
pub fn extract(hash: HashAlgorithm, salt: Option<&[u8]>, ikm: &[u8]) -> Result<Vec<u8>, Error> {
    let out = match hash {
        HashAlgorithm::SHA256 => Hkdf::<Sha256>::extract(salt, ikm).0.to_vec(),
        HashAlgorithm::SHA384 => Hkdf::<Sha384>::extract(salt, ikm).0.to_vec(),
        _ => return Err(Error::UnsupportedAlgorithm(format!("HKDF with {:?}", hash))),
    };
    Ok(out)
}

/// Plain HKDF-Expand.
pub fn expand(
    hash: HashAlgorithm,
    prk: &[u8],
    info: &[u8],
    out_len: usize,
) -> Result<Vec<u8>, Error> {
    let mut out = vec![0u8; out_len];
    match hash {
        HashAlgorithm::SHA256 => Hkdf::<Sha256>::from_prk(prk)
            .map_err(|_| Error::CryptoOperationError("HKDF PRK too short".to_string()))?
            .expand(info, &mut out)
            .map_err(|_| Error::CryptoOperationError("HKDF output too long".to_string()))?,
        HashAlgorithm::SHA384 => Hkdf::<Sha384>::from_prk(prk)
            .map_err(|_| Error::CryptoOperationError("HKDF PRK too short".to_string()))?
            .expand(info, &mut out)
            .map_err(|_| Error::CryptoOperationError("HKDF output too long".to_string()))?,
        _ => return Err(Error::UnsupportedAlgorithm(format!("HKDF with {:?}", hash))),
    }
    Ok(out)
}

/// HKDF-Expand-Label with the "tls13 " label prefix.
pub fn expand_label(
    hash: HashAlgorithm,
    secret: &[u8],
    label: &str,
    context: &[u8],
    out_len: usize,
) -> Result<Vec<u8>, Error> {
    let full_label_len = LABEL_PREFIX.len() + label.len();

    if full_label_len > 255 {
        return Err(Error::CryptoOperationError(format!(
            "label too long for HKDF-Expand-Label: {}",
            label
        )));
    }
    if context.len() > 255 {
        return Err(Error::CryptoOperationError(
            "context too long for HKDF-Expand-Label".to_string(),
        ));
    }
    if out_len > u16::MAX as usize {
        return Err(Error::CryptoOperationError(
            "output too long for HKDF-Expand-Label".to_string(),
        ));
    }

    let mut info = Vec::with_capacity(2 + 1 + full_label_len + 1 + context.len());
    info.extend_from_slice(&(out_len as u16).to_be_bytes());
    info.push(full_label_len as u8);
    info.extend_from_slice(LABEL_PREFIX);
    info.extend_from_slice(label.as_bytes());
    info.push(context.len() as u8);
    info.extend_from_slice(context);

    expand(hash, secret, &info, out_len)
}

/// Next generation application traffic secret.
pub fn update_application_traffic_secret(
    old_secret: &[u8],
    hash: HashAlgorithm,
) -> Result<Vec<u8>, Error> {
    let len = hash::output_len(hash)?;
    let next = expand_label(hash, old_secret, "traffic upd", &[], len)?;
    trace!("traffic upd: {}", crate::buffer::hex(&next));
    Ok(next)
}

/// Record protection key and IV for one direction.
pub fn derive_traffic_key_iv(
    hash: HashAlgorithm,
    traffic_secret: &[u8],
    key_len: usize,
    iv_len: usize,
) -> Result<(Vec<u8>, Vec<u8>), Error> {
    let key = expand_label(hash, traffic_secret, "key", &[], key_len)?;
    let iv = expand_label(hash, traffic_secret, "iv", &[], iv_len)?;
    Ok((key, iv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::hex;

    fn counting(n: u8) -> Vec<u8> {
        (0..n).collect()
    }

    #[test]
    fn extract_without_salt_uses_zero_salt() {
        let none = extract(HashAlgorithm::SHA256, None, &[0u8; 32]).unwrap();
        let zeros = extract(HashAlgorithm::SHA256, Some(&[0u8; 32]), &[0u8; 32]).unwrap();
        assert_eq!(none, zeros);
        // RFC 8448 early secret without PSK.
        assert_eq!(
            hex(&none),
            "33ad0a1c607ec03b09e6cd9893680ce210adf300aa1f2660e1b22e10f170f92a"
        );
    }

    #[test]
    fn key_and_iv_vectors() {
        let secret = counting(32);
        let (key, iv) = derive_traffic_key_iv(HashAlgorithm::SHA256, &secret, 16, 12).unwrap();
        assert_eq!(hex(&key), "9c9783cf77ea32d44f369da41f19f3cc");
        assert_eq!(hex(&iv), "2f41c846a431a163814bcd71");
    }

    #[test]
    fn traffic_update_vectors() {
        let next = update_application_traffic_secret(&counting(32), HashAlgorithm::SHA256).unwrap();
        assert_eq!(
            hex(&next),
            "2cecd0a17506ef5fa73edc062d6e7b5397cf074ec1b4d8f99a120772932f0b45"
        );

        let next = update_application_traffic_secret(&counting(48), HashAlgorithm::SHA384).unwrap();
        assert_eq!(
            hex(&next),
            "401331b63e9d59f202e8f041042d9516f4cd7fa2e2ee14631d3b49fc340d7af3\
             7fc2c0c9f252d8036f81ec5b85cbe5db"
        );
    }

    #[test]
    fn expand_label_output_length_matches_request() {
        let secret = counting(32);
        for len in [1usize, 12, 16, 32, 33, 64, 255] {
            let out = expand_label(HashAlgorithm::SHA256, &secret, "key", &[], len).unwrap();
            assert_eq!(out.len(), len);
        }
    }

    #[test]
    fn distinct_contexts_give_distinct_output() {
        let secret = counting(32);
        let a = expand_label(HashAlgorithm::SHA256, &secret, "esni key", b"a", 16).unwrap();
        let b = expand_label(HashAlgorithm::SHA256, &secret, "esni key", b"b", 16).unwrap();
        let empty = expand_label(HashAlgorithm::SHA256, &secret, "esni key", &[], 16).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, empty);
    }

    #[test]
    fn unsupported_hash_is_reported() {
        let err = expand_label(HashAlgorithm::SHA1, &[0u8; 20], "key", &[], 16).unwrap_err();
        assert!(matches!(err, Error::UnsupportedAlgorithm(_)));
        assert!(update_application_traffic_secret(&[0u8; 64], HashAlgorithm::SHA512).is_err());
    }

    #[test]
    fn oversized_context_is_rejected() {
        let err = expand_label(HashAlgorithm::SHA256, &[0u8; 32], "key", &[0u8; 256], 16);
        assert!(matches!(err, Err(Error::CryptoOperationError(_))));
    }
}
