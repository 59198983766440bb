use sha2::{Digest, Sha256, Sha384};

use crate::types::HashAlgorithm;
use crate::Error;

/// Output length of the hashes the key schedule can run on.
pub fn output_len(algorithm: HashAlgorithm) -> Result<usize, Error> {
    match algorithm {
        HashAlgorithm::SHA256 => Ok(32),
        HashAlgorithm::SHA384 => Ok(48),
        _ => Err(Error::UnsupportedAlgorithm(format!("hash {:?}", algorithm))),
    }
}

/// One-shot digest.
pub fn digest(algorithm: HashAlgorithm, data: &[u8]) -> Result<Vec<u8>, Error> {
    match algorithm {
        HashAlgorithm::SHA256 => Ok(Sha256::digest(data).to_vec()),
        HashAlgorithm::SHA384 => Ok(Sha384::digest(data).to_vec()),
        _ => Err(Error::UnsupportedAlgorithm(format!("hash {:?}", algorithm))),
    }
}
