use thiserror::Error;

use crate::types::NamedGroup;

/// Errors produced while preparing, parsing or handling a single message.
///
/// None of these are fatal to the process. Each one aborts the operation in
/// progress and leaves the connection usable for the next message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Unsupported named group: {0:?}")]
    UnsupportedGroup(NamedGroup),

    #[error("Missing prerequisite: {0}")]
    PreparationError(String),

    #[error("Key exchange setup failed: {0}")]
    KeyExchangeSetupError(String),

    #[error("Crypto operation failed: {0}")]
    CryptoOperationError(String),

    #[error("No common {0} between local and peer preferences")]
    NegotiationMismatch(&'static str),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

impl<'a> From<nom::Err<nom::error::Error<&'a [u8]>>> for Error {
    fn from(value: nom::Err<nom::error::Error<&'a [u8]>>) -> Self {
        match value {
            nom::Err::Incomplete(_) => Error::ParseError("incomplete input".to_string()),
            nom::Err::Error(e) | nom::Err::Failure(e) => Error::ParseError(format!(
                "{:?} with {} bytes left",
                e.code,
                e.input.len()
            )),
        }
    }
}
