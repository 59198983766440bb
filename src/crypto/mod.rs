//! Cryptographic primitives used by the message handlers.
//!
//! Everything is backed by RustCrypto crates and is synchronous. Nothing in
//! here touches connection state.

pub mod aead;
pub mod hash;
pub mod key_schedule;
pub mod kx;
pub mod sign;
pub mod suite;

pub use aead::AeadCipher;
pub use kx::{compute_shared_secret, generate_ephemeral, negotiate_group};
pub use kx::{GroupFamily, NamedGroupDescriptor, PrivateKey};
pub use sign::SigningKey;
pub use suite::{AeadAlgorithm, CipherSuiteDescriptor, AEAD_IV_LEN};
