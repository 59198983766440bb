//! tlsprobe
//!
//! A programmable TLS message engine. It builds, serializes, parses and
//! reacts to individual TLS handshake messages and extensions while keeping
//! the cryptographic state of one connection current.
//!
//! Nothing here drives a handshake. The caller decides which message is sent
//! or received next, and may deliberately send messages a conforming peer
//! never would. Each message kind has one set of behaviors:
//!
//! * send: `prepare`, `serialize`, `after_serialize`
//! * receive: `parse`, `after_parse`, then the deferred `prepare_after_parse`
//!
//! ```
//! use std::sync::Arc;
//! use tlsprobe::message::{KeyUpdate, KeyUpdateRequest, Message};
//! use tlsprobe::{pipeline, Config, ConnectionEnd, ConnectionState};
//!
//! let config = Arc::new(Config::default());
//! let mut state = ConnectionState::new(config, ConnectionEnd::Client);
//!
//! let mut key_update = Message::from(KeyUpdate::new(KeyUpdateRequest::UpdateRequested));
//! // No cipher suite negotiated yet.
//! assert!(pipeline::send(&mut key_update, &mut state).is_err());
//! ```
//!
//! Secrets derived along the way are logged hex encoded at `trace` level.
//! Every permissive fallback is logged at `warn` level.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

#[macro_use]
extern crate log;

mod buffer;
mod config;
pub mod crypto;
mod error;
pub mod esni;
pub mod message;
pub mod negotiate;
pub mod ocsp;
pub mod pipeline;
pub mod record;
mod rng;
mod state;
pub mod types;

pub use buffer::Buf;
pub use config::{Config, ConfigBuilder};
pub use error::Error;
pub use negotiate::NegotiationPolicy;
pub use rng::SeededRng;
pub use state::ConnectionState;
pub use types::{CipherSuite, ConnectionEnd, NamedGroup, ProtocolVersion};
