#![no_main]

//! Fuzz target for ClientHello extension blocks received by a server.
//!
//! The server holds an ESNI key so encrypted_server_name payloads reach the
//! decryption path.

use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

use tlsprobe::crypto::generate_ephemeral;
use tlsprobe::message::extensions::KeyShareEntry;
use tlsprobe::{pipeline, Config, ConnectionEnd, ConnectionState, NamedGroup, SeededRng};

fuzz_target!(|data: &[u8]| {
    let mut rng = SeededRng::new(Some(1));
    let Ok((private, public)) = generate_ephemeral(NamedGroup::X25519, &mut rng) else {
        return;
    };
    let config = Config::builder()
        .rng_seed(1)
        .esni_server_key_shares(vec![KeyShareEntry::new(NamedGroup::X25519, &public)])
        .esni_server_private_keys(vec![private])
        .build()
        .unwrap();

    let mut state = ConnectionState::new(Arc::new(config), ConnectionEnd::Server);
    let _ = pipeline::receive_extensions(data, &mut state);
});
