//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use tlsprobe::crypto::generate_ephemeral;
use tlsprobe::message::extensions::KeyShareEntry;
use tlsprobe::{CipherSuite, Config, ConfigBuilder, ConnectionEnd, ConnectionState, NamedGroup};
use tlsprobe::SeededRng;

pub const CLIENT_RANDOM: [u8; 32] = [0x11; 32];
pub const SERVER_RANDOM: [u8; 32] = [0x22; 32];

pub fn unhex(s: &str) -> Vec<u8> {
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).expect("hex"))
        .collect()
}

/// Builder with a deterministic RNG and an ESNI key pair for `group`.
pub fn esni_builder(group: NamedGroup, seed: u64) -> ConfigBuilder {
    let mut rng = SeededRng::new(Some(seed));
    let (private, public) = generate_ephemeral(group, &mut rng).expect("esni key");
    Config::builder()
        .rng_seed(seed)
        .esni_named_groups(&[group])
        .esni_server_key_shares(vec![KeyShareEntry::new(group, &public)])
        .esni_server_private_keys(vec![private])
        .esni_record(b"published ESNIKeys record")
}

/// Client and server state sharing `config`, randoms already exchanged.
pub fn pair(config: Config) -> (ConnectionState, ConnectionState) {
    let config = Arc::new(config);
    let mut client = ConnectionState::new(Arc::clone(&config), ConnectionEnd::Client);
    let mut server = ConnectionState::new(config, ConnectionEnd::Server);
    for state in [&mut client, &mut server] {
        state.set_client_random(CLIENT_RANDOM);
        state.set_server_random(SERVER_RANDOM);
    }
    (client, server)
}

/// Pair with application traffic secrets in place and both directions keyed.
pub fn established(suite: CipherSuite, config: Config) -> (ConnectionState, ConnectionState) {
    let (mut client, mut server) = pair(config);
    let len = if suite == CipherSuite::TLS_AES_256_GCM_SHA384 { 48 } else { 32 };
    for state in [&mut client, &mut server] {
        state.set_cipher_suite(suite);
        state.set_application_traffic_secrets(&vec![0xc1; len], &vec![0x5e; len]);
        let local = state.local_role();
        tlsprobe::record::rekey(
            state,
            tlsprobe::record::KeySetType::ApplicationTrafficSecrets,
            local,
            local,
        )
        .expect("write keys");
        tlsprobe::record::rekey(
            state,
            tlsprobe::record::KeySetType::ApplicationTrafficSecrets,
            local,
            local.peer(),
        )
        .expect("read keys");
    }
    (client, server)
}
