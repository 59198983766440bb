#![no_main]

//! Fuzz target for single framed messages.
//!
//! The first input byte picks the receiving role, the version and the
//! framing layer. The rest is handed to the receive pipeline. Any input must
//! produce a message or an error, never a panic.

use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

use tlsprobe::message::Layer;
use tlsprobe::{pipeline, Config, ConnectionEnd, ConnectionState, ProtocolVersion};

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };

    let role = if selector & 1 == 0 {
        ConnectionEnd::Client
    } else {
        ConnectionEnd::Server
    };
    let version = if selector & 2 == 0 {
        ProtocolVersion::Tls12
    } else {
        ProtocolVersion::Tls13
    };
    let layer = if selector & 4 == 0 {
        Layer::Handshake
    } else {
        Layer::Extension
    };

    let config = Arc::new(Config::builder().rng_seed(1).build().unwrap());
    let mut state = ConnectionState::new(config, role);
    state.set_version(version);

    let mut input = rest;
    while !input.is_empty() {
        match pipeline::receive(input, layer, &mut state) {
            Ok((_, next)) if next.len() < input.len() => input = next,
            _ => break,
        }
    }
});
