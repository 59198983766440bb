//! Encrypted SNI from ClientHello to EncryptedExtensions.

mod common;

use common::*;
use tlsprobe::message::extensions::{EsniPayload, ServerName};
use tlsprobe::message::{
    EncryptedServerNameIndication, KeyShareExtension, Layer, Message, SupportedGroupsExtension,
};
use tlsprobe::negotiate::NegotiationPolicy;
use tlsprobe::{pipeline, CipherSuite, Error, NamedGroup};

fn client_hello_extensions(names: &[&str]) -> Vec<Message> {
    vec![
        Message::from(KeyShareExtension::client()),
        Message::from(EncryptedServerNameIndication::client(
            names.iter().map(|n| ServerName::host_name(n)).collect(),
        )),
    ]
}

#[test]
fn server_recovers_hidden_name() {
    let _ = env_logger::try_init();

    for group in [NamedGroup::X25519, NamedGroup::X448, NamedGroup::Secp256r1] {
        for suite in [
            CipherSuite::TLS_AES_128_GCM_SHA256,
            CipherSuite::TLS_AES_256_GCM_SHA384,
            CipherSuite::TLS_CHACHA20_POLY1305_SHA256,
            CipherSuite::TLS_AES_128_CCM_SHA256,
            CipherSuite::TLS_AES_128_CCM_8_SHA256,
        ] {
            let config = esni_builder(group, 99)
                .esni_cipher_suites(&[suite])
                .esni_server_cipher_suites(&[suite])
                .build()
                .expect("config");
            let (mut client, mut server) = pair(config);

            let mut extensions = client_hello_extensions(&["secret.example"]);
            let block = pipeline::send_extensions(&mut extensions, &mut client).expect("send");
            let sent_nonce = *client.esni_client_nonce().expect("client nonce");

            let received = pipeline::receive_extensions(&block, &mut server).expect("receive");
            assert_eq!(received.len(), 2);
            assert_eq!(server.esni_client_nonce(), Some(&sent_nonce), "{:?} {:?}", group, suite);
            assert_eq!(
                server.esni_server_names(),
                &[ServerName::host_name("secret.example")]
            );
        }
    }
}

#[test]
fn nonce_is_echoed_back() {
    let _ = env_logger::try_init();

    let config = esni_builder(NamedGroup::X25519, 3).build().expect("config");
    let (mut client, mut server) = pair(config);

    let mut extensions = client_hello_extensions(&["a.example", "b.example"]);
    let block = pipeline::send_extensions(&mut extensions, &mut client).expect("send");
    pipeline::receive_extensions(&block, &mut server).expect("receive");
    assert_eq!(server.esni_server_names().len(), 2);

    let mut reply = Message::from(EncryptedServerNameIndication::server());
    let wire = pipeline::send(&mut reply, &mut server).expect("server send");
    assert_eq!(wire.len(), 4 + 16);

    let (message, _) = pipeline::receive(&wire, Layer::Extension, &mut client).expect("client receive");
    let esni = match message {
        Message::EncryptedServerName(esni) => esni,
        other => panic!("unexpected {:?}", other.kind()),
    };
    assert_eq!(
        esni.payload,
        EsniPayload::Server {
            nonce: *client.esni_client_nonce().expect("nonce")
        }
    );
}

fn assert_left_undecrypted(received: &[Message]) {
    assert_eq!(received.len(), 2);
    match &received[1] {
        Message::EncryptedServerName(esni) => assert!(esni.inner.is_none()),
        other => panic!("unexpected {:?}", other.kind()),
    }
}

#[test]
fn tampered_key_shares_fail_authentication() {
    let _ = env_logger::try_init();

    let config = esni_builder(NamedGroup::X25519, 4).build().expect("config");
    let (mut client, mut server) = pair(config);

    let mut extensions = client_hello_extensions(&["c.example"]);
    let block = pipeline::send_extensions(&mut extensions, &mut client).expect("send");

    // Flip a byte of the key share public value. The ESNI payload is bound to
    // it through the AAD.
    let mut tampered = block.to_vec();
    tampered[2 + 4 + 2 + 2 + 2] ^= 0x01;

    let received = pipeline::receive_extensions(&tampered, &mut server).expect("receive");
    assert_left_undecrypted(&received);
    assert!(server.esni_server_names().is_empty());
    assert!(server.esni_client_nonce().is_none());
    assert!(!server.client_key_shares().is_empty());
}

#[test]
fn tampered_ciphertext_leaves_the_connection_usable() {
    let _ = env_logger::try_init();

    let config = esni_builder(NamedGroup::X25519, 7).build().expect("config");
    let (mut client, mut server) = pair(config);

    let mut extensions = vec![
        Message::from(SupportedGroupsExtension::default()),
        Message::from(KeyShareExtension::client()),
        Message::from(EncryptedServerNameIndication::client(vec![ServerName::host_name(
            "e.example",
        )])),
    ];
    let block = pipeline::send_extensions(&mut extensions, &mut client).expect("send");

    // The ESNI extension is last and ends with the sealed payload.
    let mut tampered = block.to_vec();
    let last = tampered.len() - 1;
    tampered[last] ^= 0x80;

    let received = pipeline::receive_extensions(&tampered, &mut server).expect("receive");
    assert_eq!(received.len(), 3);
    assert!(matches!(&received[2], Message::EncryptedServerName(esni) if esni.inner.is_none()));
    assert!(server.esni_server_names().is_empty());
    assert!(!server.peer_named_groups().is_empty());

    // The server can still answer, without a nonce to echo.
    let mut reply = Message::from(EncryptedServerNameIndication::server());
    let err = pipeline::send(&mut reply, &mut server).unwrap_err();
    assert!(matches!(err, Error::PreparationError(_)));
}

#[test]
fn permissive_fallback_seals_with_a_key_of_another_group() {
    let _ = env_logger::try_init();

    // The server only publishes X25519 and holds only the X25519 private key.
    let config = esni_builder(NamedGroup::X25519, 8)
        .esni_named_groups(&[NamedGroup::X448])
        .build()
        .expect("config");
    let (mut client, mut server) = pair(config);

    let mut extensions = client_hello_extensions(&["f.example"]);
    let block = pipeline::send_extensions(&mut extensions, &mut client).expect("send");
    match &extensions[1] {
        Message::EncryptedServerName(esni) => match &esni.payload {
            EsniPayload::Client(sealed) => {
                assert_eq!(sealed.key_share.group, NamedGroup::X448);
                assert_eq!(sealed.key_share.key_exchange.len(), 56);
            }
            other => panic!("unexpected {:?}", other),
        },
        other => panic!("unexpected {:?}", other.kind()),
    }

    // Both sides substitute keys, so the derived secrets disagree. The block
    // is still received.
    let received = pipeline::receive_extensions(&block, &mut server).expect("receive");
    assert_left_undecrypted(&received);
    assert!(server.esni_server_names().is_empty());
}

#[test]
fn strict_policy_rejects_disjoint_suites() {
    let config = esni_builder(NamedGroup::X25519, 5)
        .esni_cipher_suites(&[CipherSuite::TLS_AES_128_CCM_SHA256])
        .esni_server_cipher_suites(&[CipherSuite::TLS_AES_256_GCM_SHA384])
        .negotiation_policy(NegotiationPolicy::Strict)
        .build()
        .expect("config");
    let (mut client, _) = pair(config);

    let mut extensions = client_hello_extensions(&["d.example"]);
    let err = pipeline::send_extensions(&mut extensions, &mut client).unwrap_err();
    assert_eq!(err, Error::NegotiationMismatch("ESNI cipher suite"));
}

#[test]
fn padded_length_hides_name_length() {
    let config = esni_builder(NamedGroup::X25519, 6).build().expect("config");
    let (mut short_client, _) = pair(config.clone());
    let (mut long_client, _) = pair(config);

    let short = pipeline::send_extensions(&mut client_hello_extensions(&["a.io"]), &mut short_client)
        .expect("short");
    let long = pipeline::send_extensions(
        &mut client_hello_extensions(&["a-much-longer-host-name.example"]),
        &mut long_client,
    )
    .expect("long");
    assert_eq!(short.len(), long.len());
}
