//! Certificate related handshake messages and small extensions.

mod common;

use common::*;
use tlsprobe::message::{CertificateRequest, CertificateStatusMessage, Layer, Message};
use tlsprobe::message::{ExtendedMasterSecretExtension, PaddingExtension};
use tlsprobe::message::{MessageKind, SignedCertificateTimestampExtension};
use tlsprobe::ocsp::{CertificateStatus, OcspStatus, StaticStatusSource};
use tlsprobe::{pipeline, Config, Error, ProtocolVersion};

#[test]
fn stapled_status_goes_through_the_source() {
    let _ = env_logger::try_init();

    let response = unhex("30030a0100");
    let lookup = response.clone();
    let source = StaticStatusSource::new(move || {
        vec![(lookup.clone(), CertificateStatus::new(OcspStatus::Good))]
    });
    let config = Config::builder()
        .ocsp_response(&response)
        .certificate_status_source(source.into_shared())
        .build()
        .expect("config");
    let (mut client, mut server) = pair(config);

    let mut msg = Message::from(CertificateStatusMessage::default());
    let wire = pipeline::send(&mut msg, &mut server).expect("send");
    assert_eq!(hex_of(&wire), "160000090100000530030a0100");

    pipeline::receive(&wire, Layer::Handshake, &mut client).expect("receive");
    assert_eq!(client.certificate_status().map(|s| s.status), Some(OcspStatus::Good));
}

#[test]
fn certificate_request_in_both_versions() {
    let config = Config::builder()
        .distinguished_names(vec![unhex("300b3109300706035504030c0041")])
        .certificate_request_context(&[0x42])
        .build()
        .expect("config");

    for version in [ProtocolVersion::Tls12, ProtocolVersion::Tls13] {
        let (mut client, mut server) = pair(config.clone());
        client.set_version(version);
        server.set_version(version);

        let mut msg = Message::from(CertificateRequest::default());
        let wire = pipeline::send(&mut msg, &mut server).expect("send");
        let (received, _) = pipeline::receive(&wire, Layer::Handshake, &mut client).expect("receive");

        assert_eq!(received.kind(), MessageKind::CertificateRequest);
        assert!(client.client_authentication_requested());
        assert_eq!(client.peer_signature_algorithms(), server.config().signature_algorithms());
        if version == ProtocolVersion::Tls13 {
            assert_eq!(client.certificate_request_context(), &[0x42]);
        }
    }
}

#[test]
fn small_extension_vectors() {
    let (mut client, mut server) = pair(
        Config::builder()
            .signed_certificate_timestamp(&[0x00, 0x01, 0x07])
            .build()
            .expect("config"),
    );

    let wire = pipeline::send(&mut Message::from(PaddingExtension::default()), &mut client).expect("padding");
    assert_eq!(hex_of(&wire), "00150006000000000000");

    let wire = pipeline::send(&mut Message::from(ExtendedMasterSecretExtension), &mut client).expect("ems");
    assert_eq!(hex_of(&wire), "00170000");
    pipeline::receive(&wire, Layer::Extension, &mut server).expect("receive ems");
    assert!(server.extended_master_secret());

    let wire = pipeline::send(
        &mut Message::from(SignedCertificateTimestampExtension::default()),
        &mut server,
    )
    .expect("sct");
    assert_eq!(hex_of(&wire), "00120003000107");
    pipeline::receive(&wire, Layer::Extension, &mut client).expect("receive sct");
    assert_eq!(client.signed_certificate_timestamp(), &[0x00, 0x01, 0x07]);
}

#[test]
fn malformed_input_is_a_parse_error() {
    let (mut client, _) = pair(Config::default());
    for input in [&[][..], &[0x0c][..], &[0x0c, 0x00, 0x00, 0x05, 0x03][..], &[0xfe, 0, 0, 0][..]] {
        let err = pipeline::receive(input, Layer::Handshake, &mut client).unwrap_err();
        assert!(matches!(err, Error::ParseError(_)), "{:?}", input);
    }
}

fn hex_of(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}
