//! encrypted_server_name extension (draft-ietf-tls-esni-01)
//!
//! ```text
//! struct {
//!     CipherSuite suite;
//!     KeyShareEntry key_share;
//!     opaque record_digest<0..2^16-1>;
//!     opaque encrypted_sni<0..2^16-1>;
//! } ClientEncryptedSNI;
//!
//! struct {
//!     uint8 nonce[16];
//! } ServerEncryptedSNI;
//! ```
//!
//! The client form is only decrypted once the whole ClientHello has been
//! parsed, since the key shares it is bound to arrive in another extension.

use nom::bytes::complete::take;
use nom::IResult;

use super::client_esni_inner::{ClientEsniInner, ServerName, NONCE_LEN};
use super::key_share::KeyShareEntry;
use crate::buffer::{hex, Buf};
use crate::esni::{EsniCodec, EsniComputations};
use crate::message::util::opaque_u16;
use crate::message::{MessageHandler, ParseContext};
use crate::state::ConnectionState;
use crate::types::{CipherSuite, ConnectionEnd, NamedGroup};
use crate::Error;

/// Wire fields of the ClientHello form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientEncryptedSni {
    pub cipher_suite: CipherSuite,
    pub key_share: KeyShareEntry,
    pub record_digest: Vec<u8>,
    pub encrypted_sni: Vec<u8>,
}

impl ClientEncryptedSni {
    fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, cipher_suite) = CipherSuite::parse(input)?;
        let (input, key_share) = KeyShareEntry::parse(input)?;
        let (input, record_digest) = opaque_u16(input)?;
        let (input, encrypted_sni) = opaque_u16(input)?;
        Ok((
            input,
            ClientEncryptedSni {
                cipher_suite,
                key_share,
                record_digest: record_digest.to_vec(),
                encrypted_sni: encrypted_sni.to_vec(),
            },
        ))
    }

    fn serialize(&self, out: &mut Buf) {
        out.push_u16(self.cipher_suite.as_u16());
        self.key_share.serialize(out);
        out.push_vec_u16(&self.record_digest);
        out.push_vec_u16(&self.encrypted_sni);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EsniPayload {
    Client(ClientEncryptedSni),
    Server { nonce: [u8; NONCE_LEN] },
}

#[derive(Debug)]
pub struct EncryptedServerNameIndication {
    pub payload: EsniPayload,
    /// Plaintext. Set before sending, or after a server decrypts.
    pub inner: Option<ClientEsniInner>,
    pub computations: Option<EsniComputations>,
}

impl EncryptedServerNameIndication {
    /// ClientHello form hiding `server_names`. Encrypted on prepare.
    pub fn client(server_names: Vec<ServerName>) -> Self {
        EncryptedServerNameIndication {
            payload: EsniPayload::Client(ClientEncryptedSni {
                cipher_suite: CipherSuite::TLS_AES_128_GCM_SHA256,
                key_share: KeyShareEntry::new(NamedGroup::X25519, &[]),
                record_digest: Vec::new(),
                encrypted_sni: Vec::new(),
            }),
            inner: Some(ClientEsniInner::new([0; NONCE_LEN], server_names)),
            computations: None,
        }
    }

    /// EncryptedExtensions form. Echoes the client nonce on prepare.
    pub fn server() -> Self {
        EncryptedServerNameIndication {
            payload: EsniPayload::Server {
                nonce: [0; NONCE_LEN],
            },
            inner: None,
            computations: None,
        }
    }

    fn prepare_client(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        let config = state.config_arc();
        let inner = self.inner.get_or_insert_with(ClientEsniInner::default);
        if inner.nonce == [0; NONCE_LEN] {
            inner.nonce = state.rng().array();
        }
        inner.pad_to(config.esni_padded_length());

        let mut plaintext = Buf::new();
        inner.serialize(&mut plaintext);

        let client_shares = state.client_key_shares().to_vec();
        if client_shares.is_empty() {
            warn!("Encrypting SNI without client key shares");
        }
        let client_random = *state.client_random();

        let codec = EsniCodec::new(&config);
        let (esni, computations) =
            codec.encrypt(state.rng(), &client_random, &client_shares, &plaintext)?;
        debug!(
            "ESNI {:?} over {:?}, {} byte ciphertext",
            esni.cipher_suite,
            esni.key_share.group,
            esni.encrypted_sni.len()
        );

        self.payload = EsniPayload::Client(esni);
        self.computations = Some(computations);
        Ok(())
    }

    fn decrypt(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        let EsniPayload::Client(esni) = &self.payload else {
            return Ok(());
        };
        if self.computations.is_none() {
            return Err(Error::PreparationError("no ESNI computations to fill".into()));
        }
        let client_shares = state.client_key_shares().to_vec();
        if client_shares.is_empty() {
            return Err(Error::PreparationError(
                "no client key shares to authenticate ESNI".into(),
            ));
        }

        let config = state.config_arc();
        let codec = EsniCodec::new(&config);
        let (plaintext, computations) = codec.decrypt(esni, state.client_random(), &client_shares)?;
        let (_, inner) = ClientEsniInner::parse(&plaintext)?;

        info!(
            "ESNI names: {:?}",
            inner
                .server_names
                .iter()
                .map(|n| String::from_utf8_lossy(&n.name).into_owned())
                .collect::<Vec<_>>()
        );
        state.set_esni_client_nonce(inner.nonce);
        state.set_esni_server_names(inner.server_names.clone());
        self.inner = Some(inner);
        self.computations = Some(computations);
        Ok(())
    }
}

impl MessageHandler for EncryptedServerNameIndication {
    fn parse(input: &[u8], ctx: ParseContext) -> IResult<&[u8], Self> {
        match ctx.sender {
            ConnectionEnd::Client => {
                let (input, esni) = ClientEncryptedSni::parse(input)?;
                Ok((
                    input,
                    EncryptedServerNameIndication {
                        payload: EsniPayload::Client(esni),
                        inner: None,
                        computations: Some(EsniComputations::default()),
                    },
                ))
            }
            ConnectionEnd::Server => {
                let (input, nonce) = take(NONCE_LEN)(input)?;
                let mut fixed = [0u8; NONCE_LEN];
                fixed.copy_from_slice(nonce);
                Ok((
                    input,
                    EncryptedServerNameIndication {
                        payload: EsniPayload::Server { nonce: fixed },
                        inner: None,
                        computations: None,
                    },
                ))
            }
        }
    }

    fn prepare(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        if let EsniPayload::Server { nonce } = &mut self.payload {
            let echoed = state
                .esni_client_nonce()
                .ok_or_else(|| Error::PreparationError("no ESNI client nonce to echo".into()))?;
            *nonce = *echoed;
            return Ok(());
        }
        self.prepare_client(state)
    }

    fn serialize(&self, out: &mut Buf) {
        match &self.payload {
            EsniPayload::Client(esni) => esni.serialize(out),
            EsniPayload::Server { nonce } => out.extend_from_slice(nonce),
        }
    }

    fn after_serialize(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        if let (EsniPayload::Client(_), Some(inner)) = (&self.payload, &self.inner) {
            state.set_esni_client_nonce(inner.nonce);
            state.set_esni_server_names(inner.server_names.clone());
        }
        Ok(())
    }

    fn after_parse(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        if let EsniPayload::Server { nonce } = &self.payload {
            match state.esni_client_nonce() {
                Some(sent) if sent == nonce => debug!("Server echoed the ESNI nonce"),
                Some(sent) => warn!(
                    "ESNI nonce mismatch: sent {}, got {}",
                    hex(sent),
                    hex(nonce)
                ),
                None => warn!("Server sent an ESNI nonce that was never offered"),
            }
        }
        Ok(())
    }

    fn prepare_after_parse(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        if state.local_role() == ConnectionEnd::Server {
            self.decrypt(state)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::crypto::generate_ephemeral;
    use crate::rng::SeededRng;
    use crate::types::ProtocolVersion;
    use crate::Config;

    fn ctx(sender: ConnectionEnd) -> ParseContext {
        ParseContext {
            sender,
            version: ProtocolVersion::Tls13,
        }
    }

    fn shared_config() -> Arc<Config> {
        let mut rng = SeededRng::new(Some(21));
        let (private, public) = generate_ephemeral(NamedGroup::X25519, &mut rng).unwrap();
        let config = Config::builder()
            .rng_seed(8)
            .esni_server_key_shares(vec![KeyShareEntry::new(NamedGroup::X25519, &public)])
            .esni_server_private_keys(vec![private])
            .esni_record(b"record")
            .build()
            .unwrap();
        Arc::new(config)
    }

    fn with_shares(config: &Arc<Config>, role: ConnectionEnd) -> ConnectionState {
        let mut state = ConnectionState::new(config.clone(), role);
        state.set_client_random([4; 32]);
        state.set_client_key_shares(vec![KeyShareEntry::new(NamedGroup::X25519, &[9; 32])]);
        state
    }

    #[test]
    fn client_hello_round_trip() {
        let config = shared_config();
        let mut client = with_shares(&config, ConnectionEnd::Client);
        let mut server = with_shares(&config, ConnectionEnd::Server);

        let mut ext = EncryptedServerNameIndication::client(vec![ServerName::host_name("hidden.example")]);
        ext.prepare(&mut client).unwrap();
        let mut out = Buf::new();
        ext.serialize(&mut out);
        ext.after_serialize(&mut client).unwrap();
        let sent_nonce = *client.esni_client_nonce().unwrap();

        let (rest, mut received) =
            EncryptedServerNameIndication::parse(&out, ctx(ConnectionEnd::Client)).unwrap();
        assert!(rest.is_empty());
        received.after_parse(&mut server).unwrap();
        received.prepare_after_parse(&mut server).unwrap();

        assert_eq!(server.esni_client_nonce(), Some(&sent_nonce));
        assert_eq!(server.esni_server_names(), &[ServerName::host_name("hidden.example")]);
        assert_eq!(received.inner.unwrap().padding.len(), 260 - 17);
    }

    #[test]
    fn server_echoes_nonce() {
        let config = shared_config();
        let mut server = with_shares(&config, ConnectionEnd::Server);
        server.set_esni_client_nonce([3; 16]);

        let mut ext = EncryptedServerNameIndication::server();
        ext.prepare(&mut server).unwrap();
        let mut out = Buf::new();
        ext.serialize(&mut out);
        assert_eq!(&*out, &[3; 16]);

        let mut client = with_shares(&config, ConnectionEnd::Client);
        client.set_esni_client_nonce([3; 16]);
        let (_, mut received) =
            EncryptedServerNameIndication::parse(&out, ctx(ConnectionEnd::Server)).unwrap();
        received.after_parse(&mut client).unwrap();
        received.prepare_after_parse(&mut client).unwrap();
        assert_eq!(received.payload, EsniPayload::Server { nonce: [3; 16] });
    }

    #[test]
    fn server_without_nonce_cannot_prepare() {
        let config = shared_config();
        let mut server = with_shares(&config, ConnectionEnd::Server);
        let err = EncryptedServerNameIndication::server().prepare(&mut server).unwrap_err();
        assert!(matches!(err, Error::PreparationError(_)));
    }

    #[test]
    fn decrypt_needs_client_key_shares() {
        let config = shared_config();
        let mut client = with_shares(&config, ConnectionEnd::Client);
        let mut ext = EncryptedServerNameIndication::client(vec![ServerName::host_name("a.example")]);
        ext.prepare(&mut client).unwrap();
        let mut out = Buf::new();
        ext.serialize(&mut out);

        let mut server = ConnectionState::new(config, ConnectionEnd::Server);
        let (_, mut received) =
            EncryptedServerNameIndication::parse(&out, ctx(ConnectionEnd::Client)).unwrap();
        let err = received.prepare_after_parse(&mut server).unwrap_err();
        assert!(matches!(err, Error::PreparationError(_)));
    }

    #[test]
    fn truncated_server_nonce_fails() {
        assert!(EncryptedServerNameIndication::parse(&[0; 8], ctx(ConnectionEnd::Server)).is_err());
    }
}
