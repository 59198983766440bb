//! KeyShare extension (RFC 8446 Section 4.2.8)
//!
//! ```text
//! struct {
//!     NamedGroup group;
//!     opaque key_exchange<1..2^16-1>;
//! } KeyShareEntry;
//!
//! struct { KeyShareEntry client_shares<0..2^16-1>; } KeyShareClientHello;
//! struct { KeyShareEntry server_share; } KeyShareServerHello;
//! ```
//!
//! Which layout applies depends on who sent the extension.

use nom::IResult;
use zeroize::Zeroize;

use crate::buffer::{hex, Buf};
use crate::crypto::{compute_shared_secret, generate_ephemeral, negotiate_group, PrivateKey};
use crate::message::util::{list_u16, opaque_u16};
use crate::message::{MessageHandler, ParseContext};
use crate::state::ConnectionState;
use crate::types::{ConnectionEnd, NamedGroup};
use crate::Error;

/// A single key share entry: named group + public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyShareEntry {
    pub group: NamedGroup,
    pub key_exchange: Vec<u8>,
}

impl KeyShareEntry {
    pub fn new(group: NamedGroup, key_exchange: &[u8]) -> Self {
        KeyShareEntry {
            group,
            key_exchange: key_exchange.to_vec(),
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], KeyShareEntry> {
        let (input, group) = NamedGroup::parse(input)?;
        let (input, key_exchange) = opaque_u16(input)?;
        Ok((input, KeyShareEntry::new(group, key_exchange)))
    }

    pub fn serialize(&self, out: &mut Buf) {
        out.push_u16(self.group.as_u16());
        out.push_vec_u16(&self.key_exchange);
    }
}

/// `client_shares` as it appears in a ClientHello, length prefix included.
pub fn serialize_client_shares(entries: &[KeyShareEntry], out: &mut Buf) {
    out.with_u16_len(|b| {
        for entry in entries {
            entry.serialize(b);
        }
    });
}

/// Private keys and shared secret produced while preparing.
#[derive(Debug, Default)]
pub struct KeyShareComputations {
    pub private_keys: Vec<PrivateKey>,
    pub shared_secret: Vec<u8>,
}

impl Drop for KeyShareComputations {
    fn drop(&mut self) {
        self.shared_secret.zeroize();
    }
}

#[derive(Debug)]
pub struct KeyShareExtension {
    /// Role the extension is sent by. Decides the layout.
    pub sender: ConnectionEnd,
    /// Client: every offered share. Server: exactly one.
    pub entries: Vec<KeyShareEntry>,
    pub computations: Option<KeyShareComputations>,
}

impl KeyShareExtension {
    /// ClientHello form. Entries left empty are generated on prepare.
    pub fn client() -> Self {
        KeyShareExtension {
            sender: ConnectionEnd::Client,
            entries: Vec::new(),
            computations: None,
        }
    }

    /// ServerHello form. The entry is generated on prepare.
    pub fn server() -> Self {
        KeyShareExtension {
            sender: ConnectionEnd::Server,
            entries: Vec::new(),
            computations: None,
        }
    }

    fn prepare_client(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        let config = state.config_arc();
        let mut computations = KeyShareComputations::default();

        if self.entries.is_empty() {
            for group in config.key_share_groups() {
                let (private, public) = generate_ephemeral(*group, state.rng())?;
                self.entries.push(KeyShareEntry::new(*group, &public));
                computations.private_keys.push(private);
            }
        }
        debug!(
            "Client key shares: {:?}",
            self.entries.iter().map(|e| e.group).collect::<Vec<_>>()
        );
        self.computations = Some(computations);
        Ok(())
    }

    fn prepare_server(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        let config = state.config_arc();
        let offered: Vec<NamedGroup> = state.client_key_shares().iter().map(|e| e.group).collect();
        if offered.is_empty() {
            return Err(Error::PreparationError(
                "no client key shares to answer".into(),
            ));
        }

        let group = negotiate_group(config.named_groups(), &offered, config.negotiation_policy())?;
        let (private, public) = generate_ephemeral(group, state.rng())?;

        let mut computations = KeyShareComputations::default();
        match state.client_key_shares().iter().find(|e| e.group == group) {
            Some(peer) => {
                computations.shared_secret =
                    compute_shared_secret(&private, &peer.key_exchange, group)?;
                trace!("Key share secret: {}", hex(&computations.shared_secret));
            }
            None => warn!("Client sent no {:?} share, no shared secret", group),
        }
        computations.private_keys.push(private);

        self.entries = vec![KeyShareEntry::new(group, &public)];
        self.computations = Some(computations);
        Ok(())
    }

    fn server_share_received(&self, state: &mut ConnectionState) -> Result<(), Error> {
        let Some(entry) = self.entries.first() else {
            warn!("ServerHello key_share without an entry");
            return Ok(());
        };
        state.set_server_key_share(entry.clone());
        state.set_named_group(entry.group);

        let own = state
            .key_share_private_keys()
            .iter()
            .find(|k| k.group() == entry.group)
            .cloned();
        match own {
            Some(private) => {
                let secret = compute_shared_secret(&private, &entry.key_exchange, entry.group)?;
                trace!("Key share secret: {}", hex(&secret));
                state.set_premaster_secret(secret);
            }
            None => warn!("No own {:?} key share, cannot compute shared secret", entry.group),
        }
        Ok(())
    }
}

impl MessageHandler for KeyShareExtension {
    fn parse(input: &[u8], ctx: ParseContext) -> IResult<&[u8], Self> {
        let (input, entries) = match ctx.sender {
            ConnectionEnd::Client => list_u16(KeyShareEntry::parse)(input)?,
            ConnectionEnd::Server => {
                let (input, entry) = KeyShareEntry::parse(input)?;
                (input, vec![entry])
            }
        };
        Ok((
            input,
            KeyShareExtension {
                sender: ctx.sender,
                entries,
                computations: None,
            },
        ))
    }

    fn prepare(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        match self.sender {
            ConnectionEnd::Client => self.prepare_client(state),
            ConnectionEnd::Server => self.prepare_server(state),
        }
    }

    fn serialize(&self, out: &mut Buf) {
        match self.sender {
            ConnectionEnd::Client => serialize_client_shares(&self.entries, out),
            ConnectionEnd::Server => {
                if let Some(entry) = self.entries.first() {
                    entry.serialize(out);
                }
            }
        }
    }

    fn after_serialize(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        let computations = self.computations.take().unwrap_or_default();
        match self.sender {
            ConnectionEnd::Client => {
                state.set_client_key_shares(self.entries.clone());
            }
            ConnectionEnd::Server => {
                if let Some(entry) = self.entries.first() {
                    state.set_server_key_share(entry.clone());
                    state.set_named_group(entry.group);
                }
                if !computations.shared_secret.is_empty() {
                    state.set_premaster_secret(computations.shared_secret.clone());
                }
            }
        }
        if !computations.private_keys.is_empty() {
            state.set_key_share_private_keys(computations.private_keys.clone());
        }
        Ok(())
    }

    fn after_parse(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        match self.sender {
            ConnectionEnd::Client => {
                state.set_client_key_shares(self.entries.clone());
                Ok(())
            }
            ConnectionEnd::Server => self.server_share_received(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::ProtocolVersion;
    use crate::Config;

    fn unhex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    fn ctx(sender: ConnectionEnd) -> ParseContext {
        ParseContext {
            sender,
            version: ProtocolVersion::Tls13,
        }
    }

    fn state(role: ConnectionEnd) -> ConnectionState {
        let config = Config::builder().rng_seed(3).build().unwrap();
        ConnectionState::new(Arc::new(config), role)
    }

    #[test]
    fn layouts_follow_sender() {
        let client_body = [0x00, 0x06, 0x00, 0x1d, 0x00, 0x02, 0xaa, 0xbb];
        let (rest, ext) = KeyShareExtension::parse(&client_body, ctx(ConnectionEnd::Client)).unwrap();
        assert!(rest.is_empty());
        assert_eq!(ext.entries, vec![KeyShareEntry::new(NamedGroup::X25519, &[0xaa, 0xbb])]);

        let server_body = &client_body[2..];
        let (rest, ext) = KeyShareExtension::parse(server_body, ctx(ConnectionEnd::Server)).unwrap();
        assert!(rest.is_empty());
        let mut out = Buf::new();
        ext.serialize(&mut out);
        assert_eq!(&*out, server_body);
    }

    #[test]
    fn client_and_server_agree() {
        let mut client = state(ConnectionEnd::Client);
        let mut server = state(ConnectionEnd::Server);

        let mut ch = KeyShareExtension::client();
        ch.prepare(&mut client).unwrap();
        ch.after_serialize(&mut client).unwrap();
        assert_eq!(client.client_key_shares().len(), 1);
        assert_eq!(client.key_share_private_keys().len(), 1);

        let mut out = Buf::new();
        ch.serialize(&mut out);
        let (_, mut received) = KeyShareExtension::parse(&out, ctx(ConnectionEnd::Client)).unwrap();
        received.after_parse(&mut server).unwrap();

        let mut sh = KeyShareExtension::server();
        sh.prepare(&mut server).unwrap();
        sh.after_serialize(&mut server).unwrap();

        let mut out = Buf::new();
        sh.serialize(&mut out);
        let (_, mut received) = KeyShareExtension::parse(&out, ctx(ConnectionEnd::Server)).unwrap();
        received.after_parse(&mut client).unwrap();

        assert_eq!(client.named_group(), Some(NamedGroup::X25519));
        assert_eq!(client.premaster_secret().len(), 32);
        assert_eq!(client.premaster_secret(), server.premaster_secret());
    }

    #[test]
    fn server_share_uses_own_private_key() {
        let mut client = state(ConnectionEnd::Client);
        let alice = PrivateKey::from_bytes(
            NamedGroup::X25519,
            &unhex("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a"),
        )
        .unwrap();
        client.set_key_share_private_keys(vec![alice]);

        let bob = unhex("de9edb7d7b7dc1b4d35b61c2ece435373f8343c85b78674dadfc7e146f882b4f");
        let mut sh = KeyShareExtension {
            sender: ConnectionEnd::Server,
            entries: vec![KeyShareEntry::new(NamedGroup::X25519, &bob)],
            computations: None,
        };
        sh.after_parse(&mut client).unwrap();
        assert_eq!(
            hex(client.premaster_secret()),
            "4a5d9d5ba4ce2de1728e3bf480350f25e07e21c947d19e3376f09b3c1e161742"
        );
    }

    #[test]
    fn server_without_client_shares_cannot_prepare() {
        let mut server = state(ConnectionEnd::Server);
        let err = KeyShareExtension::server().prepare(&mut server).unwrap_err();
        assert!(matches!(err, Error::PreparationError(_)));
    }
}
