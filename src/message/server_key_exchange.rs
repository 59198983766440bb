//! ECDHE ServerKeyExchange (RFC 8422 Section 5.4)
//!
//! ```text
//! struct {
//!     ECCurveType    curve_type;
//!     NamedCurve     namedcurve;
//!     opaque         point <1..2^8-1>;
//! } ServerECDHParams;
//!
//! struct {
//!     ServerECDHParams    params;
//!     digitally-signed struct {
//!         opaque client_random[32];
//!         opaque server_random[32];
//!         ServerECDHParams params;
//!     } signed_params;
//! } ServerKeyExchange;
//! ```

use nom::IResult;

use super::util::{opaque_u16, opaque_u8};
use super::{MessageHandler, ParseContext};
use crate::buffer::{hex, Buf};
use crate::crypto::{generate_ephemeral, negotiate_group, NamedGroupDescriptor, PrivateKey};
use crate::negotiate::negotiate;
use crate::state::ConnectionState;
use crate::types::{CurveType, ECPointFormat, NamedGroup, SignatureAndHashAlgorithm};
use crate::Error;

/// Signature over the server parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitallySigned {
    pub algorithm: SignatureAndHashAlgorithm,
    pub signature: Vec<u8>,
}

impl DigitallySigned {
    pub fn new(algorithm: SignatureAndHashAlgorithm, signature: Vec<u8>) -> Self {
        DigitallySigned {
            algorithm,
            signature,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], DigitallySigned> {
        let (input, algorithm) = SignatureAndHashAlgorithm::parse(input)?;
        let (input, signature) = opaque_u16(input)?;
        Ok((input, DigitallySigned::new(algorithm, signature.to_vec())))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.push_u16(self.algorithm.as_u16());
        output.push_vec_u16(&self.signature);
    }
}

/// Values computed while preparing that never go on the wire.
#[derive(Debug, Clone, Default)]
pub struct EcdheComputations {
    pub private_key: Option<PrivateKey>,
    pub point_format: Option<ECPointFormat>,
    pub client_server_random: Vec<u8>,
    pub signature_payload: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct EcdheServerKeyExchange {
    pub curve_type: CurveType,
    pub named_group: NamedGroup,
    pub public_key: Vec<u8>,
    pub signature: Option<DigitallySigned>,
    pub computations: Option<EcdheComputations>,
}

impl Default for EcdheServerKeyExchange {
    fn default() -> Self {
        EcdheServerKeyExchange {
            curve_type: CurveType::NamedCurve,
            named_group: NamedGroup::X25519,
            public_key: Vec::new(),
            signature: None,
            computations: None,
        }
    }
}

impl EcdheServerKeyExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialized ServerECDHParams.
    fn params(&self, out: &mut Buf) {
        out.push(self.curve_type.as_u8());
        out.push_u16(self.named_group.as_u16());
        out.push_vec_u8(&self.public_key);
    }

    /// Pick domain parameters, retrying once with the first configured
    /// group as a named curve.
    fn resolve_domain(
        &mut self,
        group: NamedGroup,
        fallback: Option<NamedGroup>,
    ) -> Result<NamedGroup, Error> {
        match NamedGroupDescriptor::domain(self.curve_type, group) {
            Ok(d) => Ok(d.group),
            Err(e) => {
                warn!("{}, retrying with a named curve", e);
                let fallback = fallback.ok_or_else(|| {
                    Error::KeyExchangeSetupError("no named group to fall back to".into())
                })?;
                let d = NamedGroupDescriptor::domain(CurveType::NamedCurve, fallback)
                    .map_err(|_| {
                        Error::KeyExchangeSetupError(format!(
                            "no domain parameters for {:?} or {:?}",
                            group, fallback
                        ))
                    })?;
                self.curve_type = CurveType::NamedCurve;
                Ok(d.group)
            }
        }
    }
}

impl MessageHandler for EcdheServerKeyExchange {
    fn parse(input: &[u8], _ctx: ParseContext) -> IResult<&[u8], Self> {
        let (input, curve_type) = CurveType::parse(input)?;
        let (input, named_group) = NamedGroup::parse(input)?;
        let (input, public_key) = opaque_u8(input)?;

        let (input, signature) = if input.is_empty() {
            (input, None)
        } else {
            let (rest, signed) = DigitallySigned::parse(input)?;
            (rest, Some(signed))
        };

        Ok((
            input,
            EcdheServerKeyExchange {
                curve_type,
                named_group,
                public_key: public_key.to_vec(),
                signature,
                computations: None,
            },
        ))
    }

    fn prepare(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        let config = state.config_arc();
        let policy = config.negotiation_policy();

        let group = negotiate_group(config.named_groups(), state.peer_named_groups(), policy)?;
        let format = negotiate(
            "point format",
            config.point_formats(),
            state.peer_point_formats(),
            policy,
        )?;
        let group = self.resolve_domain(group, config.named_groups().first().copied())?;
        self.named_group = group;

        let (private_key, _) = generate_ephemeral(group, state.rng())?;
        self.public_key = private_key.public_key(format)?;
        debug!("ECDHE {:?} public key: {}", group, hex(&self.public_key));

        let mut client_server_random = Vec::with_capacity(64);
        client_server_random.extend_from_slice(state.client_random());
        client_server_random.extend_from_slice(state.server_random());

        let mut payload = Buf::from_slice(&client_server_random);
        self.params(&mut payload);
        let payload = payload.into_vec();

        let algorithm = negotiate(
            "signature algorithm",
            config.signature_algorithms(),
            state.peer_signature_algorithms(),
            policy,
        )?;
        let signature = match config.signing_key() {
            Some(key) => key.sign(algorithm, &payload).unwrap_or_else(|e| {
                warn!("Could not sign ServerKeyExchange ({}), sending empty signature", e);
                Vec::new()
            }),
            None => {
                warn!("No signing key configured, sending empty signature");
                Vec::new()
            }
        };
        self.signature = Some(DigitallySigned::new(algorithm, signature));

        self.computations = Some(EcdheComputations {
            private_key: Some(private_key),
            point_format: Some(format),
            client_server_random,
            signature_payload: payload,
        });
        Ok(())
    }

    fn serialize(&self, out: &mut Buf) {
        self.params(out);
        if let Some(signed) = &self.signature {
            signed.serialize(out);
        }
    }

    fn after_serialize(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        state.set_named_group(self.named_group);
        let key = self
            .computations
            .as_mut()
            .and_then(|c| c.private_key.take());
        if let Some(key) = key {
            state.set_key_exchange_private_key(key);
        }
        Ok(())
    }

    fn after_parse(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        state.set_named_group(self.named_group);
        state.set_peer_ephemeral_public_key(&self.public_key);
        debug!(
            "Peer ECDHE {:?} public key: {}",
            self.named_group,
            hex(&self.public_key)
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::{ConnectionEnd, ProtocolVersion};
    use crate::Config;

    const MESSAGE: &[u8] = &[
        0x03, // curve_type
        0x00, 0x17, // named_group
        0x04, // public_key length
        0x01, 0x02, 0x03, 0x04, // public_key
        0x04, 0x03, // ecdsa_secp256r1_sha256
        0x00, 0x02, // signature length
        0xaa, 0xbb, // signature
    ];

    fn ctx() -> ParseContext {
        ParseContext {
            sender: ConnectionEnd::Server,
            version: ProtocolVersion::Tls12,
        }
    }

    #[test]
    fn parse_and_serialize() {
        let (rest, ske) = EcdheServerKeyExchange::parse(MESSAGE, ctx()).unwrap();
        assert!(rest.is_empty());
        assert_eq!(ske.curve_type, CurveType::NamedCurve);
        assert_eq!(ske.named_group, NamedGroup::Secp256r1);
        assert_eq!(ske.public_key, vec![1, 2, 3, 4]);
        assert_eq!(ske.signature.as_ref().map(|s| s.signature.len()), Some(2));

        let mut out = Buf::new();
        ske.serialize(&mut out);
        assert_eq!(&*out, MESSAGE);
    }

    #[test]
    fn signature_is_optional() {
        let (rest, ske) = EcdheServerKeyExchange::parse(&MESSAGE[..8], ctx()).unwrap();
        assert!(rest.is_empty());
        assert!(ske.signature.is_none());
    }

    #[test]
    fn after_parse_records_peer_key() {
        let mut state =
            ConnectionState::new(Arc::new(Config::default()), ConnectionEnd::Client);
        let (_, mut ske) = EcdheServerKeyExchange::parse(MESSAGE, ctx()).unwrap();
        ske.after_parse(&mut state).unwrap();
        assert_eq!(state.named_group(), Some(NamedGroup::Secp256r1));
        assert_eq!(state.peer_ephemeral_public_key(), &[1, 2, 3, 4]);
    }

    #[test]
    fn prepare_without_signing_key_sends_empty_signature() {
        let config = Config::builder().rng_seed(1).build().unwrap();
        let mut state = ConnectionState::new(Arc::new(config), ConnectionEnd::Server);
        let mut ske = EcdheServerKeyExchange::new();
        ske.prepare(&mut state).unwrap();

        assert_eq!(ske.named_group, NamedGroup::X25519);
        assert_eq!(ske.public_key.len(), 32);
        assert_eq!(ske.signature.as_ref().map(|s| s.signature.len()), Some(0));

        let payload = &ske.computations.as_ref().unwrap().signature_payload;
        assert_eq!(payload.len(), 64 + 1 + 2 + 1 + 32);
        assert_eq!(&payload[64..67], &[0x03, 0x00, 0x1d]);
    }
}
