//! signature_algorithms extension (RFC 5246 Section 7.4.1.4.1)

use nom::IResult;

use crate::buffer::Buf;
use crate::message::util::list_u16;
use crate::message::{MessageHandler, ParseContext};
use crate::state::ConnectionState;
use crate::types::SignatureAndHashAlgorithm;
use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureAlgorithmsExtension {
    pub algorithms: Vec<SignatureAndHashAlgorithm>,
}

impl SignatureAlgorithmsExtension {
    pub fn new(algorithms: &[SignatureAndHashAlgorithm]) -> Self {
        SignatureAlgorithmsExtension {
            algorithms: algorithms.to_vec(),
        }
    }
}

impl MessageHandler for SignatureAlgorithmsExtension {
    fn parse(input: &[u8], _ctx: ParseContext) -> IResult<&[u8], Self> {
        let (input, algorithms) = list_u16(SignatureAndHashAlgorithm::parse)(input)?;
        Ok((input, SignatureAlgorithmsExtension { algorithms }))
    }

    fn prepare(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        if self.algorithms.is_empty() {
            self.algorithms = state.config().signature_algorithms().to_vec();
        }
        Ok(())
    }

    fn serialize(&self, out: &mut Buf) {
        out.with_u16_len(|b| {
            for alg in &self.algorithms {
                b.push_u16(alg.as_u16());
            }
        });
    }

    fn after_parse(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        state.set_peer_signature_algorithms(&self.algorithms);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::{ConnectionEnd, ProtocolVersion};
    use crate::Config;

    #[test]
    fn default_config_serializes_ecdsa_pairs() {
        let mut state = ConnectionState::new(Arc::new(Config::default()), ConnectionEnd::Client);
        let mut ext = SignatureAlgorithmsExtension::default();
        ext.prepare(&mut state).unwrap();

        let mut out = Buf::new();
        ext.serialize(&mut out);
        assert_eq!(&*out, &[0x00, 0x04, 0x04, 0x03, 0x05, 0x03]);

        let ctx = ParseContext {
            sender: ConnectionEnd::Client,
            version: ProtocolVersion::Tls13,
        };
        let (_, mut parsed) = SignatureAlgorithmsExtension::parse(&out, ctx).unwrap();
        let mut server = ConnectionState::new(Arc::new(Config::default()), ConnectionEnd::Server);
        parsed.after_parse(&mut server).unwrap();
        assert_eq!(server.peer_signature_algorithms(), ext.algorithms.as_slice());
    }
}
