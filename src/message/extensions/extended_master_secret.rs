//! extended_master_secret extension (RFC 7627). Always empty.

use nom::IResult;

use crate::buffer::Buf;
use crate::message::{MessageHandler, ParseContext};
use crate::state::ConnectionState;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtendedMasterSecretExtension;

impl MessageHandler for ExtendedMasterSecretExtension {
    fn parse(input: &[u8], _ctx: ParseContext) -> IResult<&[u8], Self> {
        if !input.is_empty() {
            debug!("extended_master_secret with {} byte body", input.len());
        }
        Ok((input, ExtendedMasterSecretExtension))
    }

    fn prepare(&mut self, _state: &mut ConnectionState) -> Result<(), Error> {
        Ok(())
    }

    fn serialize(&self, _out: &mut Buf) {}

    fn after_serialize(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        state.set_extended_master_secret(true);
        Ok(())
    }

    fn after_parse(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        state.set_extended_master_secret(true);
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
    fn received_extension_sets_flag() {
        let mut state = ConnectionState::new(Arc::new(Config::default()), ConnectionEnd::Server);
        assert!(!state.extended_master_secret());

        let ctx = ParseContext {
            sender: ConnectionEnd::Client,
            version: ProtocolVersion::Tls12,
        };
        let (rest, mut ext) = ExtendedMasterSecretExtension::parse(&[], ctx).unwrap();
        assert!(rest.is_empty());
        ext.after_parse(&mut state).unwrap();
        assert!(state.extended_master_secret());
    }
}
