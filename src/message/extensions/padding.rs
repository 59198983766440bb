//! padding extension (RFC 7685)
//!
//! The body is `padding_length` zero bytes. Received padding is kept as is,
//! non-zero bytes included.

use nom::IResult;

use crate::buffer::Buf;
use crate::message::{MessageHandler, ParseContext};
use crate::state::ConnectionState;
use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaddingExtension {
    pub padding: Vec<u8>,
}

impl PaddingExtension {
    pub fn new(len: usize) -> Self {
        PaddingExtension {
            padding: vec![0; len],
        }
    }
}

impl MessageHandler for PaddingExtension {
    fn parse(input: &[u8], _ctx: ParseContext) -> IResult<&[u8], Self> {
        Ok((
            &input[input.len()..],
            PaddingExtension {
                padding: input.to_vec(),
            },
        ))
    }

    fn prepare(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        if self.padding.is_empty() {
            self.padding = vec![0; state.config().padding_length()];
        }
        Ok(())
    }

    fn serialize(&self, out: &mut Buf) {
        out.extend_from_slice(&self.padding);
    }

    fn after_parse(&mut self, _state: &mut ConnectionState) -> Result<(), Error> {
        if self.padding.iter().any(|b| *b != 0) {
            warn!("Padding extension contains non-zero bytes");
        }
        Ok(())
    }
}
