//! ec_point_formats extension (RFC 8422 Section 5.1.2)

use nom::number::complete::be_u8;
use nom::IResult;

use crate::buffer::Buf;
use crate::message::util::list_u8;
use crate::message::{MessageHandler, ParseContext};
use crate::state::ConnectionState;
use crate::types::ECPointFormat;
use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EcPointFormatsExtension {
    pub formats: Vec<ECPointFormat>,
}

impl EcPointFormatsExtension {
    pub fn new(formats: &[ECPointFormat]) -> Self {
        EcPointFormatsExtension {
            formats: formats.to_vec(),
        }
    }
}

fn point_format(input: &[u8]) -> IResult<&[u8], ECPointFormat> {
    let (input, value) = be_u8(input)?;
    Ok((input, ECPointFormat::from_u8(value)))
}

impl MessageHandler for EcPointFormatsExtension {
    fn parse(input: &[u8], _ctx: ParseContext) -> IResult<&[u8], Self> {
        let (input, formats) = list_u8(point_format)(input)?;
        Ok((input, EcPointFormatsExtension { formats }))
    }

    fn prepare(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        if self.formats.is_empty() {
            self.formats = state.config().point_formats().to_vec();
        }
        Ok(())
    }

    fn serialize(&self, out: &mut Buf) {
        out.push(self.formats.len() as u8);
        for format in &self.formats {
            out.push(format.as_u8());
        }
    }

    fn after_parse(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        state.set_peer_point_formats(&self.formats);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConnectionEnd, ProtocolVersion};

    #[test]
    fn wire_format() {
        let ctx = ParseContext {
            sender: ConnectionEnd::Server,
            version: ProtocolVersion::Tls12,
        };
        let body = [0x02, 0x00, 0x01];
        let (rest, ext) = EcPointFormatsExtension::parse(&body, ctx).unwrap();
        assert!(rest.is_empty());
        assert_eq!(
            ext.formats,
            vec![ECPointFormat::Uncompressed, ECPointFormat::AnsiX962CompressedPrime]
        );

        let mut out = Buf::new();
        ext.serialize(&mut out);
        assert_eq!(&*out, &body);
    }

    #[test]
    fn list_longer_than_body_fails() {
        let ctx = ParseContext {
            sender: ConnectionEnd::Server,
            version: ProtocolVersion::Tls12,
        };
        assert!(EcPointFormatsExtension::parse(&[0x04, 0x00], ctx).is_err());
    }
}
