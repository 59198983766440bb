//! signed_certificate_timestamp extension (RFC 6962 Section 3.3.1)
//!
//! Empty in a ClientHello. A server carries a SignedCertificateTimestampList,
//! which is kept opaque.

use nom::IResult;

use crate::buffer::{hex, Buf};
use crate::message::{MessageHandler, ParseContext};
use crate::state::ConnectionState;
use crate::types::ConnectionEnd;
use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignedCertificateTimestampExtension {
    pub timestamps: Vec<u8>,
}

impl MessageHandler for SignedCertificateTimestampExtension {
    fn parse(input: &[u8], _ctx: ParseContext) -> IResult<&[u8], Self> {
        Ok((
            &input[input.len()..],
            SignedCertificateTimestampExtension {
                timestamps: input.to_vec(),
            },
        ))
    }

    fn prepare(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        if self.timestamps.is_empty() && state.local_role() == ConnectionEnd::Server {
            self.timestamps = state.config().signed_certificate_timestamp().to_vec();
        }
        Ok(())
    }

    fn serialize(&self, out: &mut Buf) {
        out.extend_from_slice(&self.timestamps);
    }

    fn after_parse(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        if !self.timestamps.is_empty() {
            debug!("Peer SCT list: {}", hex(&self.timestamps));
            state.set_signed_certificate_timestamp(&self.timestamps);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::ProtocolVersion;
    use crate::Config;

    #[test]
    fn client_sends_empty_server_sends_config() {
        let config = Arc::new(
            Config::builder()
                .signed_certificate_timestamp(&[0x00, 0x02, 0xab, 0xcd])
                .build()
                .unwrap(),
        );

        let mut client = ConnectionState::new(config.clone(), ConnectionEnd::Client);
        let mut ext = SignedCertificateTimestampExtension::default();
        ext.prepare(&mut client).unwrap();
        assert!(ext.timestamps.is_empty());

        let mut server = ConnectionState::new(config, ConnectionEnd::Server);
        ext.prepare(&mut server).unwrap();
        let mut out = Buf::new();
        ext.serialize(&mut out);
        assert_eq!(&*out, &[0x00, 0x02, 0xab, 0xcd]);

        let ctx = ParseContext {
            sender: ConnectionEnd::Server,
            version: ProtocolVersion::Tls12,
        };
        let (_, mut received) = SignedCertificateTimestampExtension::parse(&out, ctx).unwrap();
        received.after_parse(&mut client).unwrap();
        assert_eq!(client.signed_certificate_timestamp(), &[0x00, 0x02, 0xab, 0xcd]);
    }
}
