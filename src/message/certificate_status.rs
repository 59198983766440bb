//! CertificateStatus handshake message (RFC 6066 Section 8)
//!
//! ```text
//! struct {
//!     CertificateStatusType status_type;   // ocsp(1)
//!     opaque OCSPResponse<1..2^24-1>;
//! } CertificateStatus;
//! ```
//!
//! The OCSP response stays opaque. Receiving one asks the configured
//! [`CertificateStatusSource`](crate::ocsp::CertificateStatusSource) what it
//! means.

use nom::bytes::complete::take;
use nom::number::complete::{be_u24, be_u8};
use nom::IResult;

use super::{MessageHandler, ParseContext};
use crate::buffer::Buf;
use crate::ocsp::CertificateStatus;
use crate::state::ConnectionState;
use crate::Error;

pub const OCSP_STATUS_TYPE: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateStatusMessage {
    pub status_type: u8,
    pub response: Vec<u8>,
}

impl Default for CertificateStatusMessage {
    fn default() -> Self {
        CertificateStatusMessage {
            status_type: OCSP_STATUS_TYPE,
            response: Vec::new(),
        }
    }
}

impl MessageHandler for CertificateStatusMessage {
    fn parse(input: &[u8], _ctx: ParseContext) -> IResult<&[u8], Self> {
        let (input, status_type) = be_u8(input)?;
        let (input, len) = be_u24(input)?;
        let (input, response) = take(len)(input)?;
        Ok((
            input,
            CertificateStatusMessage {
                status_type,
                response: response.to_vec(),
            },
        ))
    }

    fn prepare(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        if self.response.is_empty() {
            self.response = state.config().ocsp_response().to_vec();
        }
        Ok(())
    }

    fn serialize(&self, out: &mut Buf) {
        out.push(self.status_type);
        out.with_u24_len(|b| b.extend_from_slice(&self.response));
    }

    fn after_parse(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        if self.status_type != OCSP_STATUS_TYPE {
            warn!("Unexpected certificate status type {}", self.status_type);
        }
        let status = match state.config().certificate_status_source() {
            Some(source) => source.lookup(&self.response),
            None => {
                debug!("No certificate status source, status is unknown");
                CertificateStatus::unknown()
            }
        };
        info!("Peer certificate status: {}", status);
        state.set_certificate_status(status);
        Ok(())
    }
}
