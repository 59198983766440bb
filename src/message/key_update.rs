//! TLS 1.3 KeyUpdate message (RFC 8446 Section 4.6.3)
//!
//! Format:
//! ```text
//! enum {
//!     update_not_requested(0),
//!     update_requested(1),
//!     (255)
//! } KeyUpdateRequest;
//!
//! struct {
//!     KeyUpdateRequest request_update;
//! } KeyUpdate;
//! ```
//!
//! Handling either side of a KeyUpdate rekeys the direction the talking end
//! writes with. Both application traffic secrets are rotated first, but
//! only when the message carries `update_requested`.

use nom::number::complete::be_u8;
use nom::IResult;

use super::{MessageHandler, ParseContext};
use crate::buffer::Buf;
use crate::crypto::key_schedule::update_application_traffic_secret;
use crate::crypto::CipherSuiteDescriptor;
use crate::record::{rekey, KeySetType};
use crate::state::ConnectionState;
use crate::Error;

/// KeyUpdate request type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUpdateRequest {
    UpdateNotRequested,
    UpdateRequested,
    /// Out of range value, kept so malformed messages survive a round trip.
    Unknown(u8),
}

impl KeyUpdateRequest {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => KeyUpdateRequest::UpdateNotRequested,
            1 => KeyUpdateRequest::UpdateRequested,
            _ => KeyUpdateRequest::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            KeyUpdateRequest::UpdateNotRequested => 0,
            KeyUpdateRequest::UpdateRequested => 1,
            KeyUpdateRequest::Unknown(value) => *value,
        }
    }
}

/// KeyUpdate message.
///
/// `request_update` left as `None` is filled from the configuration when
/// the message is prepared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyUpdate {
    pub request_update: Option<KeyUpdateRequest>,
}

impl KeyUpdate {
    pub fn new(request_update: KeyUpdateRequest) -> Self {
        KeyUpdate {
            request_update: Some(request_update),
        }
    }

    /// Returns true if the secrets rotate before rekeying.
    pub fn is_update_requested(&self) -> bool {
        self.request_update == Some(KeyUpdateRequest::UpdateRequested)
    }

    fn apply(&self, state: &mut ConnectionState) -> Result<(), Error> {
        if self.is_update_requested() {
            let suite = state.cipher_suite().ok_or_else(|| {
                Error::PreparationError("KeyUpdate without a selected cipher suite".into())
            })?;
            let hash = CipherSuiteDescriptor::lookup(suite)?.hash;

            let client =
                update_application_traffic_secret(state.client_application_traffic_secret(), hash)?;
            let server =
                update_application_traffic_secret(state.server_application_traffic_secret(), hash)?;
            state.set_application_traffic_secrets(&client, &server);
            debug!("Updated application traffic secrets");
        }

        let local = state.local_role();
        let talking = state.talking_end();
        rekey(state, KeySetType::ApplicationTrafficSecrets, local, talking)?;
        Ok(())
    }
}

impl MessageHandler for KeyUpdate {
    fn parse(input: &[u8], _ctx: ParseContext) -> IResult<&[u8], Self> {
        let (input, value) = be_u8(input)?;
        Ok((input, KeyUpdate::new(KeyUpdateRequest::from_u8(value))))
    }

    fn prepare(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        if self.request_update.is_none() {
            self.request_update = Some(state.config().key_update_request());
        }
        Ok(())
    }

    fn serialize(&self, out: &mut Buf) {
        let request = self
            .request_update
            .unwrap_or(KeyUpdateRequest::UpdateNotRequested);
        out.push(request.as_u8());
    }

    fn after_serialize(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        state.set_talking_end(state.local_role());
        self.apply(state)
    }

    fn after_parse(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        if state.talking_end() == state.local_role() {
            trace!("KeyUpdate parsed on the sending side, nothing to do");
            return Ok(());
        }
        self.apply(state)
    }
}
