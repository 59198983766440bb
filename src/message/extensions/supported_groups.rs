//! supported_groups extension (RFC 8422 Section 5.1.1, RFC 8446 Section 4.2.7)

use nom::IResult;

use crate::buffer::Buf;
use crate::message::util::list_u16;
use crate::message::{MessageHandler, ParseContext};
use crate::state::ConnectionState;
use crate::types::NamedGroup;
use crate::Error;

/// Named groups the sender supports, most preferred first.
///
/// Unknown code points are kept so the list can be re-serialized exactly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SupportedGroupsExtension {
    pub groups: Vec<NamedGroup>,
}

impl SupportedGroupsExtension {
    pub fn new(groups: &[NamedGroup]) -> Self {
        SupportedGroupsExtension {
            groups: groups.to_vec(),
        }
    }
}

impl MessageHandler for SupportedGroupsExtension {
    fn parse(input: &[u8], _ctx: ParseContext) -> IResult<&[u8], Self> {
        let (input, groups) = list_u16(NamedGroup::parse)(input)?;
        Ok((input, SupportedGroupsExtension { groups }))
    }

    fn prepare(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        if self.groups.is_empty() {
            self.groups = state.config().named_groups().to_vec();
        }
        Ok(())
    }

    fn serialize(&self, out: &mut Buf) {
        out.with_u16_len(|b| {
            for group in &self.groups {
                b.push_u16(group.as_u16());
            }
        });
    }

    fn after_parse(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        debug!("Peer named groups: {:?}", self.groups);
        state.set_peer_named_groups(&self.groups);
        Ok(())
    }
}
