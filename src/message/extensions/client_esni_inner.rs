//! Plaintext carried inside an encrypted_server_name extension.
//!
//! ```text
//! struct {
//!     opaque nonce[16];
//!     PaddedServerNameList realSNI;
//! } ClientESNIInner;
//!
//! struct {
//!     ServerNameList sni;
//!     opaque zeros[ESNIKeys.padded_length - length(sni)];
//! } PaddedServerNameList;
//! ```

use nom::bytes::complete::take;
use nom::number::complete::be_u8;
use nom::IResult;

use crate::buffer::Buf;
use crate::message::util::{list_u16, opaque_u16};

/// `name_type` of a DNS host name.
pub const HOST_NAME: u8 = 0;

pub const NONCE_LEN: usize = 16;

/// One ServerNameList entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerName {
    pub name_type: u8,
    pub name: Vec<u8>,
}

impl ServerName {
    pub fn host_name(name: &str) -> Self {
        ServerName {
            name_type: HOST_NAME,
            name: name.as_bytes().to_vec(),
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ServerName> {
        let (input, name_type) = be_u8(input)?;
        let (input, name) = opaque_u16(input)?;
        Ok((
            input,
            ServerName {
                name_type,
                name: name.to_vec(),
            },
        ))
    }

    pub fn serialize(&self, out: &mut Buf) {
        out.push(self.name_type);
        out.push_vec_u16(&self.name);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientEsniInner {
    pub nonce: [u8; NONCE_LEN],
    pub server_names: Vec<ServerName>,
    pub padding: Vec<u8>,
}

impl ClientEsniInner {
    pub fn new(nonce: [u8; NONCE_LEN], server_names: Vec<ServerName>) -> Self {
        ClientEsniInner {
            nonce,
            server_names,
            padding: Vec::new(),
        }
    }

    /// Zero padding that brings the server name entries up to `padded_length`.
    pub fn pad_to(&mut self, padded_length: usize) {
        let names_len: usize = self.server_names.iter().map(|n| 3 + n.name.len()).sum();
        self.padding = vec![0; padded_length.saturating_sub(names_len)];
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ClientEsniInner> {
        let (input, nonce) = take(NONCE_LEN)(input)?;
        let (input, server_names) = list_u16(ServerName::parse)(input)?;
        let mut fixed = [0u8; NONCE_LEN];
        fixed.copy_from_slice(nonce);
        Ok((
            &input[input.len()..],
            ClientEsniInner {
                nonce: fixed,
                server_names,
                padding: input.to_vec(),
            },
        ))
    }

    pub fn serialize(&self, out: &mut Buf) {
        out.extend_from_slice(&self.nonce);
        out.with_u16_len(|b| {
            for name in &self.server_names {
                name.serialize(b);
            }
        });
        out.extend_from_slice(&self.padding);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_fills_up_to_target() {
        let mut inner = ClientEsniInner::new([9; 16], vec![ServerName::host_name("example.com")]);
        inner.pad_to(260);
        assert_eq!(inner.padding.len(), 260 - 14);

        let mut out = Buf::new();
        inner.serialize(&mut out);
        assert_eq!(out.len(), 16 + 2 + 260);

        let (rest, parsed) = ClientEsniInner::parse(&out).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, inner);
    }

    #[test]
    fn names_longer_than_target_get_no_padding() {
        let mut inner = ClientEsniInner::new([0; 16], vec![ServerName::host_name("a.example")]);
        inner.pad_to(4);
        assert!(inner.padding.is_empty());
    }

    #[test]
    fn short_nonce_fails() {
        assert!(ClientEsniInner::parse(&[0; 10]).is_err());
    }
}
