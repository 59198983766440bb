//! Send and receive drivers.
//!
//! Sending runs `prepare`, `serialize` and `after_serialize` with the local
//! role as talking end. Receiving runs `parse` and `after_parse` with the peer
//! as talking end, then `prepare_after_parse`.
//!
//! Extension blocks are received in two passes so that deferred work sees
//! every sibling extension. Encrypted SNI needs the key shares that travel in
//! the same ClientHello.

use crate::buffer::Buf;
use crate::message::{ExtensionType, Frame, Layer, Message, MessageKind, ParseContext, RawExtension};
use crate::state::ConnectionState;
use crate::Error;

/// Prepare and encode one message, then let it adjust the state.
pub fn send(message: &mut Message, state: &mut ConnectionState) -> Result<Buf, Error> {
    state.set_talking_end(state.local_role());

    message.prepare(state)?;
    let mut out = Buf::new();
    message.serialize(&mut out);
    message.after_serialize(state)?;

    debug!("Sent {:?} ({} bytes)", message.kind(), out.len());
    Ok(out)
}

/// Encode `messages` as a `u16` length prefixed extension block.
///
/// Each extension is fully sent before the next one is prepared.
pub fn send_extensions(messages: &mut [Message], state: &mut ConnectionState) -> Result<Buf, Error> {
    let mut encoded = Vec::with_capacity(messages.len());
    for message in messages.iter_mut() {
        if !matches!(message.frame(), Frame::Extension(_)) {
            return Err(Error::PreparationError(format!(
                "{:?} is not an extension",
                message.kind()
            )));
        }
        encoded.push(send(message, state)?);
    }

    let mut out = Buf::new();
    out.with_u16_len(|b| {
        for ext in &encoded {
            b.extend_from_slice(ext);
        }
    });
    Ok(out)
}

/// Decode one framed message sent by the peer and apply it.
///
/// Returns the message and whatever input followed it.
pub fn receive<'a>(
    input: &'a [u8],
    layer: Layer,
    state: &mut ConnectionState,
) -> Result<(Message, &'a [u8]), Error> {
    let peer = state.local_role().peer();
    state.set_talking_end(peer);

    let ctx = ParseContext {
        sender: peer,
        version: state.version(),
    };
    let (mut message, rest) = Message::parse(input, layer, ctx)?;
    debug!("Received {:?}", message.kind());

    message.after_parse(state)?;
    deferred(&mut message, state)?;
    Ok((message, rest))
}

/// Decode a `u16` length prefixed extension block sent by the peer.
///
/// Extensions without a message kind are skipped. Deferred work runs only
/// after every extension has been parsed and applied. A deferred crypto
/// failure leaves that extension's derived fields unset and the rest of the
/// block is still returned.
pub fn receive_extensions(input: &[u8], state: &mut ConnectionState) -> Result<Vec<Message>, Error> {
    let (block, _) = split_block(input)?;

    let peer = state.local_role().peer();
    state.set_talking_end(peer);
    let ctx = ParseContext {
        sender: peer,
        version: state.version(),
    };

    let mut messages = Vec::new();
    let mut rest = block;
    while !rest.is_empty() {
        let (_, ext_type) = ExtensionType::parse(rest)?;
        if MessageKind::from_frame(Frame::Extension(ext_type)).is_none() {
            let (after, _) = RawExtension::parse(rest)?;
            debug!("Skipping extension {:?}", ext_type);
            rest = after;
            continue;
        }

        let (mut message, after) = Message::parse(rest, Layer::Extension, ctx)?;
        message.after_parse(state)?;
        messages.push(message);
        rest = after;
    }

    for message in messages.iter_mut() {
        deferred(message, state)?;
    }
    debug!("Received {} extensions", messages.len());
    Ok(messages)
}

/// `prepare_after_parse`, tolerating `CryptoOperationError`.
fn deferred(message: &mut Message, state: &mut ConnectionState) -> Result<(), Error> {
    match message.prepare_after_parse(state) {
        Err(Error::CryptoOperationError(reason)) => {
            warn!("{:?} left unprocessed: {}", message.kind(), reason);
            Ok(())
        }
        other => other,
    }
}

fn split_block(input: &[u8]) -> Result<(&[u8], &[u8]), Error> {
    if input.len() < 2 {
        return Err(Error::ParseError("extension block without length".into()));
    }
    let len = u16::from_be_bytes([input[0], input[1]]) as usize;
    let body = &input[2..];
    if body.len() < len {
        return Err(Error::ParseError(format!(
            "extension block declares {} bytes, {} present",
            len,
            body.len()
        )));
    }
    if body.len() > len {
        warn!("{} bytes after the extension block", body.len() - len);
    }
    Ok(body.split_at(len))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::message::{PaddingExtension, SupportedGroupsExtension};
    use crate::types::{ConnectionEnd, NamedGroup};
    use crate::Config;

    fn state(role: ConnectionEnd) -> ConnectionState {
        ConnectionState::new(Arc::new(Config::default()), role)
    }

    #[test]
    fn unknown_extensions_are_skipped() {
        let mut server = state(ConnectionEnd::Server);
        let block = [
            0x00, 0x0e, // block length
            0xab, 0xcd, 0x00, 0x02, 0x01, 0x02, // unknown
            0x00, 0x0a, 0x00, 0x04, 0x00, 0x02, 0x00, 0x1d, // supported_groups
        ];
        let messages = receive_extensions(&block, &mut server).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind(), MessageKind::SupportedGroups);
        assert_eq!(server.peer_named_groups(), &[NamedGroup::X25519]);
        assert_eq!(server.talking_end(), ConnectionEnd::Client);
    }

    #[test]
    fn short_block_is_a_parse_error() {
        let mut server = state(ConnectionEnd::Server);
        let err = receive_extensions(&[0x00, 0x08, 0x00], &mut server).unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }

    #[test]
    fn handshake_messages_are_not_extensions() {
        let mut client = state(ConnectionEnd::Client);
        let mut messages = vec![Message::from(crate::message::KeyUpdate::default())];
        let err = send_extensions(&mut messages, &mut client).unwrap_err();
        assert!(matches!(err, Error::PreparationError(_)));
    }

    #[test]
    fn extension_block_round_trip() {
        let mut client = state(ConnectionEnd::Client);
        let mut messages = vec![
            Message::from(SupportedGroupsExtension::default()),
            Message::from(PaddingExtension::default()),
        ];
        let block = send_extensions(&mut messages, &mut client).unwrap();
        assert_eq!(client.talking_end(), ConnectionEnd::Client);

        let mut server = state(ConnectionEnd::Server);
        let received = receive_extensions(&block, &mut server).unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(server.peer_named_groups(), Config::default().named_groups());
    }
}
