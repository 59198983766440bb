//! Message kinds and the behaviors the pipeline runs on them.
//!
//! Every kind implements [`MessageHandler`]. The [`messages!`] table below
//! is the single place a kind is registered: it generates the [`Message`]
//! enum, the [`MessageKind`] tag, the wire framing and the dispatch for all
//! six behaviors. Adding a message kind is one table row.

mod certificate_request;
mod certificate_status;
mod extension;
pub mod extensions;
mod key_update;
mod server_key_exchange;
mod util;

pub use certificate_request::CertificateRequest;
pub use certificate_status::{CertificateStatusMessage, OCSP_STATUS_TYPE};
pub use extension::{ExtensionType, RawExtension};
pub use extensions::{EcPointFormatsExtension, EncryptedServerNameIndication};
pub use extensions::{ExtendedMasterSecretExtension, KeyShareExtension, PaddingExtension};
pub use extensions::{SignatureAlgorithmsExtension, SignedCertificateTimestampExtension};
pub use extensions::SupportedGroupsExtension;
pub use key_update::{KeyUpdate, KeyUpdateRequest};
pub use server_key_exchange::{DigitallySigned, EcdheComputations, EcdheServerKeyExchange};

use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u24, be_u8};
use nom::IResult;

use crate::buffer::Buf;
use crate::state::ConnectionState;
use crate::types::{ConnectionEnd, ProtocolVersion};
use crate::Error;

/// What a parser may know about incoming bytes besides the bytes themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseContext {
    /// Role that sent the bytes.
    pub sender: ConnectionEnd,
    pub version: ProtocolVersion,
}

/// Per-kind behaviors.
///
/// SEND runs `prepare`, `serialize`, `after_serialize`. RECEIVE runs `parse`,
/// `after_parse` and, once the surrounding message is fully known,
/// `prepare_after_parse`.
pub trait MessageHandler: Sized {
    /// Decode the message body. Input is attacker controlled.
    fn parse(input: &[u8], ctx: ParseContext) -> IResult<&[u8], Self>;

    /// Fill computed fields from the connection state.
    fn prepare(&mut self, state: &mut ConnectionState) -> Result<(), Error>;

    /// Encode the message body.
    fn serialize(&self, out: &mut Buf);

    /// Adjust the connection after this message was sent.
    fn after_serialize(&mut self, _state: &mut ConnectionState) -> Result<(), Error> {
        Ok(())
    }

    /// Adjust the connection after this message was received.
    fn after_parse(&mut self, state: &mut ConnectionState) -> Result<(), Error>;

    /// Deferred work that needs sibling messages to be processed first.
    fn prepare_after_parse(&mut self, _state: &mut ConnectionState) -> Result<(), Error> {
        Ok(())
    }
}

/// How a message kind is framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// `msg_type(1) length(3) body`
    Handshake(u8),
    /// `extension_type(2) length(2) body`
    Extension(ExtensionType),
}

/// Which framing incoming bytes use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Handshake,
    Extension,
}

macro_rules! messages {
    ($($variant:ident($ty:ty) => $frame:expr,)*) => {
        /// A message of any supported kind.
        #[derive(Debug)]
        pub enum Message {
            $($variant($ty),)*
        }

        /// Tag identifying a message kind.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum MessageKind {
            $($variant,)*
        }

        impl MessageKind {
            pub const ALL: &'static [MessageKind] = &[$(MessageKind::$variant,)*];

            pub fn frame(&self) -> Frame {
                match self {
                    $(MessageKind::$variant => $frame,)*
                }
            }

            pub fn from_frame(frame: Frame) -> Option<MessageKind> {
                MessageKind::ALL.iter().copied().find(|k| k.frame() == frame)
            }
        }

        $(
            impl From<$ty> for Message {
                fn from(value: $ty) -> Self {
                    Message::$variant(value)
                }
            }
        )*

        impl Message {
            pub fn kind(&self) -> MessageKind {
                match self {
                    $(Message::$variant(_) => MessageKind::$variant,)*
                }
            }

            fn parse_body<'a>(
                kind: MessageKind,
                input: &'a [u8],
                ctx: ParseContext,
            ) -> IResult<&'a [u8], Message> {
                match kind {
                    $(MessageKind::$variant => {
                        let (rest, m) = <$ty as MessageHandler>::parse(input, ctx)?;
                        Ok((rest, Message::$variant(m)))
                    })*
                }
            }

            pub fn prepare(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
                match self {
                    $(Message::$variant(m) => m.prepare(state),)*
                }
            }

            fn serialize_body(&self, out: &mut Buf) {
                match self {
                    $(Message::$variant(m) => m.serialize(out),)*
                }
            }

            pub fn after_serialize(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
                match self {
                    $(Message::$variant(m) => m.after_serialize(state),)*
                }
            }

            pub fn after_parse(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
                match self {
                    $(Message::$variant(m) => m.after_parse(state),)*
                }
            }

            pub fn prepare_after_parse(
                &mut self,
                state: &mut ConnectionState,
            ) -> Result<(), Error> {
                match self {
                    $(Message::$variant(m) => m.prepare_after_parse(state),)*
                }
            }
        }
    };
}

messages! {
    KeyUpdate(KeyUpdate) => Frame::Handshake(24),
    ServerKeyExchange(EcdheServerKeyExchange) => Frame::Handshake(12),
    CertificateRequest(CertificateRequest) => Frame::Handshake(13),
    CertificateStatus(CertificateStatusMessage) => Frame::Handshake(22),
    SupportedGroups(SupportedGroupsExtension) => Frame::Extension(ExtensionType::SupportedGroups),
    EcPointFormats(EcPointFormatsExtension) => Frame::Extension(ExtensionType::EcPointFormats),
    SignatureAlgorithms(SignatureAlgorithmsExtension) => Frame::Extension(ExtensionType::SignatureAlgorithms),
    KeyShare(KeyShareExtension) => Frame::Extension(ExtensionType::KeyShare),
    EncryptedServerName(EncryptedServerNameIndication) => Frame::Extension(ExtensionType::EncryptedServerName),
    Padding(PaddingExtension) => Frame::Extension(ExtensionType::Padding),
    ExtendedMasterSecret(ExtendedMasterSecretExtension) => Frame::Extension(ExtensionType::ExtendedMasterSecret),
    SignedCertificateTimestamp(SignedCertificateTimestampExtension) => Frame::Extension(ExtensionType::SignedCertificateTimestamp),
}

impl Message {
    pub fn frame(&self) -> Frame {
        self.kind().frame()
    }

    /// Encode header and body.
    pub fn serialize(&self, out: &mut Buf) {
        match self.frame() {
            Frame::Handshake(msg_type) => {
                out.push(msg_type);
                out.with_u24_len(|b| self.serialize_body(b));
            }
            Frame::Extension(ext) => {
                out.push_u16(ext.as_u16());
                out.with_u16_len(|b| self.serialize_body(b));
            }
        }
    }

    /// Decode one framed message, returning it and the unconsumed input.
    ///
    /// Bytes the body parser leaves inside the declared length are dropped
    /// with a warning.
    pub fn parse(input: &[u8], layer: Layer, ctx: ParseContext) -> Result<(Message, &[u8]), Error> {
        let (rest, frame, body) = match layer {
            Layer::Handshake => {
                let (i, msg_type) = be_u8(input)?;
                let (i, len) = be_u24(i)?;
                let (rest, body) = take(len)(i)?;
                (rest, Frame::Handshake(msg_type), body)
            }
            Layer::Extension => {
                let (i, ext) = ExtensionType::parse(input)?;
                let (i, len) = be_u16(i)?;
                let (rest, body) = take(len)(i)?;
                (rest, Frame::Extension(ext), body)
            }
        };

        let kind = MessageKind::from_frame(frame)
            .ok_or_else(|| Error::ParseError(format!("no message kind for {:?}", frame)))?;
        let (trailing, message) = Message::parse_body(kind, body, ctx)?;
        if !trailing.is_empty() {
            warn!("{:?} body has {} trailing bytes", kind, trailing.len());
        }
        Ok((message, rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ParseContext {
        ParseContext {
            sender: ConnectionEnd::Client,
            version: ProtocolVersion::Tls13,
        }
    }

    #[test]
    fn every_kind_has_a_distinct_frame() {
        for (i, a) in MessageKind::ALL.iter().enumerate() {
            for b in &MessageKind::ALL[i + 1..] {
                assert_ne!(a.frame(), b.frame(), "{:?} vs {:?}", a, b);
            }
            assert_eq!(MessageKind::from_frame(a.frame()), Some(*a));
        }
    }

    #[test]
    fn handshake_framing() {
        let msg = Message::from(KeyUpdate::new(KeyUpdateRequest::UpdateRequested));
        let mut out = Buf::new();
        msg.serialize(&mut out);
        assert_eq!(&*out, &[24, 0, 0, 1, 1]);

        let (parsed, rest) = Message::parse(&out, Layer::Handshake, ctx()).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.kind(), MessageKind::KeyUpdate);
    }

    #[test]
    fn unknown_kinds_are_parse_errors() {
        let err = Message::parse(&[99, 0, 0, 0], Layer::Handshake, ctx()).unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
        let err = Message::parse(&[0xab, 0xcd, 0, 0], Layer::Extension, ctx()).unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }

    #[test]
    fn length_beyond_input_is_a_parse_error() {
        let err = Message::parse(&[24, 0, 0, 9, 1], Layer::Handshake, ctx()).unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }

    #[test]
    fn trailing_body_bytes_are_tolerated() {
        let (parsed, rest) =
            Message::parse(&[24, 0, 0, 2, 0, 7, 0xff], Layer::Handshake, ctx()).unwrap();
        assert_eq!(parsed.kind(), MessageKind::KeyUpdate);
        assert_eq!(rest, &[0xff]);
    }
}
