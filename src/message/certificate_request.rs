//! CertificateRequest in both layouts.
//!
//! TLS 1.2 (RFC 5246 Section 7.4.4):
//! ```text
//! struct {
//!     ClientCertificateType certificate_types<1..2^8-1>;
//!     SignatureAndHashAlgorithm supported_signature_algorithms<2..2^16-2>;
//!     DistinguishedName certificate_authorities<0..2^16-1>;
//! } CertificateRequest;
//! ```
//!
//! TLS 1.3 (RFC 8446 Section 4.3.2):
//! ```text
//! struct {
//!     opaque certificate_request_context<0..2^8-1>;
//!     Extension extensions<2..2^16-1>;
//! } CertificateRequest;
//! ```

use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

use super::util::{list_u16, list_u8, many0, opaque_u16, opaque_u8};
use super::{ExtensionType, MessageHandler, ParseContext, RawExtension};
use crate::buffer::Buf;
use crate::state::ConnectionState;
use crate::types::{ClientCertificateType, ProtocolVersion, SignatureAndHashAlgorithm};
use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CertificateRequest {
    /// Layout to serialize with. Taken from the connection when prepared
    /// and from the parse context when received.
    pub version: ProtocolVersion,
    /// TLS 1.2 only.
    pub certificate_types: Vec<ClientCertificateType>,
    pub signature_algorithms: Vec<SignatureAndHashAlgorithm>,
    /// DER encoded distinguished names.
    pub certificate_authorities: Vec<Vec<u8>>,
    /// TLS 1.3 only.
    pub context: Vec<u8>,
    /// TLS 1.3 extensions other than signature_algorithms and
    /// certificate_authorities.
    pub other_extensions: Vec<RawExtension>,
}

fn distinguished_name(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let (input, name) = opaque_u16(input)?;
    Ok((input, name.to_vec()))
}

fn certificate_type(input: &[u8]) -> IResult<&[u8], ClientCertificateType> {
    let (input, value) = be_u8(input)?;
    Ok((input, ClientCertificateType::from_u8(value)))
}

fn push_signature_algorithms(out: &mut Buf, algorithms: &[SignatureAndHashAlgorithm]) {
    out.with_u16_len(|b| {
        for alg in algorithms {
            b.push_u16(alg.as_u16());
        }
    });
}

fn push_authorities(out: &mut Buf, names: &[Vec<u8>]) {
    out.with_u16_len(|b| {
        for name in names {
            b.push_vec_u16(name);
        }
    });
}

impl CertificateRequest {
    fn parse_tls12(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, certificate_types) = list_u8(certificate_type)(input)?;
        let (input, signature_algorithms) = list_u16(SignatureAndHashAlgorithm::parse)(input)?;
        let (input, certificate_authorities) = list_u16(distinguished_name)(input)?;

        Ok((
            input,
            CertificateRequest {
                version: ProtocolVersion::Tls12,
                certificate_types,
                signature_algorithms,
                certificate_authorities,
                ..Default::default()
            },
        ))
    }

    fn parse_tls13(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, context) = opaque_u8(input)?;
        let (input, ext_len) = be_u16(input)?;
        let (input, ext_block) = take(ext_len)(input)?;
        let (_, extensions) = many0(RawExtension::parse)(ext_block)?;

        let mut request = CertificateRequest {
            version: ProtocolVersion::Tls13,
            context: context.to_vec(),
            ..Default::default()
        };
        for ext in extensions {
            match ext.extension_type {
                ExtensionType::SignatureAlgorithms => {
                    let (_, algs) =
                        list_u16(SignatureAndHashAlgorithm::parse)(&ext.extension_data)
                            .map_err(|e| e.map_input(|_| input))?;
                    request.signature_algorithms = algs;
                }
                ExtensionType::CertificateAuthorities => {
                    let (_, names) = list_u16(distinguished_name)(&ext.extension_data)
                        .map_err(|e| e.map_input(|_| input))?;
                    request.certificate_authorities = names;
                }
                _ => request.other_extensions.push(ext),
            }
        }
        Ok((input, request))
    }
}

impl MessageHandler for CertificateRequest {
    fn parse(input: &[u8], ctx: ParseContext) -> IResult<&[u8], Self> {
        if ctx.version.is_tls13() {
            Self::parse_tls13(input)
        } else {
            Self::parse_tls12(input)
        }
    }

    fn prepare(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        let config = state.config();
        self.version = state.version();
        if self.certificate_types.is_empty() {
            self.certificate_types = config.client_certificate_types().to_vec();
        }
        if self.signature_algorithms.is_empty() {
            self.signature_algorithms = config.signature_algorithms().to_vec();
        }
        if self.certificate_authorities.is_empty() {
            self.certificate_authorities = config.distinguished_names().to_vec();
        }
        if self.context.is_empty() {
            self.context = config.certificate_request_context().to_vec();
        }
        debug!(
            "CertificateRequest {:?}: {} signature algorithms, {} authorities",
            self.version,
            self.signature_algorithms.len(),
            self.certificate_authorities.len()
        );
        Ok(())
    }

    fn serialize(&self, out: &mut Buf) {
        if self.version.is_tls13() {
            out.push_vec_u8(&self.context);
            out.with_u16_len(|b| {
                b.push_u16(ExtensionType::SignatureAlgorithms.as_u16());
                b.with_u16_len(|e| push_signature_algorithms(e, &self.signature_algorithms));
                if !self.certificate_authorities.is_empty() {
                    b.push_u16(ExtensionType::CertificateAuthorities.as_u16());
                    b.with_u16_len(|e| push_authorities(e, &self.certificate_authorities));
                }
                for ext in &self.other_extensions {
                    ext.serialize(b);
                }
            });
        } else {
            out.push(self.certificate_types.len() as u8);
            for t in &self.certificate_types {
                out.push(t.as_u8());
            }
            push_signature_algorithms(out, &self.signature_algorithms);
            push_authorities(out, &self.certificate_authorities);
        }
    }

    fn after_serialize(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        if self.version.is_tls13() {
            state.set_certificate_request_context(&self.context);
        }
        Ok(())
    }

    fn after_parse(&mut self, state: &mut ConnectionState) -> Result<(), Error> {
        if self.version.is_tls13() {
            state.set_certificate_request_context(&self.context);
        }
        state.set_peer_signature_algorithms(&self.signature_algorithms);
        state.set_client_authentication_requested(true);
        Ok(())
    }
}
