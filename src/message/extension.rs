use nom::bytes::complete::take;
use nom::number::complete::be_u16;
use nom::IResult;

use crate::buffer::Buf;

/// An extension kept as raw bytes, for containers that carry extensions the
/// engine does not model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExtension {
    pub extension_type: ExtensionType,
    pub extension_data: Vec<u8>,
}

impl RawExtension {
    pub fn new(extension_type: ExtensionType, extension_data: Vec<u8>) -> Self {
        RawExtension {
            extension_type,
            extension_data,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], RawExtension> {
        let (input, extension_type) = ExtensionType::parse(input)?;
        let (input, extension_length) = be_u16(input)?;
        let (input, extension_data) = take(extension_length)(input)?;

        Ok((
            input,
            RawExtension {
                extension_type,
                extension_data: extension_data.to_vec(),
            },
        ))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.push_u16(self.extension_type.as_u16());
        output.push_vec_u16(&self.extension_data);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionType {
    ServerName,
    SupportedGroups,
    EcPointFormats,
    SignatureAlgorithms,
    SignedCertificateTimestamp,
    Padding,
    ExtendedMasterSecret,
    SupportedVersions,
    CertificateAuthorities,
    OidFilters,
    KeyShare,
    EncryptedServerName,
    Unknown(u16),
}

impl ExtensionType {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0000 => ExtensionType::ServerName,
            0x000A => ExtensionType::SupportedGroups,
            0x000B => ExtensionType::EcPointFormats,
            0x000D => ExtensionType::SignatureAlgorithms,
            0x0012 => ExtensionType::SignedCertificateTimestamp,
            0x0015 => ExtensionType::Padding,
            0x0017 => ExtensionType::ExtendedMasterSecret,
            0x002B => ExtensionType::SupportedVersions,
            0x002F => ExtensionType::CertificateAuthorities,
            0x0030 => ExtensionType::OidFilters,
            0x0033 => ExtensionType::KeyShare,
            0xFFCE => ExtensionType::EncryptedServerName,
            _ => ExtensionType::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            ExtensionType::ServerName => 0x0000,
            ExtensionType::SupportedGroups => 0x000A,
            ExtensionType::EcPointFormats => 0x000B,
            ExtensionType::SignatureAlgorithms => 0x000D,
            ExtensionType::SignedCertificateTimestamp => 0x0012,
            ExtensionType::Padding => 0x0015,
            ExtensionType::ExtendedMasterSecret => 0x0017,
            ExtensionType::SupportedVersions => 0x002B,
            ExtensionType::CertificateAuthorities => 0x002F,
            ExtensionType::OidFilters => 0x0030,
            ExtensionType::KeyShare => 0x0033,
            ExtensionType::EncryptedServerName => 0xFFCE,
            ExtensionType::Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ExtensionType> {
        let (input, value) = be_u16(input)?;
        Ok((input, ExtensionType::from_u16(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_extension_roundtrip() {
        let bytes = [0x00, 0x30, 0x00, 0x02, 0xaa, 0xbb];
        let (rest, ext) = RawExtension::parse(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(ext.extension_type, ExtensionType::OidFilters);

        let mut out = Buf::new();
        ext.serialize(&mut out);
        assert_eq!(&*out, &bytes);
    }

    #[test]
    fn truncated_extension_fails() {
        assert!(RawExtension::parse(&[0x00, 0x15, 0x00, 0x04, 0x00]).is_err());
    }
}
