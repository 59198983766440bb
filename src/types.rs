//! Protocol identifiers shared by every message and crypto module.
//!
//! All of these keep an `Unknown` variant so attacker supplied values survive
//! a parse and re-serialize unchanged.

use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

// ============================================================================
// Connection roles
// ============================================================================

/// One side of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionEnd {
    Client,
    Server,
}

impl ConnectionEnd {
    /// The other side.
    pub fn peer(&self) -> ConnectionEnd {
        match self {
            ConnectionEnd::Client => ConnectionEnd::Server,
            ConnectionEnd::Server => ConnectionEnd::Client,
        }
    }
}

// ============================================================================
// Protocol Version
// ============================================================================

/// TLS protocol versions the message layouts differ on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolVersion {
    Tls12,
    #[default]
    Tls13,
    Unknown(u16),
}

impl ProtocolVersion {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0303 => ProtocolVersion::Tls12,
            0x0304 => ProtocolVersion::Tls13,
            _ => ProtocolVersion::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            ProtocolVersion::Tls12 => 0x0303,
            ProtocolVersion::Tls13 => 0x0304,
            ProtocolVersion::Unknown(value) => *value,
        }
    }

    pub fn is_tls13(&self) -> bool {
        matches!(self, ProtocolVersion::Tls13)
    }
}

// ============================================================================
// Named Groups (Key Exchange)
// ============================================================================

/// Key exchange groups (RFC 8422, RFC 8446).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedGroup {
    /// secp224r1.
    Secp224r1,
    /// secp256r1 / P-256.
    Secp256r1,
    /// secp384r1 / P-384.
    Secp384r1,
    /// secp521r1 / P-521.
    Secp521r1,
    /// X25519 (Curve25519 for ECDHE).
    X25519,
    /// X448 (Curve448 for ECDHE).
    X448,
    /// Unknown or unsupported group.
    Unknown(u16),
}

impl NamedGroup {
    /// Convert a wire format u16 value to a `NamedGroup`.
    pub fn from_u16(value: u16) -> Self {
        match value {
            21 => NamedGroup::Secp224r1,
            23 => NamedGroup::Secp256r1,
            24 => NamedGroup::Secp384r1,
            25 => NamedGroup::Secp521r1,
            29 => NamedGroup::X25519,
            30 => NamedGroup::X448,
            _ => NamedGroup::Unknown(value),
        }
    }

    /// Convert this `NamedGroup` to its wire format u16 value.
    pub fn as_u16(&self) -> u16 {
        match self {
            NamedGroup::Secp224r1 => 21,
            NamedGroup::Secp256r1 => 23,
            NamedGroup::Secp384r1 => 24,
            NamedGroup::Secp521r1 => 25,
            NamedGroup::X25519 => 29,
            NamedGroup::X448 => 30,
            NamedGroup::Unknown(value) => *value,
        }
    }

    /// Parse a `NamedGroup` from wire format.
    pub fn parse(input: &[u8]) -> IResult<&[u8], NamedGroup> {
        let (input, value) = be_u16(input)?;
        Ok((input, NamedGroup::from_u16(value)))
    }
}

// ============================================================================
// Cipher Suites
// ============================================================================

/// TLS 1.3 cipher suites (RFC 8446 Appendix B.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum CipherSuite {
    /// TLS_AES_128_GCM_SHA256.
    TLS_AES_128_GCM_SHA256,
    /// TLS_AES_256_GCM_SHA384.
    TLS_AES_256_GCM_SHA384,
    /// TLS_CHACHA20_POLY1305_SHA256.
    TLS_CHACHA20_POLY1305_SHA256,
    /// TLS_AES_128_CCM_SHA256.
    TLS_AES_128_CCM_SHA256,
    /// TLS_AES_128_CCM_8_SHA256 (eight byte tag).
    TLS_AES_128_CCM_8_SHA256,
    Unknown(u16),
}

impl CipherSuite {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x1301 => CipherSuite::TLS_AES_128_GCM_SHA256,
            0x1302 => CipherSuite::TLS_AES_256_GCM_SHA384,
            0x1303 => CipherSuite::TLS_CHACHA20_POLY1305_SHA256,
            0x1304 => CipherSuite::TLS_AES_128_CCM_SHA256,
            0x1305 => CipherSuite::TLS_AES_128_CCM_8_SHA256,
            _ => CipherSuite::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CipherSuite::TLS_AES_128_GCM_SHA256 => 0x1301,
            CipherSuite::TLS_AES_256_GCM_SHA384 => 0x1302,
            CipherSuite::TLS_CHACHA20_POLY1305_SHA256 => 0x1303,
            CipherSuite::TLS_AES_128_CCM_SHA256 => 0x1304,
            CipherSuite::TLS_AES_128_CCM_8_SHA256 => 0x1305,
            CipherSuite::Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], CipherSuite> {
        let (input, value) = be_u16(input)?;
        Ok((input, CipherSuite::from_u16(value)))
    }
}

// ============================================================================
// Hash Algorithms
// ============================================================================

/// Hash algorithms (RFC 5246 Section 7.4.1.4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum HashAlgorithm {
    None,
    MD5,
    SHA1,
    SHA224,
    SHA256,
    SHA384,
    SHA512,
    Unknown(u8),
}

impl HashAlgorithm {
    /// Convert a wire format u8 value to a `HashAlgorithm`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => HashAlgorithm::None,
            1 => HashAlgorithm::MD5,
            2 => HashAlgorithm::SHA1,
            3 => HashAlgorithm::SHA224,
            4 => HashAlgorithm::SHA256,
            5 => HashAlgorithm::SHA384,
            6 => HashAlgorithm::SHA512,
            _ => HashAlgorithm::Unknown(value),
        }
    }

    /// Convert this `HashAlgorithm` to its wire format u8 value.
    pub fn as_u8(&self) -> u8 {
        match self {
            HashAlgorithm::None => 0,
            HashAlgorithm::MD5 => 1,
            HashAlgorithm::SHA1 => 2,
            HashAlgorithm::SHA224 => 3,
            HashAlgorithm::SHA256 => 4,
            HashAlgorithm::SHA384 => 5,
            HashAlgorithm::SHA512 => 6,
            HashAlgorithm::Unknown(value) => *value,
        }
    }
}

// ============================================================================
// Signature Algorithms
// ============================================================================

/// Signature primitive half of a TLS 1.2 SignatureAndHashAlgorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum SignatureAlgorithm {
    Anonymous,
    RSA,
    DSA,
    ECDSA,
    Unknown(u8),
}

impl SignatureAlgorithm {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => SignatureAlgorithm::Anonymous,
            1 => SignatureAlgorithm::RSA,
            2 => SignatureAlgorithm::DSA,
            3 => SignatureAlgorithm::ECDSA,
            _ => SignatureAlgorithm::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            SignatureAlgorithm::Anonymous => 0,
            SignatureAlgorithm::RSA => 1,
            SignatureAlgorithm::DSA => 2,
            SignatureAlgorithm::ECDSA => 3,
            SignatureAlgorithm::Unknown(value) => *value,
        }
    }
}

/// Hash + signature pair as it appears on the wire (hash byte first).
///
/// For ECDSA this overlaps the TLS 1.3 SignatureScheme code points, so
/// `(SHA256, ECDSA)` is `ecdsa_secp256r1_sha256` (0x0403).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureAndHashAlgorithm {
    pub hash: HashAlgorithm,
    pub signature: SignatureAlgorithm,
}

impl SignatureAndHashAlgorithm {
    pub fn new(hash: HashAlgorithm, signature: SignatureAlgorithm) -> Self {
        SignatureAndHashAlgorithm { hash, signature }
    }

    pub fn from_u16(value: u16) -> Self {
        SignatureAndHashAlgorithm {
            hash: HashAlgorithm::from_u8((value >> 8) as u8),
            signature: SignatureAlgorithm::from_u8(value as u8),
        }
    }

    pub fn as_u16(&self) -> u16 {
        ((self.hash.as_u8() as u16) << 8) | self.signature.as_u8() as u16
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], SignatureAndHashAlgorithm> {
        let (input, value) = be_u16(input)?;
        Ok((input, SignatureAndHashAlgorithm::from_u16(value)))
    }
}

// ============================================================================
// EC point formats and curve types
// ============================================================================

/// EC point encodings (RFC 8422 Section 5.1.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ECPointFormat {
    Uncompressed,
    AnsiX962CompressedPrime,
    AnsiX962CompressedChar2,
    Unknown(u8),
}

impl ECPointFormat {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => ECPointFormat::Uncompressed,
            1 => ECPointFormat::AnsiX962CompressedPrime,
            2 => ECPointFormat::AnsiX962CompressedChar2,
            _ => ECPointFormat::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            ECPointFormat::Uncompressed => 0,
            ECPointFormat::AnsiX962CompressedPrime => 1,
            ECPointFormat::AnsiX962CompressedChar2 => 2,
            ECPointFormat::Unknown(value) => *value,
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(
            self,
            ECPointFormat::AnsiX962CompressedPrime | ECPointFormat::AnsiX962CompressedChar2
        )
    }
}

/// ECParameters curve_type (RFC 8422 Section 5.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveType {
    ExplicitPrime,
    ExplicitChar2,
    NamedCurve,
    Unknown(u8),
}

impl CurveType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => CurveType::ExplicitPrime,
            2 => CurveType::ExplicitChar2,
            3 => CurveType::NamedCurve,
            _ => CurveType::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            CurveType::ExplicitPrime => 1,
            CurveType::ExplicitChar2 => 2,
            CurveType::NamedCurve => 3,
            CurveType::Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], CurveType> {
        let (input, value) = be_u8(input)?;
        Ok((input, CurveType::from_u8(value)))
    }
}

// ============================================================================
// Content Type
// ============================================================================

/// TLS record content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    ChangeCipherSpec,
    Alert,
    Handshake,
    ApplicationData,
    Unknown(u8),
}

impl ContentType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            20 => ContentType::ChangeCipherSpec,
            21 => ContentType::Alert,
            22 => ContentType::Handshake,
            23 => ContentType::ApplicationData,
            _ => ContentType::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            ContentType::ChangeCipherSpec => 20,
            ContentType::Alert => 21,
            ContentType::Handshake => 22,
            ContentType::ApplicationData => 23,
            ContentType::Unknown(value) => *value,
        }
    }
}

// ============================================================================
// Client certificate types
// ============================================================================

/// ClientCertificateType values carried in a TLS 1.2 CertificateRequest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCertificateType {
    RsaSign,
    DssSign,
    EcdsaSign,
    Unknown(u8),
}

impl ClientCertificateType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => ClientCertificateType::RsaSign,
            2 => ClientCertificateType::DssSign,
            64 => ClientCertificateType::EcdsaSign,
            _ => ClientCertificateType::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            ClientCertificateType::RsaSign => 1,
            ClientCertificateType::DssSign => 2,
            ClientCertificateType::EcdsaSign => 64,
            ClientCertificateType::Unknown(value) => *value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_values_survive() {
        assert_eq!(NamedGroup::from_u16(0xfafa).as_u16(), 0xfafa);
        assert_eq!(CipherSuite::from_u16(0x00ff).as_u16(), 0x00ff);
        assert_eq!(CurveType::from_u8(9).as_u8(), 9);
        assert_eq!(ECPointFormat::from_u8(7).as_u8(), 7);
    }

    #[test]
    fn signature_and_hash_wire_order() {
        let alg = SignatureAndHashAlgorithm::new(HashAlgorithm::SHA256, SignatureAlgorithm::ECDSA);
        assert_eq!(alg.as_u16(), 0x0403);
        assert_eq!(SignatureAndHashAlgorithm::from_u16(0x0503).hash, HashAlgorithm::SHA384);
    }

    #[test]
    fn peer_is_the_other_side() {
        assert_eq!(ConnectionEnd::Client.peer(), ConnectionEnd::Server);
        assert_eq!(ConnectionEnd::Server.peer(), ConnectionEnd::Client);
    }
}
