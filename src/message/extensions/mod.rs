mod client_esni_inner;
mod ec_point_formats;
mod esni;
mod extended_master_secret;
mod key_share;
mod padding;
mod signature_algorithms;
mod signed_certificate_timestamp;
mod supported_groups;

pub use client_esni_inner::{ClientEsniInner, ServerName, HOST_NAME, NONCE_LEN};
pub use ec_point_formats::EcPointFormatsExtension;
pub use esni::{ClientEncryptedSni, EncryptedServerNameIndication, EsniPayload};
pub use extended_master_secret::ExtendedMasterSecretExtension;
pub use key_share::{serialize_client_shares, KeyShareComputations, KeyShareEntry};
pub use key_share::KeyShareExtension;
pub use padding::PaddingExtension;
pub use signature_algorithms::SignatureAlgorithmsExtension;
pub use signed_certificate_timestamp::SignedCertificateTimestampExtension;
pub use supported_groups::SupportedGroupsExtension;
