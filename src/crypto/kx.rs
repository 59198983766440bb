//! Ephemeral key agreement across the supported named groups.
//!
//! Montgomery groups (X25519, X448) run the raw u-coordinate ladder and never
//! reject a peer value. A u-coordinate of the wrong width is zero extended or
//! truncated to the field width, and low-order points yield an all-zero
//! secret. Both cases log a warning. Weierstrass groups decode SEC1 points in either compressed or
//! uncompressed form and return the x-coordinate padded to the field width.

use elliptic_curve::sec1::ToEncodedPoint;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::negotiate::{negotiate, NegotiationPolicy};
use crate::types::{CurveType, ECPointFormat, NamedGroup};
use crate::Error;

/// Curve shape, which decides the arithmetic branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupFamily {
    Montgomery,
    Weierstrass,
}

/// Static facts about one implemented group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedGroupDescriptor {
    pub group: NamedGroup,
    pub family: GroupFamily,
    /// Coordinate width in bytes.
    pub field_size: usize,
}

static GROUPS: &[NamedGroupDescriptor] = &[
    NamedGroupDescriptor {
        group: NamedGroup::X25519,
        family: GroupFamily::Montgomery,
        field_size: 32,
    },
    NamedGroupDescriptor {
        group: NamedGroup::Secp256r1,
        family: GroupFamily::Weierstrass,
        field_size: 32,
    },
    NamedGroupDescriptor {
        group: NamedGroup::Secp384r1,
        family: GroupFamily::Weierstrass,
        field_size: 48,
    },
    NamedGroupDescriptor {
        group: NamedGroup::X448,
        family: GroupFamily::Montgomery,
        field_size: 56,
    },
];

impl NamedGroupDescriptor {
    pub fn lookup(group: NamedGroup) -> Result<&'static NamedGroupDescriptor, Error> {
        GROUPS
            .iter()
            .find(|d| d.group == group)
            .ok_or(Error::UnsupportedGroup(group))
    }

    /// Groups with an implementation, in default preference order.
    pub fn implemented() -> impl Iterator<Item = NamedGroup> {
        GROUPS.iter().map(|d| d.group)
    }

    pub fn is_implemented(group: NamedGroup) -> bool {
        GROUPS.iter().any(|d| d.group == group)
    }

    /// Domain parameters for an ECParameters `(curve_type, named_group)` pair.
    ///
    /// Only named curves carry parameters we can use. Explicit curves and
    /// unimplemented groups fail with `KeyExchangeSetupError`.
    pub fn domain(
        curve_type: CurveType,
        group: NamedGroup,
    ) -> Result<&'static NamedGroupDescriptor, Error> {
        if curve_type != CurveType::NamedCurve {
            return Err(Error::KeyExchangeSetupError(format!(
                "no domain parameters for curve type {:?}",
                curve_type
            )));
        }
        Self::lookup(group).map_err(|_| {
            Error::KeyExchangeSetupError(format!("no domain parameters for {:?}", group))
        })
    }
}

/// Private half of an ephemeral or static key.
///
/// Holds the raw scalar. Zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    group: NamedGroup,
    scalar: Vec<u8>,
}

impl PrivateKey {
    /// Wrap an existing scalar, checking its width against the group.
    pub fn from_bytes(group: NamedGroup, scalar: &[u8]) -> Result<Self, Error> {
        let descriptor = NamedGroupDescriptor::lookup(group)?;
        if scalar.len() != descriptor.field_size {
            return Err(Error::CryptoOperationError(format!(
                "{:?} private key must be {} bytes, got {}",
                group,
                descriptor.field_size,
                scalar.len()
            )));
        }
        let key = PrivateKey {
            group,
            scalar: scalar.to_vec(),
        };
        // Weierstrass scalars must be in [1, n).
        key.public_key(ECPointFormat::Uncompressed)?;
        Ok(key)
    }

    pub fn group(&self) -> NamedGroup {
        self.group
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.scalar
    }

    /// Public point for this key, encoded per `format`.
    ///
    /// Montgomery keys have a single encoding and ignore `format`.
    pub fn public_key(&self, format: ECPointFormat) -> Result<Vec<u8>, Error> {
        let compress = format.is_compressed();
        match self.group {
            NamedGroup::X25519 => Ok(
                x25519_dalek::x25519(self.x25519_scalar()?, x25519_dalek::X25519_BASEPOINT_BYTES)
                    .to_vec(),
            ),
            NamedGroup::X448 => {
                let secret = self.x448_secret()?;
                Ok(x448::PublicKey::from(&secret).as_bytes().to_vec())
            }
            NamedGroup::Secp256r1 => {
                let secret = p256::SecretKey::from_slice(&self.scalar).map_err(invalid_scalar)?;
                Ok(secret
                    .public_key()
                    .to_encoded_point(compress)
                    .as_bytes()
                    .to_vec())
            }
            NamedGroup::Secp384r1 => {
                let secret = p384::SecretKey::from_slice(&self.scalar).map_err(invalid_scalar)?;
                Ok(secret
                    .public_key()
                    .to_encoded_point(compress)
                    .as_bytes()
                    .to_vec())
            }
            group => Err(Error::UnsupportedGroup(group)),
        }
    }

    /// The same scalar bytes read as a key for `group`.
    ///
    /// The scalar is zero extended or truncated to the field width, at the
    /// most significant end for the group's byte order. Weierstrass scalars
    /// that fall outside `[1, n)` fail on first use.
    pub fn reinterpret(&self, group: NamedGroup) -> Result<PrivateKey, Error> {
        let descriptor = NamedGroupDescriptor::lookup(group)?;
        let width = descriptor.field_size;
        let mut scalar = self.scalar.clone();
        match descriptor.family {
            GroupFamily::Montgomery => scalar.resize(width, 0),
            GroupFamily::Weierstrass => {
                if scalar.len() > width {
                    scalar.drain(..scalar.len() - width);
                }
                scalar = left_pad(scalar, width);
            }
        }
        Ok(PrivateKey { group, scalar })
    }

    fn x25519_scalar(&self) -> Result<[u8; 32], Error> {
        self.scalar
            .as_slice()
            .try_into()
            .map_err(|_| Error::CryptoOperationError("X25519 scalar must be 32 bytes".into()))
    }

    fn x448_secret(&self) -> Result<x448::Secret, Error> {
        x448::Secret::from_bytes(&self.scalar)
            .ok_or_else(|| Error::CryptoOperationError("X448 scalar must be 56 bytes".into()))
    }
}

fn invalid_scalar(_: elliptic_curve::Error) -> Error {
    Error::CryptoOperationError("scalar out of range for curve".to_string())
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.scalar.zeroize();
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

/// Generate an ephemeral key pair. The public key is uncompressed.
///
/// `rng` is the only source of randomness. A seeded generator gives
/// reproducible key pairs.
pub fn generate_ephemeral<R: RngCore + CryptoRng>(
    group: NamedGroup,
    rng: &mut R,
) -> Result<(PrivateKey, Vec<u8>), Error> {
    let descriptor = NamedGroupDescriptor::lookup(group)?;

    let scalar = match group {
        NamedGroup::Secp256r1 => p256::SecretKey::random(rng).to_bytes().to_vec(),
        NamedGroup::Secp384r1 => p384::SecretKey::random(rng).to_bytes().to_vec(),
        _ => {
            let mut scalar = vec![0u8; descriptor.field_size];
            rng.fill_bytes(&mut scalar);
            scalar
        }
    };

    let private = PrivateKey { group, scalar };
    let public = private.public_key(ECPointFormat::Uncompressed)?;
    debug!("Generated {:?} ephemeral key ({} byte public)", group, public.len());
    Ok((private, public))
}

/// Shared secret between `private` and a peer public value.
pub fn compute_shared_secret(
    private: &PrivateKey,
    peer_public: &[u8],
    group: NamedGroup,
) -> Result<Vec<u8>, Error> {
    let descriptor = NamedGroupDescriptor::lookup(group)?;
    let reinterpreted;
    let private = if private.group == group {
        private
    } else {
        warn!("Using a {:?} private key as {:?}", private.group, group);
        reinterpreted = private.reinterpret(group)?;
        &reinterpreted
    };

    let secret = match group {
        NamedGroup::X25519 => {
            let mut u = [0u8; 32];
            u.copy_from_slice(&fit_u_coordinate(group, peer_public, descriptor.field_size));
            let shared = x25519_dalek::x25519(private.x25519_scalar()?, u);
            if shared.iter().all(|b| *b == 0) {
                warn!("X25519 peer point is of low order, shared secret is zero");
            }
            shared.to_vec()
        }
        NamedGroup::X448 => {
            let u = fit_u_coordinate(group, peer_public, descriptor.field_size);
            let secret = private.x448_secret()?;
            let shared = x448::PublicKey::from_bytes(&u)
                .and_then(|peer| secret.as_diffie_hellman(&peer))
                .map(|s| s.as_bytes().to_vec());
            match shared {
                Some(s) => s,
                None => {
                    warn!("X448 peer point is of low order, shared secret is zero");
                    vec![0u8; descriptor.field_size]
                }
            }
        }
        NamedGroup::Secp256r1 => {
            let secret = p256::SecretKey::from_slice(&private.scalar).map_err(invalid_scalar)?;
            let peer = p256::PublicKey::from_sec1_bytes(peer_public).map_err(|_| {
                Error::CryptoOperationError("peer point is not on P-256".to_string())
            })?;
            p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine())
                .raw_secret_bytes()
                .to_vec()
        }
        NamedGroup::Secp384r1 => {
            let secret = p384::SecretKey::from_slice(&private.scalar).map_err(invalid_scalar)?;
            let peer = p384::PublicKey::from_sec1_bytes(peer_public).map_err(|_| {
                Error::CryptoOperationError("peer point is not on P-384".to_string())
            })?;
            p384::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine())
                .raw_secret_bytes()
                .to_vec()
        }
        group => return Err(Error::UnsupportedGroup(group)),
    };

    Ok(left_pad(secret, descriptor.field_size))
}

/// Little-endian u-coordinate resized to `width`.
fn fit_u_coordinate(group: NamedGroup, peer_public: &[u8], width: usize) -> Vec<u8> {
    if peer_public.len() != width {
        warn!(
            "{:?} peer key is {} bytes, using it as {}",
            group,
            peer_public.len(),
            width
        );
    }
    let mut u = peer_public.to_vec();
    u.resize(width, 0);
    u
}

fn left_pad(mut value: Vec<u8>, width: usize) -> Vec<u8> {
    if value.len() < width {
        let mut padded = vec![0u8; width - value.len()];
        padded.append(&mut value);
        return padded;
    }
    value
}

/// First local group the peer also lists.
///
/// Point formats and cipher suites go through the same
/// [`negotiate`](crate::negotiate::negotiate) routine.
pub fn negotiate_group(
    local: &[NamedGroup],
    peer: &[NamedGroup],
    policy: NegotiationPolicy,
) -> Result<NamedGroup, Error> {
    negotiate("named group", local, peer, policy)
}
