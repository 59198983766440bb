//! Seedable random number generator for reproducible key material.
//!
//! When a seed is provided via [`Config::rng_seed`](crate::Config::rng_seed),
//! every ephemeral key, nonce and context generated for a connection is
//! deterministic. That makes captured vectors replayable.

use rand::rngs::StdRng;
use rand::{CryptoRng, RngCore, SeedableRng};

/// A random number generator that can be seeded for deterministic behavior.
///
/// When created with a seed, it produces deterministic random values.
/// When created without a seed, it uses the thread-local random generator.
pub struct SeededRng {
    inner: Option<StdRng>,
}

impl SeededRng {
    /// Create a new RNG with an optional seed.
    pub fn new(seed: Option<u64>) -> Self {
        let inner = seed.map(StdRng::seed_from_u64);
        Self { inner }
    }

    /// Fill a fixed size array with random bytes.
    pub fn array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        self.fill_bytes(&mut out);
        out
    }

    pub fn is_seeded(&self) -> bool {
        self.inner.is_some()
    }
}

impl RngCore for SeededRng {
    fn next_u32(&mut self) -> u32 {
        match self.inner.as_mut() {
            Some(rng) => rng.next_u32(),
            None => rand::thread_rng().next_u32(),
        }
    }

    fn next_u64(&mut self) -> u64 {
        match self.inner.as_mut() {
            Some(rng) => rng.next_u64(),
            None => rand::thread_rng().next_u64(),
        }
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        match self.inner.as_mut() {
            Some(rng) => rng.fill_bytes(dest),
            None => rand::thread_rng().fill_bytes(dest),
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

// Both StdRng and ThreadRng are cryptographically secure.
impl CryptoRng for SeededRng {}

impl std::fmt::Debug for SeededRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeededRng")
            .field("seeded", &self.is_seeded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_rng_is_deterministic() {
        let mut rng1 = SeededRng::new(Some(12345));
        let mut rng2 = SeededRng::new(Some(12345));

        let values1: [u8; 32] = rng1.array();
        let values2: [u8; 32] = rng2.array();

        assert_eq!(values1, values2, "Same seed should produce same values");
        assert_eq!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn different_seeds_produce_different_values() {
        let mut rng1 = SeededRng::new(Some(12345));
        let mut rng2 = SeededRng::new(Some(54321));

        assert_ne!(
            rng1.next_u64(),
            rng2.next_u64(),
            "Different seeds should produce different values"
        );
    }

    #[test]
    fn unseeded_rng_still_produces_bytes() {
        let mut rng = SeededRng::new(None);
        assert!(!rng.is_seeded());
        let a: [u8; 16] = rng.array();
        let b: [u8; 16] = rng.array();
        assert_ne!(a, b);
    }
}
