//! Seeded randomness for synthetic outcome counts.

use std::hash::Hasher;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use siphasher::sip::SipHasher13;

/// Reproducible RNG for generated bitstrings.
///
/// Cell `i` of a generated experiment draws from substream `i` of the master
/// seed, so cells can be produced in any order or in parallel.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
}

impl RngHandle {
    /// Handle seeded directly with `seed`.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Handle for substream `substream` of `master_seed`.
    pub fn substream(master_seed: u64, substream: u64) -> Self {
        Self::from_seed(derive_substream_seed(master_seed, substream))
    }

    /// Uniform integer below `2^bits`; `bits` above 64 behaves as 64.
    pub fn next_bits(&mut self, bits: u32) -> u64 {
        match bits {
            0 => 0,
            64.. => self.rng.next_u64(),
            _ => self.rng.next_u64() >> (64 - bits),
        }
    }

    /// Raw 64-bit draw.
    pub fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    /// Shuffles `values` in place.
    pub fn shuffle<T>(&mut self, values: &mut [T]) {
        values.shuffle(&mut self.rng);
    }
}

/// Seed of substream `substream`: SipHash-1-3 (zero keys) of `(master_seed, substream)`.
pub fn derive_substream_seed(master_seed: u64, substream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(substream);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuffle_is_a_permutation() {
        let mut values: Vec<u32> = (0..32).collect();
        RngHandle::from_seed(3).shuffle(&mut values);
        let mut sorted = values.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..32).collect::<Vec<_>>());
    }

    #[test]
    fn zero_bits_draw_nothing() {
        let mut rng = RngHandle::from_seed(0);
        assert_eq!(rng.next_bits(0), 0);
        assert!(rng.next_bits(1) < 2);
    }
}
