//! A simple pseudorandom number generator.
//!
//! Specifically, an implementation of Steele, Lea, and Flood's SplitMix64 mixer implemented to satisfy the [rand_core] traits.
//!
//! SplitMix64 was chosen as the source of (pseudo)random numbers for worker threads and the sampler as it is tiny, fast, and statistically adequate for sampling weights.
//! Each worker thread owns its own generator, so no synchronization is required for a draw.
//!
//! Anything satisfying [RngCore] may be substituted wherever a generator is consumed, as the consuming surfaces take `&mut dyn RngCore`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand_core::{impls, RngCore, SeedableRng};

/// The generator state, advanced by a Weyl increment on each draw.
pub struct SplitMix64 {
    state: u64,
}

impl RngCore for SplitMix64 {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E3779B97F4A7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }
}

impl SeedableRng for SplitMix64 {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self {
            state: u64::from_le_bytes(seed),
        }
    }
}

impl SplitMix64 {
    /// A generator seeded from the clock and a process-wide draw counter, so concurrently created generators differ.
    pub fn from_clock() -> Self {
        static SEQUENCE: AtomicU64 = AtomicU64::new(0);

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or(0);
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);

        Self {
            state: nanos ^ sequence.rotate_left(32),
        }
    }
}

#[cfg(test)]
mod split_mix_tests {
    use super::*;

    #[test]
    fn zero_seed() {
        let mut zero_seed = SplitMix64::from_seed(0u64.to_le_bytes());

        assert_eq!(zero_seed.next_u64(), 0xE220A8397B1DCDAF);
        assert_eq!(zero_seed.next_u64(), 0x6E789E6AA1B965F4);
        assert_eq!(zero_seed.next_u64(), 0x06C45D188009454F);
        assert_eq!(zero_seed.next_u64(), 0xF88BB8A8724C81EC);
        assert_eq!(zero_seed.next_u64(), 0x1B39896A51A8749B);
    }

    #[test]
    fn high_word() {
        let mut zero_seed = SplitMix64::from_seed(0u64.to_le_bytes());
        assert_eq!(zero_seed.next_u32(), 0xE220A839);
    }

    #[test]
    fn seeds_differ() {
        let mut two_seed = SplitMix64::from_seed(2u64.to_le_bytes());
        let mut three_seed = SplitMix64::from_seed(3u64.to_le_bytes());
        assert_ne!(two_seed.next_u64(), three_seed.next_u64());
    }
}
