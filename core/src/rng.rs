//! Deterministic random number generation.
//!
//! RULE: Nothing in the engine may call any platform RNG or platform hash.
//! All randomness flows through PositionRng instances derived from the
//! single base seed stored on the session config.
//!
//! Unlike a single shared stream, every generated entry gets its own RNG,
//! seeded from (base_seed, source discriminant, position). This means:
//!   - The same position yields the same entry regardless of access order,
//!     pagination cursor, or how many queries came before.
//!   - Two sources with the same seed but different discriminants (one per
//!     chat channel, one per log service) never collide.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

/// splitmix64 finalizer. Decorrelates structured seed inputs
/// (consecutive positions, similar discriminants) before they
/// reach the PCG stream.
fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Stable discriminant for one data source, derived from its kind and name
/// with FNV-1a. `DefaultHasher` is deliberately not used here — its output
/// is not guaranteed stable across Rust releases.
pub fn source_discriminant(kind: &str, name: &str) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in kind.bytes().chain([b':']).chain(name.bytes()) {
        h ^= u64::from(byte);
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    h
}

/// A deterministic RNG private to one generated entry (or one stateful
/// consumer such as the incident clock).
pub struct PositionRng {
    inner: Pcg64Mcg,
}

impl PositionRng {
    /// RNG for a single corpus position. Pure function of its inputs.
    pub fn at(base_seed: u64, discriminant: u64, position: u64) -> Self {
        let seed = mix64(
            base_seed
                ^ mix64(discriminant)
                ^ position.wrapping_mul(GOLDEN_GAMMA),
        );
        Self {
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    /// RNG for a session-lifetime stateful stream (clock pacing, fallback
    /// hypothesis shuffling). Call order matters for these, which is fine:
    /// each consumer owns its own stream.
    pub fn stream(base_seed: u64, discriminant: u64) -> Self {
        Self::at(base_seed, discriminant, 0)
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        use rand::RngCore;
        self.inner.next_u64()
    }

    /// Roll a u64 in [0, n).
    pub fn below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Roll an i64 in [lo, hi] inclusive.
    pub fn range_i64(&mut self, lo: i64, hi: i64) -> i64 {
        assert!(lo <= hi, "lo must be <= hi");
        let span = (hi - lo + 1) as u64;
        lo + self.below(span) as i64
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick one element of a non-empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        assert!(!items.is_empty(), "pick from empty slice");
        &items[self.below(items.len() as u64) as usize]
    }

    /// Sample from an approximate normal via Irwin-Hall (sum of 12 uniforms).
    /// Good enough for jitter; avoids pulling in rand_distr.
    pub fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let sum: f64 = (0..12).map(|_| self.next_f64()).sum();
        mean + (sum - 6.0) * std_dev
    }

    /// Sample from a simplified Pareto distribution.
    /// x_min: minimum value, alpha: shape parameter (higher = less skewed).
    pub fn pareto(&mut self, x_min: f64, alpha: f64) -> f64 {
        let u = self.next_f64().max(1e-10);
        x_min * u.powf(-1.0 / alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_same_stream() {
        let mut a = PositionRng::at(42, 7, 1000);
        let mut b = PositionRng::at(42, 7, 1000);
        for _ in 0..64 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn discriminants_separate_sources() {
        let chat = source_discriminant("chat", "incidents");
        let logs = source_discriminant("logs", "incidents");
        assert_ne!(chat, logs);

        let mut a = PositionRng::at(42, chat, 0);
        let mut b = PositionRng::at(42, logs, 0);
        let diverged = (0..16).any(|_| a.next_u64() != b.next_u64());
        assert!(diverged, "different discriminants produced identical streams");
    }

    #[test]
    fn adjacent_positions_decorrelated() {
        let d = source_discriminant("logs", "checkout");
        let mut a = PositionRng::at(42, d, 500);
        let mut b = PositionRng::at(42, d, 501);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn gauss_is_centered() {
        let mut rng = PositionRng::at(1, 2, 3);
        let mean: f64 = (0..2000).map(|_| rng.gauss(10.0, 2.0)).sum::<f64>() / 2000.0;
        assert!((mean - 10.0).abs() < 0.5, "gauss mean drifted: {mean}");
    }
}
