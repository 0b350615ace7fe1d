//! Deterministic seed derivation for independent random streams.
//!
//! Every trial, and every estimator inside a trial, owns its own `StdRng`. Their seeds
//! are derived from one base seed so a whole experiment is reproducible from a single
//! number while the streams stay statistically independent.
//!
//! Not cryptographic.

/// Deterministic (non-crypto) stable hash of a label under a seed.
///
/// Implementation:
/// - FNV-1a over bytes (cheap, stable across platforms)
/// - SplitMix64 finalizer (improves bit diffusion / uniformity)
#[must_use]
pub fn stable_hash64(seed: u64, s: &str) -> u64 {
    let mut h: u64 = 14695981039346656037u64;
    for b in s.as_bytes() {
        h ^= *b as u64;
        h = h.wrapping_mul(1099511628211u64);
    }
    splitmix64(seed ^ h)
}

/// Seed for the `index`-th member of a named stream (e.g. `("trial", 17)`).
///
/// Distinct `(stream, index)` pairs give unrelated seeds for the same `base`.
#[must_use]
pub fn derive_seed(base: u64, stream: &str, index: u64) -> u64 {
    splitmix64(stable_hash64(base, stream) ^ splitmix64(index))
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn derive_seed_is_stable() {
        assert_eq!(derive_seed(7, "trial", 3), derive_seed(7, "trial", 3));
    }

    #[test]
    fn derive_seed_separates_streams_and_indices() {
        let mut seen = BTreeSet::new();
        for stream in ["trial", "env", "estimator"] {
            for i in 0..200 {
                assert!(seen.insert(derive_seed(42, stream, i)), "{stream}/{i} collided");
            }
        }
    }

    #[test]
    fn base_seed_changes_everything() {
        assert_ne!(derive_seed(1, "trial", 0), derive_seed(2, "trial", 0));
    }
}
