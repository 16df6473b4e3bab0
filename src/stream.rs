//! Seed-stream generators.
//!
//! Each generator turns a 32-bit seed into an endless, deterministic sequence
//! of 32-bit values. They approximate generators that were common in password
//! tools around 2008-2009:
//!
//! - [`Lcg`]: the Numerical Recipes linear congruential generator.
//! - [`HashChain`]: SHA-1 over the decimal representation of the state.
//! - [`SeededUniform`]: MT19937 keyed from the seed.
//!
//! Instances are cheap, owned by exactly one task and never shared.

use crate::error::TaskError;
use rand_mt::Mt;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;

/// Which generator a task instantiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AlgorithmTag {
    #[value(alias = "linear-congruential")]
    #[serde(alias = "linear-congruential")]
    Lcg,
    #[value(alias = "sha1")]
    #[serde(alias = "sha1")]
    HashChain,
    #[value(alias = "mt19937")]
    #[serde(alias = "mt19937")]
    SeededUniform,
}

impl AlgorithmTag {
    pub const ALL: [AlgorithmTag; 3] = [
        AlgorithmTag::Lcg,
        AlgorithmTag::HashChain,
        AlgorithmTag::SeededUniform,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AlgorithmTag::Lcg => "lcg",
            AlgorithmTag::HashChain => "hash-chain",
            AlgorithmTag::SeededUniform => "seeded-uniform",
        }
    }
}

impl fmt::Display for AlgorithmTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Convert a (timezone adjusted) Unix timestamp into a generator seed.
pub fn seed_from_timestamp(timestamp: i64) -> Result<u32, TaskError> {
    u32::try_from(timestamp).map_err(|_| TaskError::SeedOutOfRange(timestamp))
}

/// `state = (a * state + c) mod 2^32`. The seed itself is never yielded.
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    pub const MULTIPLIER: u32 = 1_664_525;
    pub const INCREMENT: u32 = 1_013_904_223;

    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT);
        self.state
    }
}

impl Iterator for Lcg {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        Some(self.next_u32())
    }
}

/// `state = first 8 hex digits of sha1(decimal(state))`.
#[derive(Debug, Clone)]
pub struct HashChain {
    state: u32,
}

impl HashChain {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        let digest = Sha1::digest(self.state.to_string().as_bytes());
        // The first 8 hex digits are the first 4 bytes, big-endian.
        self.state = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        self.state
    }
}

impl Iterator for HashChain {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        Some(self.next_u32())
    }
}

/// MT19937 keyed with `init_by_array([seed])`, the way CPython's
/// `random.seed(int)` keys its generator for 32-bit seeds.
pub struct SeededUniform {
    mt: Box<Mt>,
}

impl SeededUniform {
    pub fn new(seed: u32) -> Self {
        Self {
            mt: Box::new(Mt::new_with_key(std::iter::once(seed))),
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.mt.next_u32()
    }
}

impl Iterator for SeededUniform {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        Some(self.next_u32())
    }
}

/// A generator selected at runtime by [`AlgorithmTag`].
pub enum SeedStream {
    Lcg(Lcg),
    HashChain(HashChain),
    SeededUniform(SeededUniform),
}

impl SeedStream {
    pub fn new(algorithm: AlgorithmTag, seed: u32) -> Self {
        match algorithm {
            AlgorithmTag::Lcg => SeedStream::Lcg(Lcg::new(seed)),
            AlgorithmTag::HashChain => SeedStream::HashChain(HashChain::new(seed)),
            AlgorithmTag::SeededUniform => SeedStream::SeededUniform(SeededUniform::new(seed)),
        }
    }

    pub fn algorithm(&self) -> AlgorithmTag {
        match self {
            SeedStream::Lcg(_) => AlgorithmTag::Lcg,
            SeedStream::HashChain(_) => AlgorithmTag::HashChain,
            SeedStream::SeededUniform(_) => AlgorithmTag::SeededUniform,
        }
    }

    /// Next value of the stream. Streams never end.
    pub fn next_u32(&mut self) -> u32 {
        match self {
            SeedStream::Lcg(g) => g.next_u32(),
            SeedStream::HashChain(g) => g.next_u32(),
            SeedStream::SeededUniform(g) => g.next_u32(),
        }
    }
}

impl Iterator for SeedStream {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        Some(self.next_u32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn take(algorithm: AlgorithmTag, seed: u32, n: usize) -> Vec<u32> {
        SeedStream::new(algorithm, seed).take(n).collect()
    }

    #[test]
    fn test_lcg_known_values() {
        assert_eq!(
            Lcg::new(0).take(3).collect::<Vec<_>>(),
            vec![1_013_904_223, 1_196_435_762, 3_519_870_697]
        );
        assert_eq!(
            Lcg::new(1_230_768_000).take(3).collect::<Vec<_>>(),
            vec![1_553_487_071, 3_955_432_626, 3_223_868_521]
        );
    }

    #[test]
    fn test_hash_chain_known_values() {
        assert_eq!(
            HashChain::new(0).take(3).collect::<Vec<_>>(),
            vec![3_059_261_382, 2_160_043_658, 3_918_992_728]
        );
        assert_eq!(
            HashChain::new(1_230_768_000).take(3).collect::<Vec<_>>(),
            vec![2_080_373_032, 2_099_357_266, 200_435_449]
        );
    }

    #[test]
    fn test_seeded_uniform_matches_reference_keying() {
        // random.seed(42); [random.getrandbits(32) for _ in range(3)]
        assert_eq!(
            SeededUniform::new(42).take(3).collect::<Vec<_>>(),
            vec![2_746_317_213, 478_163_327, 107_420_369]
        );
    }

    #[test]
    fn test_streams_are_deterministic() {
        for algorithm in AlgorithmTag::ALL {
            for seed in [0, 1, 1_231_006_505, u32::MAX] {
                assert_eq!(
                    take(algorithm, seed, 64),
                    take(algorithm, seed, 64),
                    "{} seed {}",
                    algorithm,
                    seed
                );
            }
        }
    }

    #[test]
    fn test_streams_differ_between_seeds() {
        for algorithm in AlgorithmTag::ALL {
            assert_ne!(take(algorithm, 1_231_006_505, 8), take(algorithm, 1_231_006_506, 8));
        }
    }

    #[test]
    fn test_seed_stream_reports_algorithm() {
        for algorithm in AlgorithmTag::ALL {
            assert_eq!(SeedStream::new(algorithm, 7).algorithm(), algorithm);
        }
    }

    #[test]
    fn test_seed_from_timestamp() {
        assert_eq!(seed_from_timestamp(0), Ok(0));
        assert_eq!(seed_from_timestamp(1_230_768_000), Ok(1_230_768_000));
        assert_eq!(seed_from_timestamp(u32::MAX as i64), Ok(u32::MAX));
        assert_eq!(seed_from_timestamp(-1), Err(TaskError::SeedOutOfRange(-1)));
        assert_eq!(
            seed_from_timestamp(u32::MAX as i64 + 1),
            Err(TaskError::SeedOutOfRange(u32::MAX as i64 + 1))
        );
    }
}
