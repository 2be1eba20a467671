//! Deterministic seed derivation.
//!
//! Every backtest owns its own `StdRng`. When several runs are spawned from one
//! configuration (a parameter sweep), each run's seed is derived from the master
//! seed and a scenario label with BLAKE3, so the seed a scenario gets does not
//! depend on which thread picks it up or in what order.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedHierarchy {
    master_seed: u64,
}

impl SeedHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Sub-seed for `(scenario, iteration)`.
    pub fn sub_seed(&self, scenario: &str, iteration: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(scenario.as_bytes());
        hasher.update(&iteration.to_le_bytes());
        let hash = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(head)
    }

    pub fn rng_for(&self, scenario: &str, iteration: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(scenario, iteration))
    }
}
