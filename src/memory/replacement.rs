//! Victim selection for set-associative stores

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

/// Picks the slot to overwrite when a line is installed into a full set.
/// Only consulted when a set has more than one way.
pub trait VictimSelector {
    /// Return a way index in `[0, ways)`
    fn select_victim(&mut self, ways: usize) -> usize;
}

/// Uniform random replacement
pub struct RandomSelector {
    rng: StdRng,
}

impl RandomSelector {
    /// Reproducible selector for tests and repeatable sweeps
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn make(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl VictimSelector for RandomSelector {
    fn select_victim(&mut self, ways: usize) -> usize {
        self.rng.gen_range(0..ways)
    }
}
