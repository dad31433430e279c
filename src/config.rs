//! Hierarchy and sweep configuration

use crate::error::SimulatorError;
use crate::error::SimulatorResult;
use crate::memory::cache::CachePolicy;
use crate::memory::LevelTiming;
use crate::memory::WriteMissPolicy;

pub const LINE_SIZE: u64 = 64;

const KIB: u64 = 1024;
const GIB: u64 = 1024 * 1024 * 1024;

/// One cache level
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelConfig {
    pub capacity: u64,
    pub associativity: usize,
    pub timing: LevelTiming,
}

impl LevelConfig {
    pub fn policy(&self, line_size: u64) -> CachePolicy {
        CachePolicy::make(self.capacity, line_size, self.associativity)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DramConfig {
    pub capacity: u64,
    pub timing: LevelTiming,
}

/// Everything a sweep needs
#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    pub l1i: LevelConfig,
    pub l1d: LevelConfig,
    pub l2: LevelConfig,
    pub dram: DramConfig,
    pub line_size: u64,

    /// Energy for moving a line between L1 and L2 (pJ)
    pub l2_transfer_penalty_pj: f64,
    /// Energy for moving a line between L2 and DRAM (pJ)
    pub dram_transfer_penalty_pj: f64,

    /// L2 associativities to sweep
    pub associativities: Vec<usize>,
    /// Consecutive passes over a trace against the same warmed hierarchy
    pub passes: usize,
    /// Seed for eviction draws; `None` draws from entropy
    pub seed: Option<u64>,
    pub write_miss_policy: WriteMissPolicy,
}

impl Default for SimConfig {
    /// 32KB direct-mapped split L1, 256KB shared L2, 8GB DDR5
    fn default() -> Self {
        let l1 = LevelConfig {
            capacity: 32 * KIB,
            associativity: 1,
            timing: LevelTiming::make(0.5, 0.5, 1.0),
        };
        Self {
            l1i: l1,
            l1d: l1,
            l2: LevelConfig {
                capacity: 256 * KIB,
                associativity: 4,
                timing: LevelTiming::make(5.0, 0.8, 2.0),
            },
            dram: DramConfig {
                capacity: 8 * GIB,
                timing: LevelTiming::make(50.0, 0.8, 4.0),
            },
            line_size: LINE_SIZE,
            l2_transfer_penalty_pj: 5.0,
            dram_transfer_penalty_pj: 640.0,
            associativities: vec![2, 4, 8],
            passes: 1,
            seed: None,
            write_miss_policy: WriteMissPolicy::default(),
        }
    }
}

impl SimConfig {
    /// A copy of this configuration whose L2 has `associativity` ways
    pub fn for_associativity(&self, associativity: usize) -> Self {
        let mut config = self.clone();
        config.l2.associativity = associativity;
        config
    }

    pub fn validate(&self) -> SimulatorResult<()> {
        if self.line_size != LINE_SIZE {
            return Err(SimulatorError::ConfigError(format!(
                "line size must be {} bytes, got {}",
                LINE_SIZE, self.line_size
            )));
        }
        if self.passes == 0 {
            return Err(SimulatorError::ConfigError(
                "at least one pass is required".to_string(),
            ));
        }
        if self.associativities.is_empty() {
            return Err(SimulatorError::ConfigError(
                "no L2 associativity to sweep".to_string(),
            ));
        }
        self.l1i.policy(self.line_size).validate()?;
        self.l1d.policy(self.line_size).validate()?;
        for &associativity in &self.associativities {
            self.for_associativity(associativity)
                .l2
                .policy(self.line_size)
                .validate()?;
        }
        Ok(())
    }
}
