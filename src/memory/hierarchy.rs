//! Two-level hierarchy: split direct-mapped L1, shared L2, DRAM.
//!
//! Reads (data reads and instruction fetches) block until the line reaches L1,
//! so their latency is additive down to the level that holds the line:
//!
//! | outcome          | latency | L1 energy          | L2 energy                    | DRAM energy |
//! |------------------|---------|--------------------|------------------------------|-------------|
//! | L1 hit           | t1      | a1·t1 + i1·t1      | i2·t1                        | i3·t1       |
//! | L1 miss, L2 hit  | t2      | a1·t1 + i1·(t2−t1) | a2·(t2−t1) + i2·t1 + p2      | i3·t2       |
//! | L1 miss, L2 miss | t3      | a1·t1 + i1·(t3−t1) | a2·(t2−t1) + i2·(t3−t2) + p2 | see below   |
//!
//! DRAM on an L2 miss: a3·(t3−t2) + i3·t2 + p3.
//!
//! Writes are acknowledged once they land in L2, so they always cost t2.
//! L1 is write-through and never holds dirty lines; L2 lines become dirty
//! whenever a write reaches them. A write that misses L2 fetches the line
//! from DRAM in the background: DRAM is billed as a full access but the
//! processor does not wait for it.

use super::cache::Cache;
use super::cache::CacheHistory;
use super::dram::Dram;
use super::replacement::RandomSelector;
use super::replacement::VictimSelector;
use super::WriteMissPolicy;
use crate::config::SimConfig;
use crate::error::SimulatorResult;
use crate::trace::Operation;
use crate::trace::TraceRecord;

/// Where a request was satisfied
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessOutcome {
    L1Hit,
    L2Hit,
    L2Miss,
}

/// Result of one request
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Access {
    pub outcome: AccessOutcome,
    /// Latency seen by the processor
    pub latency_ns: f64,
}

/// Cumulative energy per component, in pJ
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct EnergyHistory {
    pub l1: f64,
    pub l2: f64,
    pub dram: f64,
}

impl EnergyHistory {
    pub fn total(&self) -> f64 {
        self.l1 + self.l2 + self.dram
    }
}

/// Snapshot of every running counter of a hierarchy
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct SimulationHistory {
    pub l1i: CacheHistory,
    pub l1d: CacheHistory,
    pub l2: CacheHistory,
    pub total_access_time_ns: f64,
    pub energy: EnergyHistory,
    pub num_write_back: u64,
}

impl SimulationHistory {
    /// Combined instruction and data L1 counters
    pub fn l1(&self) -> CacheHistory {
        self.l1i.merged(&self.l1d)
    }

    /// Requests issued by the processor
    pub fn accesses(&self) -> u64 {
        self.l1().accesses()
    }
}

pub struct Hierarchy<S: VictimSelector = RandomSelector> {
    pub l1i: Cache,
    pub l1d: Cache,
    pub l2: Cache,
    pub dram: Dram,

    l2_transfer_penalty_pj: f64,
    dram_transfer_penalty_pj: f64,
    write_miss_policy: WriteMissPolicy,

    selector: S,

    pub energy: EnergyHistory,
    pub total_access_time_ns: f64,
}

impl Hierarchy<RandomSelector> {
    /// Build a cold hierarchy with random replacement seeded from `config`
    pub fn make(config: &SimConfig) -> SimulatorResult<Self> {
        Self::with_selector(config, RandomSelector::make(config.seed))
    }
}

impl<S: VictimSelector> Hierarchy<S> {
    pub fn with_selector(config: &SimConfig, selector: S) -> SimulatorResult<Self> {
        let line_size = config.line_size;
        Ok(Self {
            l1i: Cache::make("L1I", config.l1i.policy(line_size), config.l1i.timing)?,
            l1d: Cache::make("L1D", config.l1d.policy(line_size), config.l1d.timing)?,
            l2: Cache::make("L2", config.l2.policy(line_size), config.l2.timing)?,
            dram: Dram::make(config.dram.capacity, config.dram.timing),
            l2_transfer_penalty_pj: config.l2_transfer_penalty_pj,
            dram_transfer_penalty_pj: config.dram_transfer_penalty_pj,
            write_miss_policy: config.write_miss_policy,
            selector,
            energy: EnergyHistory::default(),
            total_access_time_ns: 0.0,
        })
    }

    pub fn history(&self) -> SimulationHistory {
        SimulationHistory {
            l1i: self.l1i.history,
            l1d: self.l1d.history,
            l2: self.l2.history,
            total_access_time_ns: self.total_access_time_ns,
            energy: self.energy,
            num_write_back: self.dram.num_write_back,
        }
    }

    /// Resolve one trace record against the hierarchy
    pub fn access(&mut self, record: &TraceRecord) -> Access {
        let access = match record.operation {
            Operation::DataRead => self.read(false, record.address),
            Operation::InstructionFetch => self.read(true, record.address),
            Operation::DataWrite => self.write(record.address),
        };
        self.total_access_time_ns += access.latency_ns;
        access
    }

    fn l1(&mut self, instruction: bool) -> &mut Cache {
        if instruction {
            &mut self.l1i
        } else {
            &mut self.l1d
        }
    }

    fn read(&mut self, instruction: bool, address: u64) -> Access {
        let t2 = self.l2.timing.access_time_ns;
        let t3 = self.dram.timing.access_time_ns;
        let l2 = self.l2.timing;
        let dram = self.dram.timing;

        let l1 = self.l1(instruction);
        let l1_timing = l1.timing;
        let t1 = l1_timing.access_time_ns;

        if l1.probe(address) {
            l1.record_hit();
            self.energy.l1 += l1_timing.active_energy(t1) + l1_timing.idle_energy(t1);
            self.energy.l2 += l2.idle_energy(t1);
            self.energy.dram += dram.idle_energy(t1);
            return Access {
                outcome: AccessOutcome::L1Hit,
                latency_ns: t1,
            };
        }
        l1.record_miss();

        let access = if self.l2.probe(address) {
            self.l2.record_hit();
            self.energy.l1 += l1_timing.active_energy(t1) + l1_timing.idle_energy(t2 - t1);
            self.energy.l2 += l2.active_energy(t2 - t1)
                + l2.idle_energy(t1)
                + self.l2_transfer_penalty_pj;
            self.energy.dram += dram.idle_energy(t2);
            Access {
                outcome: AccessOutcome::L2Hit,
                latency_ns: t2,
            }
        } else {
            self.l2.record_miss();
            debug_assert!(self.dram.probe(address));
            self.energy.l1 += l1_timing.active_energy(t1) + l1_timing.idle_energy(t3 - t1);
            self.energy.l2 += l2.active_energy(t2 - t1)
                + l2.idle_energy(t3 - t2)
                + self.l2_transfer_penalty_pj;
            self.energy.dram += dram.active_energy(t3 - t2)
                + dram.idle_energy(t2)
                + self.dram_transfer_penalty_pj;
            // The line copy is covered by the transfer penalty
            self.fill_l2(address, false);
            Access {
                outcome: AccessOutcome::L2Miss,
                latency_ns: t3,
            }
        };

        self.fill_l1(instruction, address);
        access
    }

    fn write(&mut self, address: u64) -> Access {
        let t2 = self.l2.timing.access_time_ns;
        let l1_timing = self.l1d.timing;
        let t1 = l1_timing.access_time_ns;

        let l1_hit = self.l1d.probe(address);
        if l1_hit {
            self.l1d.record_hit();
            self.energy.l1 += l1_timing.active_energy(t1) + l1_timing.idle_energy(t2 - t1);
        } else {
            self.l1d.record_miss();
            self.energy.l1 += l1_timing.idle_energy(t2);
        }

        let l2_hit = self.write_through(address);

        if !l1_hit && self.write_miss_policy == WriteMissPolicy::WriteAllocate {
            self.fill_l1(false, address);
        }

        let outcome = match (l1_hit, l2_hit) {
            (true, _) => AccessOutcome::L1Hit,
            (false, true) => AccessOutcome::L2Hit,
            (false, false) => AccessOutcome::L2Miss,
        };
        Access {
            outcome,
            latency_ns: t2,
        }
    }

    /// Land a write in L2, marking the line dirty.
    /// Returns whether the line was already resident.
    fn write_through(&mut self, address: u64) -> bool {
        let l2 = self.l2.timing;
        let dram = self.dram.timing;
        let t1 = self.l1d.timing.access_time_ns;
        let t2 = l2.access_time_ns;
        let t3 = dram.access_time_ns;

        self.energy.l2 += l2.active_energy(t2 - t1) + l2.idle_energy(t1);

        if self.l2.store.mark_dirty(address) {
            self.l2.record_hit();
            self.energy.dram += dram.idle_energy(t2);
            return true;
        }

        self.l2.record_miss();
        // Background fetch of the full line before the partial write applies
        self.energy.dram += dram.active_energy(t3 - t2)
            + dram.idle_energy(t2)
            + self.dram_transfer_penalty_pj;
        if self.fill_l2(address, true) {
            // The write-back runs off the critical path but still occupies DRAM
            self.energy.dram += dram.active_energy(t3 - t2) - dram.idle_energy(t3 - t2)
                + self.dram_transfer_penalty_pj;
        }
        false
    }

    /// Clean fill of the L1 serving `address`.
    /// L1 lines are never dirty, so an evicted L1 line needs no write-back.
    fn fill_l1(&mut self, instruction: bool, address: u64) {
        let cache = if instruction {
            &mut self.l1i
        } else {
            &mut self.l1d
        };
        let victim = cache.insert(address, false, &mut self.selector);
        debug_assert!(!victim.is_some_and(|block| block.dirty));
    }

    /// Install `address` into L2, writing back a dirty victim.
    /// Returns whether a write-back was issued.
    fn fill_l2(&mut self, address: u64, dirty: bool) -> bool {
        match self.l2.insert(address, dirty, &mut self.selector) {
            Some(victim) if victim.dirty => {
                let victim_address = self.l2.store.get_address(&victim);
                self.dram.write_back(victim_address);
                true
            }
            _ => false,
        }
    }
}
