//! Memory structure: split L1, shared L2 and DRAM

pub mod cache;
pub mod dram;
pub mod hierarchy;
pub mod replacement;

/// Power (W) times time (ns) yields nJ; energy totals are kept in pJ
const PJ_PER_WATT_NS: f64 = 1000.0;

/// Access time and power figures of one level
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelTiming {
    pub access_time_ns: f64,
    pub idle_power_w: f64,
    pub active_power_w: f64,
}

impl LevelTiming {
    pub fn make(access_time_ns: f64, idle_power_w: f64, active_power_w: f64) -> Self {
        Self {
            access_time_ns,
            idle_power_w,
            active_power_w,
        }
    }

    /// Energy in pJ spent active for `ns` nanoseconds
    pub fn active_energy(&self, ns: f64) -> f64 {
        self.active_power_w * ns * PJ_PER_WATT_NS
    }

    /// Energy in pJ spent idle for `ns` nanoseconds
    pub fn idle_energy(&self, ns: f64) -> f64 {
        self.idle_power_w * ns * PJ_PER_WATT_NS
    }
}

/// Reference: <https://inst.eecs.berkeley.edu/~cs61c/su20/pdfs/lectures/lec15.pdf>
///
/// Only governs the data L1: whether a write that misses L1 also fills it.
/// Either way the write completes once it lands in L2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WriteMissPolicy {
    WriteAllocate,
    #[default]
    WriteNoAllocate,
}
