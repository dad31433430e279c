//! DRAM backing store

use super::LevelTiming;

/// Terminal level of the hierarchy.
/// Holds no line state: every address is always present.
pub struct Dram {
    pub capacity: u64,
    pub timing: LevelTiming,
    pub num_write_back: u64,
    pub last_write_back: Option<u64>,
}

impl Dram {
    pub fn make(capacity: u64, timing: LevelTiming) -> Self {
        Self {
            capacity,
            timing,
            num_write_back: 0,
            last_write_back: None,
        }
    }

    pub fn probe(&self, _address: u64) -> bool {
        true
    }

    /// Accept a line written back from the level above
    pub fn write_back(&mut self, address: u64) {
        log::trace!("write-back of line {:#x} to DRAM", address);
        self.num_write_back += 1;
        self.last_write_back = Some(address);
    }
}
