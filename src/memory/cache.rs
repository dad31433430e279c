//! Cache implementation

use super::replacement::VictimSelector;
use super::LevelTiming;
use crate::error::SimulatorError;
use crate::error::SimulatorResult;

pub fn is_pow_2(value: u64) -> bool {
    value != 0 && value & (value - 1) == 0
}

/// A single cache line.
/// `index` is the set the line lives in, so that the full
/// address can be rebuilt from the line alone.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Block {
    pub valid: bool,
    pub dirty: bool,

    pub tag: u64,
    pub index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CachePolicy {
    pub cache_size: u64,
    pub block_size: u64,
    pub associativity: usize,
}

impl CachePolicy {
    pub fn make(cache_size: u64, block_size: u64, associativity: usize) -> Self {
        Self {
            cache_size,
            block_size,
            associativity,
        }
    }

    /// Number of sets this policy lays out
    pub fn set_count(&self) -> usize {
        (self.cache_size / (self.associativity as u64 * self.block_size))
            as usize
    }

    pub fn validate(&self) -> SimulatorResult<()> {
        if self.associativity == 0 {
            return Err(SimulatorError::ConfigError(
                "associativity must be at least 1".to_string(),
            ));
        }
        // Block size must be a power of 2
        if !is_pow_2(self.block_size) {
            return Err(SimulatorError::ConfigError(format!(
                "block size {} is not a power of 2",
                self.block_size
            )));
        }
        // Cache size must split into whole sets
        let set_bytes = self.associativity as u64 * self.block_size;
        if self.cache_size == 0 || self.cache_size % set_bytes != 0 {
            return Err(SimulatorError::ConfigError(format!(
                "cache size {} is not a positive multiple of {} ({}-way sets of {}-byte lines)",
                self.cache_size, set_bytes, self.associativity, self.block_size
            )));
        }
        Ok(())
    }
}

/// Set-associative line store.
/// Blocks are laid out set by set: set `i` owns
/// `blocks[i * associativity..(i + 1) * associativity]`.
pub struct Store {
    pub policy: CachePolicy,
    set_count: usize,
    blocks: Vec<Block>,
}

// Address looks like this:
// | tag | index | offset |
// with index = (address / block_size) mod set_count
impl Store {
    pub fn make(policy: CachePolicy) -> SimulatorResult<Self> {
        policy.validate()?;
        let set_count = policy.set_count();

        // Initialize blocks
        let mut blocks = vec![Block::default(); set_count * policy.associativity];
        for (i, block) in blocks.iter_mut().enumerate() {
            block.index = i / policy.associativity;
        }

        Ok(Self {
            policy,
            set_count,
            blocks,
        })
    }

    pub fn set_count(&self) -> usize {
        self.set_count
    }

    pub fn get_index(&self, address: u64) -> usize {
        ((address / self.policy.block_size) % self.set_count as u64) as usize
    }

    pub fn get_tag(&self, address: u64) -> u64 {
        address / (self.policy.block_size * self.set_count as u64)
    }

    /// Rebuild the byte address of the first byte held by `block`
    pub fn get_address(&self, block: &Block) -> u64 {
        block.tag * self.policy.block_size * self.set_count as u64
            + block.index as u64 * self.policy.block_size
    }

    /// The lines of set `index`
    pub fn set(&self, index: usize) -> &[Block] {
        let ways = self.policy.associativity;
        &self.blocks[index * ways..(index + 1) * ways]
    }

    /// Position of the valid block holding `address`, if any
    pub fn lookup(&self, address: u64) -> Option<usize> {
        let tag = self.get_tag(address);
        let index = self.get_index(address);
        let begin = index * self.policy.associativity;
        self.set(index)
            .iter()
            .position(|block| block.valid && block.tag == tag)
            .map(|way| begin + way)
    }

    pub fn probe(&self, address: u64) -> bool {
        self.lookup(address).is_some()
    }

    /// Mark the resident block holding `address` dirty.
    /// Returns false if the address is not resident.
    pub fn mark_dirty(&mut self, address: u64) -> bool {
        match self.lookup(address) {
            Some(i) => {
                self.blocks[i].dirty = true;
                true
            }
            None => false,
        }
    }

    /// Install `address` into its set, overwriting a victim slot.
    /// Returns the overwritten block if it was valid.
    /// A direct-mapped store never consults the selector.
    pub fn insert<S: VictimSelector + ?Sized>(
        &mut self,
        address: u64,
        dirty: bool,
        selector: &mut S,
    ) -> Option<Block> {
        let ways = self.policy.associativity;
        let index = self.get_index(address);
        let way = if ways == 1 {
            0
        } else {
            selector.select_victim(ways)
        };
        debug_assert!(way < ways);

        let block = Block {
            valid: true,
            dirty,
            tag: self.get_tag(address),
            index,
        };
        let replaced = std::mem::replace(&mut self.blocks[index * ways + way], block);
        replaced.valid.then_some(replaced)
    }
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct CacheHistory {
    pub num_hit: u64,
    pub num_miss: u64,
}

impl CacheHistory {
    pub fn accesses(&self) -> u64 {
        self.num_hit + self.num_miss
    }

    pub fn merged(&self, other: &CacheHistory) -> CacheHistory {
        CacheHistory {
            num_hit: self.num_hit + other.num_hit,
            num_miss: self.num_miss + other.num_miss,
        }
    }
}

/// One cache level: a store plus its timing and power figures.
/// Costs are billed by the hierarchy, which knows why a level was reached.
pub struct Cache {
    pub name: &'static str,
    pub store: Store,
    pub timing: LevelTiming,
    pub history: CacheHistory,
}

impl Cache {
    pub fn make(
        name: &'static str,
        policy: CachePolicy,
        timing: LevelTiming,
    ) -> SimulatorResult<Self> {
        Ok(Self {
            name,
            store: Store::make(policy)?,
            timing,
            history: CacheHistory::default(),
        })
    }

    pub fn probe(&self, address: u64) -> bool {
        self.store.probe(address)
    }

    pub fn insert<S: VictimSelector + ?Sized>(
        &mut self,
        address: u64,
        dirty: bool,
        selector: &mut S,
    ) -> Option<Block> {
        self.store.insert(address, dirty, selector)
    }

    pub fn record_hit(&mut self) {
        self.history.num_hit += 1;
    }

    pub fn record_miss(&mut self) {
        self.history.num_miss += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::replacement::RandomSelector;

    /// Always returns the same way
    struct FixedWay(usize);

    impl VictimSelector for FixedWay {
        fn select_victim(&mut self, _ways: usize) -> usize {
            self.0
        }
    }

    struct NeverCalled;

    impl VictimSelector for NeverCalled {
        fn select_victim(&mut self, _ways: usize) -> usize {
            panic!("direct-mapped stores must not draw a victim");
        }
    }

    fn l2_policy(associativity: usize) -> CachePolicy {
        CachePolicy::make(256 * 1024, 64, associativity)
    }

    #[test]
    fn test_is_pow_2() {
        assert!(is_pow_2(1));
        assert!(is_pow_2(64));
        assert!(!is_pow_2(0));
        assert!(!is_pow_2(48));
    }

    #[test]
    fn test_set_count() {
        assert_eq!(CachePolicy::make(32 * 1024, 64, 1).set_count(), 512);
        assert_eq!(l2_policy(2).set_count(), 2048);
        assert_eq!(l2_policy(4).set_count(), 1024);
        assert_eq!(l2_policy(8).set_count(), 512);
    }

    #[test]
    fn test_invalid_policies() {
        assert!(CachePolicy::make(32 * 1024, 64, 0).validate().is_err());
        assert!(CachePolicy::make(32 * 1024, 48, 1).validate().is_err());
        assert!(CachePolicy::make(1000, 64, 2).validate().is_err());
        assert!(CachePolicy::make(0, 64, 2).validate().is_err());
        assert!(Store::make(CachePolicy::make(100, 64, 1)).is_err());
    }

    #[test]
    fn test_decomposition_is_stable() {
        let a = Store::make(l2_policy(4)).unwrap();
        let b = Store::make(l2_policy(4)).unwrap();
        for address in [0u64, 0x3f, 0x40, 0x1000, 0xdead_beef, 0x1_ffff_ffc0] {
            assert_eq!(a.get_index(address), b.get_index(address));
            assert_eq!(a.get_tag(address), b.get_tag(address));
            assert_eq!(a.get_index(address), a.get_index(address));
        }
    }

    #[test]
    fn test_decomposition_values() {
        let store = Store::make(l2_policy(4)).unwrap();
        // 1024 sets of 64-byte lines
        assert_eq!(store.get_index(0x1000), 0x1000 / 64);
        assert_eq!(store.get_tag(0x1000), 0);
        assert_eq!(store.get_index(64 * 1024 + 0x40), 1);
        assert_eq!(store.get_tag(64 * 1024 + 0x40), 1);
    }

    #[test]
    fn test_probe_and_insert() {
        let mut store = Store::make(l2_policy(4)).unwrap();
        let mut selector = RandomSelector::seeded(3);
        assert!(!store.probe(0x1000));
        assert_eq!(store.insert(0x1000, false, &mut selector), None);
        assert!(store.probe(0x1000));
        // Any byte of the same line hits
        assert!(store.probe(0x103f));
        assert!(!store.probe(0x1040));
    }

    #[test]
    fn test_sets_never_change_size() {
        let mut store = Store::make(l2_policy(2)).unwrap();
        let mut selector = RandomSelector::seeded(11);
        let stride = 64 * store.set_count() as u64;
        for i in 0..100 {
            store.insert(i * stride, i % 2 == 0, &mut selector);
            assert_eq!(store.set(0).len(), 2);
        }
        assert_eq!(store.blocks.len(), store.set_count() * 2);
    }

    #[test]
    fn test_direct_mapped_ignores_selector() {
        let mut store = Store::make(CachePolicy::make(32 * 1024, 64, 1)).unwrap();
        let stride = 32 * 1024;
        assert_eq!(store.insert(0x80, false, &mut NeverCalled), None);
        let evicted = store.insert(0x80 + stride, false, &mut NeverCalled);
        assert_eq!(evicted.map(|b| store.get_address(&b)), Some(0x80));
        assert!(store.probe(0x80 + stride));
        assert!(!store.probe(0x80));
    }

    #[test]
    fn test_evicted_address_is_rebuilt() {
        let mut store = Store::make(l2_policy(2)).unwrap();
        let stride = 64 * store.set_count() as u64;
        let first = 5 * stride + 7 * 64;
        let second = 9 * stride + 7 * 64;

        store.insert(first, true, &mut FixedWay(1));
        let evicted = store.insert(second, false, &mut FixedWay(1)).unwrap();
        assert!(evicted.dirty);
        assert_eq!(evicted.tag, 5);
        assert_eq!(evicted.index, 7);
        assert_eq!(store.get_address(&evicted), first);
    }

    #[test]
    fn test_invalid_victim_is_not_reported() {
        let mut store = Store::make(l2_policy(2)).unwrap();
        let stride = 64 * store.set_count() as u64;
        store.insert(0, true, &mut FixedWay(0));
        assert_eq!(store.insert(stride, false, &mut FixedWay(1)), None);
        assert!(store.probe(0));
        assert!(store.probe(stride));
    }

    #[test]
    fn test_mark_dirty_in_place() {
        let mut store = Store::make(l2_policy(4)).unwrap();
        store.insert(0x2000, false, &mut FixedWay(2));
        assert!(store.mark_dirty(0x2000));
        let index = store.get_index(0x2000);
        let resident: Vec<_> = store.set(index).iter().filter(|b| b.valid).collect();
        assert_eq!(resident.len(), 1);
        assert!(resident[0].dirty);
        assert!(!store.mark_dirty(0x4000_0000));
    }
}
