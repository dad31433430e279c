//! Trace-driven simulator of a split L1 / shared L2 / DRAM hierarchy,
//! reporting hit rates, average access time and per-component energy.

pub mod config;
pub mod error;
pub mod flags;
pub mod memory;
pub mod report;
pub mod run_wrapper;
pub mod trace;
