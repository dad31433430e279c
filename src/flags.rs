use std::path::PathBuf;

use clap::Parser;

use crate::config::SimConfig;
use crate::memory::WriteMissPolicy;

/// Trace-driven L1/L2/DRAM timing and energy simulator.
#[derive(Parser, Debug)]
#[command(name = "sim", version)]
pub struct SimArgs {
    /// Trace files or benchmark directories to simulate.
    #[arg(required = true)]
    pub traces: Vec<PathBuf>,

    /// L2 associativity to study. Repeat to sweep several values.
    #[arg(short = 'a', long = "associativity", default_values_t = [2usize, 4, 8])]
    pub associativities: Vec<usize>,

    /// Consecutive passes over each trace against the same warmed hierarchy.
    #[arg(short, long, default_value_t = 1)]
    pub passes: usize,

    /// Seed for random replacement; omitted means a fresh seed per run.
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Fill the data L1 on write misses.
    #[arg(long)]
    pub write_allocate: bool,

    /// Extension of trace files inside benchmark directories.
    #[arg(long, default_value = "din")]
    pub extension: String,

    /// Also write every report as a CSV row to this file.
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Enables verbose mode, logging per-pass detail.
    #[arg(short, long)]
    pub verbose: bool,
}

impl SimArgs {
    pub fn config(&self) -> SimConfig {
        SimConfig {
            associativities: self.associativities.clone(),
            passes: self.passes,
            seed: self.seed,
            write_miss_policy: if self.write_allocate {
                WriteMissPolicy::WriteAllocate
            } else {
                WriteMissPolicy::WriteNoAllocate
            },
            ..SimConfig::default()
        }
    }
}
