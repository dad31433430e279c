//! Per-pass report of one (trace, associativity) run and the sinks it goes to

use std::fmt;
use std::io::Write;

use crate::error::SimulatorError;
use crate::error::SimulatorResult;
use crate::memory::hierarchy::SimulationHistory;

const JOULES_PER_PJ: f64 = 1e-12;

/// Counters of one run divided by the number of passes
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationReport {
    pub trace: String,
    pub associativity: usize,
    pub passes: usize,

    pub accesses: f64,
    pub l1i_hits: f64,
    pub l1i_misses: f64,
    pub l1d_hits: f64,
    pub l1d_misses: f64,
    pub l2_hits: f64,
    pub l2_misses: f64,
    pub write_backs: f64,

    pub total_access_time_ns: f64,
    pub l1_energy_pj: f64,
    pub l2_energy_pj: f64,
    pub dram_energy_pj: f64,
}

impl SimulationReport {
    /// Normalize cumulative counters by `passes`.
    /// Fails if `passes` is zero or no request was simulated.
    pub fn make(
        trace: &str,
        associativity: usize,
        passes: usize,
        history: &SimulationHistory,
    ) -> SimulatorResult<Self> {
        if passes == 0 {
            return Err(SimulatorError::ConfigError(
                "pass count must be at least 1".to_string(),
            ));
        }
        if history.accesses() == 0 {
            return Err(SimulatorError::NoAccesses("the hierarchy"));
        }
        let per_pass = |value: u64| value as f64 / passes as f64;
        Ok(Self {
            trace: trace.to_string(),
            associativity,
            passes,
            accesses: per_pass(history.accesses()),
            l1i_hits: per_pass(history.l1i.num_hit),
            l1i_misses: per_pass(history.l1i.num_miss),
            l1d_hits: per_pass(history.l1d.num_hit),
            l1d_misses: per_pass(history.l1d.num_miss),
            l2_hits: per_pass(history.l2.num_hit),
            l2_misses: per_pass(history.l2.num_miss),
            write_backs: per_pass(history.num_write_back),
            total_access_time_ns: history.total_access_time_ns / passes as f64,
            l1_energy_pj: history.energy.l1 / passes as f64,
            l2_energy_pj: history.energy.l2 / passes as f64,
            dram_energy_pj: history.energy.dram / passes as f64,
        })
    }

    pub fn l1_hits(&self) -> f64 {
        self.l1i_hits + self.l1d_hits
    }

    pub fn l1_misses(&self) -> f64 {
        self.l1i_misses + self.l1d_misses
    }

    pub fn l1_hit_rate(&self) -> f64 {
        self.l1_hits() / self.accesses
    }

    /// Hit rate over the requests that reached L2
    pub fn l2_hit_rate(&self) -> SimulatorResult<f64> {
        let l2_accesses = self.l2_hits + self.l2_misses;
        if l2_accesses == 0.0 {
            return Err(SimulatorError::NoAccesses("L2"));
        }
        Ok(self.l2_hits / l2_accesses)
    }

    /// Average memory access time seen by the processor
    pub fn average_access_time_ns(&self) -> f64 {
        self.total_access_time_ns / self.accesses
    }

    pub fn total_energy_pj(&self) -> f64 {
        self.l1_energy_pj + self.l2_energy_pj + self.dram_energy_pj
    }

    pub fn total_energy_j(&self) -> f64 {
        self.total_energy_pj() * JOULES_PER_PJ
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Trace File: {}", self.trace)?;
        writeln!(f, "Associativity: {}", self.associativity)?;
        writeln!(f, "Passes: {}", self.passes)?;
        writeln!(f, "L1 Misses: {:.2}", self.l1_misses())?;
        writeln!(f, "L1 Hits: {:.2}", self.l1_hits())?;
        writeln!(f, "  L1I Hits/Misses: {:.2}/{:.2}", self.l1i_hits, self.l1i_misses)?;
        writeln!(f, "  L1D Hits/Misses: {:.2}/{:.2}", self.l1d_hits, self.l1d_misses)?;
        writeln!(f, "L1 Hit Rate: {:.4}", self.l1_hit_rate())?;
        writeln!(f, "L2 Misses: {:.2}", self.l2_misses)?;
        writeln!(f, "L2 Hits: {:.2}", self.l2_hits)?;
        match self.l2_hit_rate() {
            Ok(rate) => writeln!(f, "L2 Hit Rate: {:.4}", rate)?,
            Err(_) => writeln!(f, "L2 Hit Rate: undefined")?,
        }
        writeln!(f, "L2 Write-backs: {:.2}", self.write_backs)?;
        writeln!(
            f,
            "L1 Energy Consumption: {:.1} pJ ({:.3e} J)",
            self.l1_energy_pj,
            self.l1_energy_pj * JOULES_PER_PJ
        )?;
        writeln!(
            f,
            "L2 Energy Consumption: {:.1} pJ ({:.3e} J)",
            self.l2_energy_pj,
            self.l2_energy_pj * JOULES_PER_PJ
        )?;
        writeln!(
            f,
            "DRAM Energy Consumption: {:.1} pJ ({:.3e} J)",
            self.dram_energy_pj,
            self.dram_energy_pj * JOULES_PER_PJ
        )?;
        writeln!(
            f,
            "Total Energy Consumption: {:.1} pJ ({:.3e} J)",
            self.total_energy_pj(),
            self.total_energy_j()
        )?;
        writeln!(
            f,
            "Average Memory Access Time: {:.4} ns",
            self.average_access_time_ns()
        )
    }
}

/// Consumer of finished reports
pub trait ReportSink {
    fn emit(&mut self, report: &SimulationReport) -> SimulatorResult<()>;
}

/// Human-readable report, one block per run
pub struct TextSink<W: Write> {
    out: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> ReportSink for TextSink<W> {
    fn emit(&mut self, report: &SimulationReport) -> SimulatorResult<()> {
        writeln!(self.out, "{}", report)?;
        Ok(())
    }
}

pub const CSV_HEADER: [&str; 16] = [
    "Trace",
    "Associativity",
    "Passes",
    "L1 Hits",
    "L1 Misses",
    "L1 Hit Rate",
    "L2 Hits",
    "L2 Misses",
    "L2 Hit Rate",
    "Write-backs",
    "L1 Energy (pJ)",
    "L2 Energy (pJ)",
    "DRAM Energy (pJ)",
    "Total Energy (pJ)",
    "Total Energy (J)",
    "AMAT (ns)",
];

/// One CSV row per run
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(out: W) -> SimulatorResult<Self> {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(CSV_HEADER)?;
        Ok(Self { writer })
    }

    pub fn flush(&mut self) -> SimulatorResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> SimulatorResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| SimulatorError::IoError(e.into_error()))
    }
}

impl<W: Write> ReportSink for CsvSink<W> {
    fn emit(&mut self, report: &SimulationReport) -> SimulatorResult<()> {
        let l2_hit_rate = match report.l2_hit_rate() {
            Ok(rate) => format!("{:.4}", rate),
            Err(_) => "undefined".to_string(),
        };
        self.writer.write_record([
            report.trace.clone(),
            report.associativity.to_string(),
            report.passes.to_string(),
            format!("{:.2}", report.l1_hits()),
            format!("{:.2}", report.l1_misses()),
            format!("{:.4}", report.l1_hit_rate()),
            format!("{:.2}", report.l2_hits),
            format!("{:.2}", report.l2_misses),
            l2_hit_rate,
            format!("{:.2}", report.write_backs),
            format!("{:.1}", report.l1_energy_pj),
            format!("{:.1}", report.l2_energy_pj),
            format!("{:.1}", report.dram_energy_pj),
            format!("{:.1}", report.total_energy_pj()),
            format!("{:.6e}", report.total_energy_j()),
            format!("{:.4}", report.average_access_time_ns()),
        ])?;
        Ok(())
    }
}
