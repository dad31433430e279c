use std::path::PathBuf;
use std::process;

use clap::Parser;
use sim_lib::config::SimConfig;
use sim_lib::error::SimulatorResult;
use sim_lib::report::CsvSink;
use sim_lib::report::ReportSink;
use sim_lib::run_wrapper::collect_trace_files;
use sim_lib::run_wrapper::run_trace;
use sim_lib::run_wrapper::trace_name;

/// Run the associativity sweep over every trace of a benchmark directory
/// and collect the results in one CSV file.
#[derive(Parser)]
struct Args {
    /// Benchmark directory
    benchmarks: PathBuf,

    /// Output CSV path
    #[arg(short, long, default_value = "eval/sweep_eval.csv")]
    output: PathBuf,

    /// Passes per trace
    #[arg(short, long, default_value_t = 1)]
    passes: usize,

    /// Seed for random replacement
    #[arg(short, long)]
    seed: Option<u64>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run_eval(Args::parse()) {
        log::error!("{}", e);
        process::exit(1);
    }
}

fn run_eval(args: Args) -> SimulatorResult<()> {
    let config = SimConfig {
        passes: args.passes,
        seed: args.seed,
        ..SimConfig::default()
    };
    config.validate()?;

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut sink = CsvSink::new(std::fs::File::create(&args.output)?)?;

    for trace in collect_trace_files(&args.benchmarks, "din")? {
        log::info!("Running trace: {}", trace.display());
        match run_trace(&trace, &config) {
            Ok(reports) => {
                for report in &reports {
                    sink.emit(report)?;
                }
            }
            Err(e) => {
                log::warn!("Failed to run trace '{}': {}", trace_name(&trace), e);
            }
        }
    }

    sink.flush()?;
    log::info!("written {}", args.output.display());
    Ok(())
}
