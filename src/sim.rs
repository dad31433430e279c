use std::error::Error;
use std::fs::File;
use std::process;

use clap::Parser;
use sim_lib::flags::SimArgs;
use sim_lib::report::CsvSink;
use sim_lib::report::ReportSink;
use sim_lib::report::TextSink;
use sim_lib::run_wrapper;

fn main() {
    let args = SimArgs::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run(args) {
        log::error!("{}", e);
        process::exit(1);
    }
}

fn run(args: SimArgs) -> Result<(), Box<dyn Error>> {
    let config = args.config();
    config.validate()?;

    let traces = run_wrapper::expand_inputs(&args.traces, &args.extension)?;

    let mut text = TextSink::new(std::io::stdout().lock());
    let mut csv = match &args.csv {
        Some(path) => Some(CsvSink::new(File::create(path)?)?),
        None => None,
    };

    let mut failed = 0;
    for trace in &traces {
        match run_wrapper::run_trace(trace, &config) {
            Ok(reports) => {
                for report in &reports {
                    text.emit(report)?;
                    if let Some(csv) = csv.as_mut() {
                        csv.emit(report)?;
                    }
                }
            }
            Err(e) => {
                log::error!("{}: {}", trace.display(), e);
                failed += 1;
            }
        }
    }

    if let Some(csv) = csv.as_mut() {
        csv.flush()?;
    }

    if failed > 0 {
        return Err(format!("{} of {} trace(s) failed", failed, traces.len()).into());
    }
    Ok(())
}
