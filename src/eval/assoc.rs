use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use plotters::coord::Shift;
use plotters::prelude::*;
use sim_lib::config::SimConfig;
use sim_lib::run_wrapper::run_trace;
use sim_lib::run_wrapper::trace_name;

/// Plot average memory access time and total energy
/// against L2 associativity for one trace.
#[derive(Parser)]
struct Args {
    /// Trace file
    trace: PathBuf,

    /// L2 associativities to plot
    #[arg(short = 'a', long = "associativity", default_values_t = [1usize, 2, 4, 8, 16])]
    associativities: Vec<usize>,

    /// Passes per associativity
    #[arg(short, long, default_value_t = 1)]
    passes: usize,

    /// Seed for random replacement
    #[arg(short, long)]
    seed: Option<u64>,

    /// Output SVG path
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = SimConfig {
        associativities: args.associativities.clone(),
        passes: args.passes,
        seed: args.seed,
        ..SimConfig::default()
    };
    let reports = run_trace(&args.trace, &config)?;

    let amat: Vec<(i32, f64)> = reports
        .iter()
        .map(|r| (r.associativity as i32, r.average_access_time_ns()))
        .collect();
    // Plotted in microjoules
    let energy: Vec<(i32, f64)> = reports
        .iter()
        .map(|r| (r.associativity as i32, r.total_energy_j() * 1e6))
        .collect();

    let base_name = trace_name(&args.trace);
    let output_path = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("eval/assoc_eval_{}.svg", base_name)));
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let root = SVGBackend::new(&output_path, (1200, 500)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(
        &format!("Associativity study: {}", base_name),
        ("sans-serif", 30),
    )?;
    let (left, right) = root.split_horizontally(600);

    draw_series(&left, "Average memory access time", "AMAT (ns)", &amat, RED)?;
    draw_series(&right, "Total energy", "Energy (uJ)", &energy, BLUE)?;

    root.present()?;
    log::info!("written {}", output_path.display());
    Ok(())
}

fn draw_series(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    caption: &str,
    y_desc: &str,
    data: &[(i32, f64)],
    color: RGBColor,
) -> Result<(), Box<dyn Error>> {
    let x_max = data.iter().map(|(x, _)| *x).max().unwrap_or(1) + 1;
    let y_max = data.iter().map(|(_, y)| *y).fold(0.0, f64::max);

    let mut ctx = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 24).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0..x_max, 0.0..y_max * 1.1)?;
    ctx.configure_mesh()
        .x_desc("L2 associativity")
        .y_desc(y_desc)
        .draw()?;

    ctx.draw_series(LineSeries::new(data.iter().copied(), color))?;
    ctx.draw_series(
        data.iter()
            .map(|&(x, y)| Circle::new((x, y), 4, color.filled())),
    )?;
    Ok(())
}
