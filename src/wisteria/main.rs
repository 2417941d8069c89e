mod frame;

use anyhow::{Context, Result};
use clap::Parser;
use flightweb::config::LayoutConfig;
use flightweb::dataset::Dataset;
use flightweb::geometry::TargetGeometry;
use flightweb::layout::simulation::Simulation;
use frame::Frame;
use log::info;
use std::path::PathBuf;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Dataset JSON written by clover
    #[arg(env = "FLIGHTWEB_DATASET")]
    dataset: PathBuf,

    /// Shape the spring rest lengths are taken from
    #[arg(long, value_enum, default_value_t = TargetGeometry::Globe)]
    geometry: TargetGeometry,

    /// RON layout config. Defaults are used for anything it leaves out.
    #[arg(long, env = "FLIGHTWEB_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 10_000)]
    ticks: u64,

    /// Overrides the seed from the config file
    #[arg(long)]
    seed: Option<u64>,

    /// Dataset index of the first airport. Random when absent.
    #[arg(long)]
    start: Option<usize>,

    /// Log progress every this many ticks
    #[arg(long, default_value_t = 1_000)]
    log_every: u64,

    /// Where to write the projected frame JSON
    #[arg(long, env = "FLIGHTWEB_FRAME_OUT")]
    frame_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => LayoutConfig::load(path)?,
        None => LayoutConfig::default(),
    };
    if args.seed.is_some() {
        config.simulation.seed = args.seed;
    }

    let dataset = Dataset::load(&args.dataset)?;
    dataset
        .validate()
        .with_context(|| format!("validating {}", args.dataset.display()))?;

    info!(
        "Loaded {} airports and {} routes, laying out as {}",
        dataset.num_airports(),
        dataset.routes.len(),
        args.geometry
    );

    let mut simulation = Simulation::new(
        dataset.distances(args.geometry.distance_function()),
        &config.simulation,
    );

    let first = match args.start {
        Some(dataset_ix) => simulation.start_at(dataset_ix)?,
        None => simulation.start()?,
    };
    info!(
        "Starting from airport {}",
        simulation.nodes()[first].dataset_ix
    );

    let log_every = args.log_every.max(1);
    for _ in 0..args.ticks {
        simulation.step()?;

        if simulation.ticks() % log_every == 0 {
            let stats = simulation.stats();
            info!(
                "Tick {}: {} admitted, {} pending, mean strain {}",
                stats.ticks,
                stats.admitted,
                stats.candidates,
                stats
                    .mean_strain
                    .map(|strain| format!("{:.3}", strain))
                    .unwrap_or_else(|| "n/a".to_string())
            );
        }
    }

    if !simulation.is_exhausted() {
        info!(
            "Stopped after {} ticks with {} of {} airports admitted",
            simulation.ticks(),
            simulation.nodes().len(),
            dataset.num_airports()
        );
    }

    if let Some(frame_out) = &args.frame_out {
        let targets = dataset.positions(args.geometry.position_function());
        let frame = Frame::project(
            simulation.nodes(),
            &targets,
            simulation.ticks(),
            &config.frame,
        );
        let json = serde_json::to_string(&frame)?;
        std::fs::write(frame_out, json)
            .with_context(|| format!("writing {}", frame_out.display()))?;
        info!(
            "Wrote {} nodes and {} segments to {}",
            frame.nodes.len(),
            frame.segments.len(),
            frame_out.display()
        );
    }

    Ok(())
}
