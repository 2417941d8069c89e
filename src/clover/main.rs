mod dataset_gen;
mod openflights;

use anyhow::{Context, Result};
use clap::Parser;
use dataset_gen::DatasetGen;
use log::info;
use std::path::PathBuf;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Builds the route dataset for the layout from the OpenFlights data files.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = None,
    override_usage = "clover <openflights-data-directory> <output-directory>/openflights-dataset.json"
)]
struct Args {
    /// Directory holding airports.dat and routes.dat
    #[arg(env = "OPENFLIGHTS_DATA_DIR")]
    data_directory: PathBuf,

    /// Where to write the dataset JSON
    output_path: PathBuf,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    if let Some(parent) = args.output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }

    let dataset = DatasetGen::new().run(&args.data_directory)?;

    dataset.save(&args.output_path)?;

    info!(
        "Wrote {} airports and {} routes to {}",
        dataset.num_airports(),
        dataset.routes.len(),
        args.output_path.display()
    );

    Ok(())
}
