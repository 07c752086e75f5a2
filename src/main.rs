//! Entry point for the hydresgeo application.
//! Handles CLI parsing, loads the run context and writes the dataset and diagnostics.

use clap::Parser;
use hydresgeo::assembler::DatasetAssembler;
use hydresgeo::context::DatasetContext;
use hydresgeo::join::AuxiliaryTables;
use hydresgeo::parallel::{get_parallel_info, ParallelConfig};
use std::fs::File;
use std::io::{self, BufWriter};

mod cli;

use cli::Args;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let options = args.run_options();
    options.validate()?;
    let paths = args.input_paths();

    ParallelConfig::new(args.threads).setup_global_pool()?;
    get_parallel_info().log();

    // Tables are loaded up front; a malformed one stops the run here
    let context = DatasetContext::load(&paths)?;
    let tables = AuxiliaryTables::load(&paths, &options)?;

    let output = DatasetAssembler::new(&context, &tables, &options)?.run(&paths.hyp_root)?;

    for (code, count) in output.diagnostics.counts() {
        log::info!("{count:>6} x {code}");
    }

    match &args.output {
        Some(path) => {
            output
                .dataset
                .write_csv(BufWriter::new(File::create(path)?), &options.missing_marker)?;
            log::info!("saved {} records to {}", output.dataset.len(), path.display());
        }
        None => output
            .dataset
            .write_csv(io::stdout().lock(), &options.missing_marker)?,
    }

    if let Some(path) = &args.diagnostics {
        output
            .diagnostics
            .write_json(BufWriter::new(File::create(path)?))?;
        log::info!(
            "saved {} diagnostics to {}",
            output.diagnostics.len(),
            path.display()
        );
    }

    Ok(())
}
