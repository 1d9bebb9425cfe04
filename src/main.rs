//! Genome Tiler - inspect how genomic datasets are cut into tiles.
//!
//! This binary loads a chromosome layout and prints what the tiling engine
//! derives from it. Nothing is fetched from any dataset.

use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use genome_tiler::{
    config::{Cli, Command, LayoutArgs, PlanConfig, TilesetInfoConfig},
    read_chromsizes,
    tile::plan_batch,
    DatasetMetadata,
};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::TilesetInfo(config) => run_tileset_info(config),
        Command::Plan(config) => run_plan(config),
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "genome_tiler=debug"
    } else {
        "genome_tiler=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Validate the layout arguments and build metadata from the chromsizes file.
fn load_metadata(layout: &LayoutArgs) -> Result<DatasetMetadata, String> {
    layout.validate()?;

    let file = File::open(&layout.chromsizes)
        .map_err(|e| format!("cannot open {}: {e}", layout.chromsizes.display()))?;
    let sizes = read_chromsizes(BufReader::new(file)).map_err(|e| e.to_string())?;
    debug!(
        path = %layout.chromsizes.display(),
        chromosomes = sizes.len(),
        "loaded chromosome sizes"
    );

    layout.metadata(sizes)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> ExitCode {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };

    match rendered {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to serialize output: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Tileset Info Command
// =============================================================================

fn run_tileset_info(config: TilesetInfoConfig) -> ExitCode {
    let metadata = match load_metadata(&config.layout) {
        Ok(metadata) => metadata,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        kind = ?metadata.kind,
        extent = metadata.extent(),
        max_zoom = metadata.max_zoom(),
        "tileset"
    );
    print_json(&metadata.tileset_info(), config.pretty)
}

// =============================================================================
// Plan Command
// =============================================================================

fn run_plan(config: PlanConfig) -> ExitCode {
    let metadata = match load_metadata(&config.layout) {
        Ok(metadata) => metadata,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let plan = plan_batch(&metadata, &config.tile_ids);
    info!(
        tiles = config.tile_ids.len(),
        groups = plan.groups.len(),
        rejected = plan.rejected.len(),
        requests = plan
            .groups
            .iter()
            .map(|g| g.fetch.request_count())
            .sum::<usize>(),
        "planned batch"
    );
    print_json(&plan, config.pretty)
}
