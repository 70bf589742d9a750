// crates/vessel-cli/src/bin/vessel_binarise.rs

//! Binarises a vesselness response map.
//!
//! With only the lower threshold this is plain thresholding; with an upper
//! threshold the labeling is hysteresis: seeds at the upper threshold grow
//! through the 26-connected neighborhood down to the lower one.

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use vessel_core::io::{read_scalar_volume_auto, resolve_output_path, write_mask_volume_auto};
use vessel_pipeline::binarize_hysteresis;

#[derive(Parser, Debug)]
#[command(
    name = "vessel_binarise",
    about = "Binarises a vesselness response with (hysteresis) thresholding",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    /// Input vesselness volume (.json, .cbor, .mha)
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Output label volume; `.mha` is appended when the extension is unknown
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Lower threshold
    #[arg(short = 't', long = "threshold", default_value_t = 4.0)]
    threshold: f64,

    /// Upper (seed) threshold; defaults to the lower threshold
    #[arg(long = "upper")]
    upper: Option<f64>,
}

fn main() -> Result<()> {
    vessel_cli::init_tracing();
    let cli = Cli::parse();

    let output = resolve_output_path(&cli.output);
    let response = read_scalar_volume_auto(&cli.input)
        .with_context(|| format!("reading vesselness volume {}", cli.input.display()))?;

    let upper = cli.upper.unwrap_or(cli.threshold);
    info!(low = cli.threshold, high = upper, "binarising response");

    let mask = binarize_hysteresis(&response, cli.threshold, upper)
        .context("binarisation failed")?;

    write_mask_volume_auto(&output, &mask)
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "Labeled {} voxels -> {}",
        mask.count_set(),
        output.display()
    );
    Ok(())
}
