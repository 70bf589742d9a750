// crates/vessel-cli/src/bin/vessel_filter.rs

//! Multi-scale Sato vesselness filter.
//!
//! Reads a scalar volume, runs the multi-scale enhancement over a linear or
//! exponential scale schedule, optionally gates the result with a mask
//! (eroded for CT, dilated for other modalities), and writes the response
//! volume. A mask is strongly recommended; without one the background
//! contributes spurious responses.

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn};
use vessel_core::io::{
    read_mask_volume_auto, read_scalar_volume_auto, resolve_output_path,
    write_scalar_volume_auto, write_scalar_volume_auto_as, PixelKind,
};
use vessel_core::{ScaleMode, ScaleSchedule, VesselnessParams};
use vessel_pipeline::{ct_bone_cap, dilate_ball, erode_ball, MultiScaleVesselness};

/// Minimum scale forced for CT angiography inputs.
const CT_MIN_SCALE: f64 = 0.775_438;

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
enum ScaleModeOpt {
    /// Equal arithmetic scale steps.
    Linear,
    /// Equal geometric scale steps.
    Exp,
}

#[derive(Parser, Debug)]
#[command(
    name = "vessel_filter",
    about = "Applies the Sato vesselness filter over a range of scales",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    /// Input volume (.json, .cbor, .mha)
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Output volume; `.mha` is appended when the extension is unknown
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Optional mask volume; ignored (with a warning) on a shape mismatch
    #[arg(short = 'b', long = "mask")]
    mask: Option<PathBuf>,

    /// Minimum scale value
    #[arg(long = "min", default_value_t = 1.0)]
    min: f64,

    /// Maximum scale value (set min and max equal for single scale)
    #[arg(long = "max", default_value_t = 3.093_75)]
    max: f64,

    /// Number of scale steps
    #[arg(long = "steps", default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    steps: u32,

    /// Alpha one of the Sato filter
    #[arg(long = "aone", default_value_t = 0.5)]
    alpha_one: f64,

    /// Alpha two of the Sato filter
    #[arg(long = "atwo", default_value_t = 2.0)]
    alpha_two: f64,

    /// Scale distribution
    #[arg(long = "mod", value_enum, default_value_t = ScaleModeOpt::Linear)]
    mode: ScaleModeOpt,

    /// Treat the input as CT angiography: forces the CT minimum scale,
    /// erodes the mask, and rejects bone by intensity
    #[arg(long = "ct", default_value_t = false)]
    ct: bool,

    /// Write the response as 16-bit unsigned samples instead of doubles
    #[arg(long = "cast", default_value_t = false)]
    cast: bool,
}

fn main() -> Result<()> {
    vessel_cli::init_tracing();
    let cli = Cli::parse();

    let output = resolve_output_path(&cli.output);

    let volume = read_scalar_volume_auto(&cli.input)
        .with_context(|| format!("reading input volume {}", cli.input.display()))?;
    info!(dim = ?volume.dim(), spacing = ?volume.spacing(), "input volume loaded");

    // Mask handling mirrors the original tool: a mismatched mask is dropped
    // with a warning rather than failing the run.
    let mut mask = None;
    if let Some(path) = &cli.mask {
        let m = read_mask_volume_auto(path)
            .with_context(|| format!("reading mask volume {}", path.display()))?;
        if m.dim() == volume.dim() {
            mask = Some(m);
        } else {
            warn!(
                mask = ?m.dim(),
                input = ?volume.dim(),
                "mask and input volume have different dimensions, ignoring mask"
            );
        }
    }

    // CT inputs search from a fixed small scale; every input floors the
    // minimum scale at the in-plane spacing.
    let mut min = if cli.ct { CT_MIN_SCALE } else { cli.min };
    let min_spacing = volume.spacing().0;
    if min < min_spacing {
        min = min_spacing;
    }
    let max = cli.max.max(min);

    // Erode for CT, dilate for other modalities.
    let mask = mask.map(|m| {
        if cli.ct {
            erode_ball(&m, 1)
        } else {
            dilate_ball(&m, 8)
        }
    });

    let mode = match cli.mode {
        ScaleModeOpt::Linear => ScaleMode::Linear,
        ScaleModeOpt::Exp => ScaleMode::Exponential,
    };
    let schedule = ScaleSchedule::new(min, max, cli.steps as usize, mode)
        .context("building the scale schedule")?;
    let params = VesselnessParams {
        alpha1: cli.alpha_one,
        alpha2: cli.alpha_two,
        ..VesselnessParams::default()
    };

    info!(
        min,
        max,
        steps = cli.steps,
        ?mode,
        ct = cli.ct,
        "running multi-scale vesselness"
    );

    let mut driver = MultiScaleVesselness::new(params, schedule);
    if let Some(m) = mask.as_ref() {
        driver = driver.with_mask(m);
    }
    if cli.ct && mask.is_some() {
        driver = driver.with_ct_exclusion(&volume, ct_bone_cap(&volume));
    }

    let out = driver.run(&volume).context("vesselness computation failed")?;
    if out.report.degenerate_voxels > 0 {
        warn!(
            degenerate = out.report.degenerate_voxels,
            "some voxels had non-finite Hessians and were zeroed"
        );
    }

    if cli.cast {
        write_scalar_volume_auto_as(&output, &out.response, PixelKind::U16)
            .with_context(|| format!("writing {}", output.display()))?;
    } else {
        write_scalar_volume_auto(&output, &out.response)
            .with_context(|| format!("writing {}", output.display()))?;
    }

    println!(
        "Filtered {} over {} scales -> {}",
        cli.input.display(),
        out.report.scales_processed,
        output.display()
    );
    Ok(())
}
