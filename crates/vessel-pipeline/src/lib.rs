// crates/vessel-pipeline/src/lib.rs

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

//! Multi-scale vesselness pipeline.
//!
//! - `multiscale`: the scale-iterating driver ([`MultiScaleVesselness`]) and
//!   the one-call surfaces [`vesselness`] / [`vesselness_with_eigen`].
//! - `orientation`: cross-image orientation similarity ([`OrientationSimilarity`]).
//! - `binarize`: hysteresis labeling of a response map.
//! - `maskops`: mask gating, ball erosion/dilation, CT bone rejection.

pub mod binarize;
pub mod maskops;
pub mod multiscale;
pub mod orientation;

// ---- Re-exports for workspace compatibility ----
pub use binarize::{binarize, binarize_hysteresis};
pub use maskops::{
    apply_ct_exclusion, apply_mask, ct_bone_cap, dilate_ball, erode_ball, CT_BONE_CAP_HU,
    CT_BONE_CAP_OFFSET,
};
pub use multiscale::{
    vesselness, vesselness_with_eigen, MultiScaleVesselness, RunReport, VesselnessOutput,
};
pub use orientation::OrientationSimilarity;
