// crates/vessel-core/src/phantom.rs

//! Tiny synthetic volumes used by tests, benches, and the CLI examples.
//!
//! All generators are deterministic; the noise helper takes an explicit
//! seed so runs remain reproducible.

use crate::error::Result;
use crate::volume::{Dim, ScalarVolume, Spacing};
use rand::{rngs::StdRng, Rng as _, SeedableRng};

/// Constant-valued volume.
///
/// # Errors
/// Propagates the spacing validation of [`ScalarVolume::filled`].
pub fn constant(dim: Dim, spacing: Spacing, value: f64) -> Result<ScalarVolume> {
    ScalarVolume::filled(dim, spacing, value)
}

/// All-zero volume with a single unit impulse at `center`.
///
/// # Errors
/// Propagates the spacing validation of [`ScalarVolume::zeros`].
pub fn impulse(dim: Dim, spacing: Spacing, center: (usize, usize, usize)) -> Result<ScalarVolume> {
    let mut v = ScalarVolume::zeros(dim, spacing)?;
    v.set(center.0, center.1, center.2, 1.0);
    Ok(v)
}

/// Bright tube along `z` with a Gaussian cross-section.
///
/// The tube axis passes through `(cx, cy)` in voxel coordinates and spans
/// `z in [z_lo, z_hi)`; the cross-section profile is
/// `exp(-(dx^2 + dy^2) / (2 sigma^2))` with distances in physical units.
///
/// # Errors
/// Propagates the spacing validation of [`ScalarVolume::zeros`].
pub fn tube_z(
    dim: Dim,
    spacing: Spacing,
    center_xy: (f64, f64),
    sigma: f64,
    z_range: (usize, usize),
) -> Result<ScalarVolume> {
    let mut v = ScalarVolume::zeros(dim, spacing)?;
    let (nx, ny, nz) = dim;
    let (sx, sy, _) = spacing;
    let inv_two_sigma2 = 1.0 / (2.0 * sigma * sigma);
    for k in z_range.0..z_range.1.min(nz) {
        for j in 0..ny {
            let dy = (j as f64 - center_xy.1) * sy;
            for i in 0..nx {
                let dx = (i as f64 - center_xy.0) * sx;
                let value = (-(dx * dx + dy * dy) * inv_two_sigma2).exp();
                v.set(i, j, k, value);
            }
        }
    }
    Ok(v)
}

/// Add uniform noise in `[-amplitude, amplitude]` to every voxel.
pub fn add_noise(volume: &mut ScalarVolume, amplitude: f64, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for x in volume.as_mut_slice() {
        *x += rng.random_range(-amplitude..=amplitude);
    }
}
