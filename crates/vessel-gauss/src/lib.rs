//! Separable recursive Gaussian filtering for 3D volumes.
//!
//! - `recursive`: 1D IIR Gaussian smoothing and 1st/2nd derivatives
//!   (Deriche fourth-order approximation, moment-renormalized).
//! - `axis`: per-axis application across a volume, parallel over lines.
//! - `hessian`: the six second partials and the per-scale [`HessianField`].
//! - `structure`: smoothed gradient outer product.
//!
//! Scale normalization (multiplying second derivatives by `sigma^2`) is
//! applied at the Hessian level so the 1D passes stay reusable.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

pub mod axis;
pub mod hessian;
pub mod recursive;
pub mod structure;

pub use axis::{filter_axis, Axis};
pub use hessian::{gaussian_derivative, smooth, HessianField};
pub use recursive::{DerivativeOrder, RecursiveGaussian};
pub use structure::StructureTensorField;

#[cfg(test)]
mod tests {
    use super::*;
    use vessel_core::phantom;

    #[test]
    fn hessian_is_bit_deterministic_across_runs() {
        // Parallel line filtering writes disjoint rows in a fixed order, so
        // repeated runs must agree exactly, independent of thread count.
        let mut v = phantom::tube_z((12, 12, 12), (1.0, 1.0, 1.0), (5.5, 5.5), 1.5, (0, 12))
            .unwrap();
        phantom::add_noise(&mut v, 0.05, 3);
        let a = HessianField::compute(&v, 1.0, true).unwrap();
        let b = HessianField::compute(&v, 1.0, true).unwrap();
        assert_eq!(a.xx.as_slice(), b.xx.as_slice());
        assert_eq!(a.xy.as_slice(), b.xy.as_slice());
        assert_eq!(a.yz.as_slice(), b.yz.as_slice());
        assert_eq!(a.zz.as_slice(), b.zz.as_slice());
    }
}
