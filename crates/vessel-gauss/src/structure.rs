// crates/vessel-gauss/src/structure.rs

//! Structure tensor: smoothed outer product of first derivatives.
//!
//! `S_rho(V, sigma) = G_rho * (grad_sigma V)(grad_sigma V)^T`. The gradient
//! is taken at the inner scale `sigma`; each of the six products is then
//! smoothed at the outer scale `rho`.

use crate::hessian::gaussian_derivative;
use crate::smooth;
use vessel_core::{Result, ScalarVolume};
use vessel_eigen::SymmetricTensor3;

/// The six components of the smoothed gradient outer product.
#[derive(Clone, Debug)]
pub struct StructureTensorField {
    /// gx * gx, smoothed.
    pub xx: ScalarVolume,
    /// gx * gy, smoothed.
    pub xy: ScalarVolume,
    /// gx * gz, smoothed.
    pub xz: ScalarVolume,
    /// gy * gy, smoothed.
    pub yy: ScalarVolume,
    /// gy * gz, smoothed.
    pub yz: ScalarVolume,
    /// gz * gz, smoothed.
    pub zz: ScalarVolume,
}

impl StructureTensorField {
    /// Compute the structure tensor with gradient scale `sigma` and outer
    /// smoothing scale `rho`.
    ///
    /// # Errors
    /// Returns [`vessel_core::VesselError::InvalidParameter`] for invalid
    /// scales.
    pub fn compute(vol: &ScalarVolume, sigma: f64, rho: f64) -> Result<Self> {
        let gx = gaussian_derivative(vol, sigma, (1, 0, 0))?;
        let gy = gaussian_derivative(vol, sigma, (0, 1, 0))?;
        let gz = gaussian_derivative(vol, sigma, (0, 0, 1))?;

        let product = |a: &ScalarVolume, b: &ScalarVolume| -> Result<ScalarVolume> {
            let mut p = a.like();
            for ((o, &x), &y) in p
                .as_mut_slice()
                .iter_mut()
                .zip(a.as_slice())
                .zip(b.as_slice())
            {
                *o = x * y;
            }
            smooth(&p, rho)
        };

        Ok(Self {
            xx: product(&gx, &gx)?,
            xy: product(&gx, &gy)?,
            xz: product(&gx, &gz)?,
            yy: product(&gy, &gy)?,
            yz: product(&gy, &gz)?,
            zz: product(&gz, &gz)?,
        })
    }

    /// Symmetric tensor at a linear offset.
    #[inline]
    #[must_use]
    pub fn tensor_at(&self, offset: usize) -> SymmetricTensor3 {
        SymmetricTensor3::new(
            self.xx.as_slice()[offset],
            self.xy.as_slice()[offset],
            self.xz.as_slice()[offset],
            self.yy.as_slice()[offset],
            self.yz.as_slice()[offset],
            self.zz.as_slice()[offset],
        )
    }
}
