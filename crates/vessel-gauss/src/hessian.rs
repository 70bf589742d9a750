// crates/vessel-gauss/src/hessian.rs

//! Gaussian second partials and the per-scale Hessian field.
//!
//! Each of the six second partials of `V * G_sigma` is realized by three
//! separable 1D passes, one per axis, whose derivative orders sum to the
//! target mixed partial. All six share the same filter family and boundary
//! policy, so the assembled tensors are symmetric by construction.

use crate::axis::{filter_axis, Axis};
use crate::recursive::{DerivativeOrder, RecursiveGaussian};
use vessel_core::{Result, ScalarVolume, VesselError};
use vessel_eigen::SymmetricTensor3;

fn order_of(n: u8) -> DerivativeOrder {
    match n {
        0 => DerivativeOrder::Zero,
        1 => DerivativeOrder::One,
        _ => DerivativeOrder::Two,
    }
}

/// Gaussian derivative of `vol` at scale `sigma` with per-axis derivative
/// orders `(ox, oy, oz)` (each 0..=2).
///
/// Derivatives are taken with respect to physical coordinates; `spacing`
/// feeds both the per-axis sample scale and the derivative gain.
///
/// # Errors
/// Returns [`VesselError::InvalidParameter`] for an invalid `sigma` or an
/// order above 2.
pub fn gaussian_derivative(
    vol: &ScalarVolume,
    sigma: f64,
    orders: (u8, u8, u8),
) -> Result<ScalarVolume> {
    if orders.0 > 2 || orders.1 > 2 || orders.2 > 2 {
        return Err(VesselError::invalid(format!(
            "derivative orders must each be 0..=2, got {orders:?}"
        )));
    }
    let (sx, sy, sz) = vol.spacing();
    let fx = RecursiveGaussian::new(sigma, sx, order_of(orders.0))?;
    let fy = RecursiveGaussian::new(sigma, sy, order_of(orders.1))?;
    let fz = RecursiveGaussian::new(sigma, sz, order_of(orders.2))?;

    let mut out = vol.clone();
    filter_axis(&mut out, Axis::X, &fx);
    filter_axis(&mut out, Axis::Y, &fy);
    filter_axis(&mut out, Axis::Z, &fz);
    Ok(out)
}

/// Isotropic Gaussian smoothing at scale `sigma`.
///
/// # Errors
/// Returns [`VesselError::InvalidParameter`] for an invalid `sigma`.
pub fn smooth(vol: &ScalarVolume, sigma: f64) -> Result<ScalarVolume> {
    gaussian_derivative(vol, sigma, (0, 0, 0))
}

/// The six second partials of `V * G_sigma`, assembled per scale.
#[derive(Clone, Debug)]
pub struct HessianField {
    /// d2/dx2.
    pub xx: ScalarVolume,
    /// d2/dxdy.
    pub xy: ScalarVolume,
    /// d2/dxdz.
    pub xz: ScalarVolume,
    /// d2/dy2.
    pub yy: ScalarVolume,
    /// d2/dydz.
    pub yz: ScalarVolume,
    /// d2/dz2.
    pub zz: ScalarVolume,
    sigma: f64,
}

impl HessianField {
    /// Compute the Hessian of `vol` at `sigma`. With `scale_normalized`,
    /// every component is multiplied by `sigma^2` (gamma = 1) so responses
    /// at different scales are comparable.
    ///
    /// # Errors
    /// Returns [`VesselError::InvalidParameter`] for an invalid `sigma`.
    pub fn compute(vol: &ScalarVolume, sigma: f64, scale_normalized: bool) -> Result<Self> {
        let mut xx = gaussian_derivative(vol, sigma, (2, 0, 0))?;
        let mut yy = gaussian_derivative(vol, sigma, (0, 2, 0))?;
        let mut zz = gaussian_derivative(vol, sigma, (0, 0, 2))?;
        let mut xy = gaussian_derivative(vol, sigma, (1, 1, 0))?;
        let mut xz = gaussian_derivative(vol, sigma, (1, 0, 1))?;
        let mut yz = gaussian_derivative(vol, sigma, (0, 1, 1))?;

        if scale_normalized {
            let s2 = sigma * sigma;
            for v in [&mut xx, &mut yy, &mut zz, &mut xy, &mut xz, &mut yz] {
                for x in v.as_mut_slice() {
                    *x *= s2;
                }
            }
        }

        Ok(Self {
            xx,
            xy,
            xz,
            yy,
            yz,
            zz,
            sigma,
        })
    }

    /// Grid shape.
    #[must_use]
    pub fn dim(&self) -> (usize, usize, usize) {
        self.xx.dim()
    }

    /// Total number of voxels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.xx.len()
    }

    /// Whether the field holds no voxels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.xx.is_empty()
    }

    /// Scale this field was computed at.
    #[must_use]
    pub const fn sigma(&self) -> f64 {
        self.sigma
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

#[cfg(test)]
mod tests {
    use super::*;
    use vessel_core::phantom;

    #[test]
    fn hessian_of_constant_is_zero() {
        let v = phantom::constant((10, 10, 10), (1.0, 1.0, 1.0), 5.0).unwrap();
        let h = HessianField::compute(&v, 1.5, true).unwrap();
        for off in 0..h.len() {
            let t = h.tensor_at(off);
            assert!(t.frobenius_norm() < 1e-7, "{t:?}");
        }
    }

    #[test]
    fn hessian_of_gaussian_blob_matches_analytic_at_center() {
        // f = exp(-r^2 / (2 a^2)); the Hessian of G_s * f at the center is
        // -(a/w)^3 / w^2 * I with w^2 = a^2 + s^2 (per axis separable).
        let a = 2.0f64;
        let s = 1.5f64;
        let n = 33usize;
        let c = n / 2;
        let mut v = ScalarVolume::zeros((n, n, n), (1.0, 1.0, 1.0)).unwrap();
        for ((i, j, k), _) in v.clone().indexed_iter() {
            let d2 = [i, j, k]
                .iter()
                .map(|&q| {
                    let d = q as f64 - c as f64;
                    d * d
                })
                .sum::<f64>();
            v.set(i, j, k, (-d2 / (2.0 * a * a)).exp());
        }

        let h = HessianField::compute(&v, s, false).unwrap();
        let t = h.tensor_at(v.offset(c, c, c));

        let w2 = a * a + s * s;
        let amp = (a * a / w2).powf(1.5);
        let expected = -amp / w2;
        for (name, got) in [("xx", t.xx), ("yy", t.yy), ("zz", t.zz)] {
            assert!(
                (got - expected).abs() < 6e-2 * expected.abs(),
                "{name}: {got} vs {expected}"
            );
        }
        // Mixed partials vanish at the symmetric center.
        for (name, got) in [("xy", t.xy), ("xz", t.xz), ("yz", t.yz)] {
            assert!(got.abs() < 1e-2 * expected.abs(), "{name}: {got}");
        }
    }

    #[test]
    fn scale_normalization_multiplies_by_sigma_squared() {
        let v = phantom::impulse((15, 15, 15), (1.0, 1.0, 1.0), (7, 7, 7)).unwrap();
        let sigma = 2.0;
        let plain = HessianField::compute(&v, sigma, false).unwrap();
        let normed = HessianField::compute(&v, sigma, true).unwrap();
        let off = v.offset(7, 7, 7);
        let (p, q) = (plain.tensor_at(off), normed.tensor_at(off));
        assert!((q.xx - sigma * sigma * p.xx).abs() < 1e-12);
        assert!((q.zz - sigma * sigma * p.zz).abs() < 1e-12);
    }

    #[test]
    fn anisotropic_spacing_keeps_physical_isotropy() {
        // An isotropic physical Gaussian sampled on an anisotropic grid must
        // still produce (approximately) equal diagonal curvatures.
        let a = 3.0f64;
        let s = 1.5f64;
        let spacing = (0.5, 1.0, 2.0);
        let dim = (49, 25, 13);
        let center = (24usize, 12usize, 6usize);
        let mut v = ScalarVolume::zeros(dim, spacing).unwrap();
        for ((i, j, k), _) in v.clone().indexed_iter() {
            let dx = (i as f64 - center.0 as f64) * spacing.0;
            let dy = (j as f64 - center.1 as f64) * spacing.1;
            let dz = (k as f64 - center.2 as f64) * spacing.2;
            let r2 = dx * dx + dy * dy + dz * dz;
            v.set(i, j, k, (-r2 / (2.0 * a * a)).exp());
        }

        let h = HessianField::compute(&v, s, false).unwrap();
        let t = h.tensor_at(v.offset(center.0, center.1, center.2));
        let w2 = a * a + s * s;
        let expected = -(a * a / w2).powf(1.5) / w2;
        for (name, got) in [("xx", t.xx), ("yy", t.yy), ("zz", t.zz)] {
            assert!(
                (got - expected).abs() < 0.15 * expected.abs(),
                "{name}: {got} vs {expected}"
            );
        }
    }
}
