// crates/vessel-measure/src/frangi.rs

//! Frangi-style RA/RB/S response.
//!
//! The discriminators use magnitude-ascending eigenvalues `(m1, m2, m3)`,
//! `|m1| <= |m2| <= |m3|`:
//!
//! - `RA = |m2| / |m3|` separates plates from lines,
//! - `RB = |m1| / sqrt(|m2 m3|)` separates blobs from lines,
//! - `S  = sqrt(m1^2 + m2^2 + m3^2)` separates structure from background.
//!
//! Bright structures require `m2 < 0` and `m3 < 0`; dark structures the
//! mirror image.

use crate::{is_finite3, magnitude_ascending};
use vessel_core::VesselnessParams;

/// Frangi vesselness.
///
/// Reads `alpha`, `beta`, `gamma`, `bright_vessels`, and
/// `scale_vesselness_measure` (multiply by `|m3|`) from `params`. Returns 0
/// on non-finite input, a failed sign test, or a structureless voxel.
#[must_use]
pub fn frangi_response(value_asc: [f64; 3], params: &VesselnessParams) -> f64 {
    if !is_finite3(value_asc) {
        return 0.0;
    }
    let [m1, m2, m3] = magnitude_ascending(value_asc);

    if params.bright_vessels {
        if m2 > 0.0 || m3 > 0.0 {
            return 0.0;
        }
    } else if m2 < 0.0 || m3 < 0.0 {
        return 0.0;
    }
    if m3 == 0.0 {
        // No second-order structure at all.
        return 0.0;
    }

    let ra2 = (m2 * m2) / (m3 * m3);
    let prod = (m2 * m3).abs();
    if prod == 0.0 {
        return 0.0;
    }
    let rb2 = (m1 * m1) / prod;
    let s2 = m3.mul_add(m3, m2.mul_add(m2, m1 * m1));

    let (a, b, g) = (params.alpha, params.beta, params.gamma);
    if a <= 0.0 || b <= 0.0 || g <= 0.0 {
        return 0.0;
    }

    let v = (1.0 - (-ra2 / (2.0 * a * a)).exp())
        * (-rb2 / (2.0 * b * b)).exp()
        * (1.0 - (-s2 / (2.0 * g * g)).exp());

    if params.scale_vesselness_measure {
        v * m3.abs()
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frangi_params() -> VesselnessParams {
        VesselnessParams {
            response_family: vessel_core::ResponseFamily::Frangi,
            alpha: 0.5,
            beta: 0.5,
            gamma: 5.0,
            ..VesselnessParams::default()
        }
    }

    #[test]
    fn bright_tube_beats_plate_and_blob() {
        let p = frangi_params();
        let tube = frangi_response([-10.0, -9.0, -0.1], &p);
        let plate = frangi_response([-10.0, -0.2, -0.1], &p);
        let blob = frangi_response([-10.0, -9.5, -9.0], &p);
        assert!(tube > 0.0);
        assert!(tube > plate, "tube {tube} vs plate {plate}");
        assert!(tube > blob, "tube {tube} vs blob {blob}");
    }

    #[test]
    fn sign_test_rejects_dark_structures_in_bright_mode() {
        let p = frangi_params();
        assert_eq!(frangi_response([0.1, 9.0, 10.0], &p), 0.0);
    }

    #[test]
    fn dark_mode_mirrors_the_sign_test() {
        let p = VesselnessParams {
            bright_vessels: false,
            ..frangi_params()
        };
        assert!(frangi_response([0.1, 9.0, 10.0], &p) > 0.0);
        assert_eq!(frangi_response([-10.0, -9.0, -0.1], &p), 0.0);
    }

    #[test]
    fn zero_tensor_gives_zero() {
        assert_eq!(frangi_response([0.0, 0.0, 0.0], &frangi_params()), 0.0);
    }

    #[test]
    fn scale_measure_multiplies_by_largest_magnitude() {
        let base = frangi_params();
        let scaled = VesselnessParams {
            scale_vesselness_measure: true,
            ..base.clone()
        };
        let l = [-10.0, -9.0, -0.1];
        let r0 = frangi_response(l, &base);
        let r1 = frangi_response(l, &scaled);
        assert!((r1 - 10.0 * r0).abs() < 1e-12);
    }

    #[test]
    fn weak_structure_is_suppressed_by_gamma() {
        let p = frangi_params();
        let strong = frangi_response([-10.0, -9.0, -0.1], &p);
        let faint = frangi_response([-0.010, -0.009, -0.0001], &p);
        assert!(faint < 1e-4 * strong.max(1e-300), "faint {faint}");
    }
}
