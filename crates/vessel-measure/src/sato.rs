// crates/vessel-measure/src/sato.rs

//! Sato-style line measure.
//!
//! Works on value-ascending eigenvalues `(l0, l1, l2)`. For a bright tube
//! `l0` and `l1` are both strongly negative and `l2` is near zero, so
//! `nv = min(-l1, -l0)` is positive inside the plate/line cone. The
//! remaining eigenvalue `l2` is penalized asymmetrically: `alpha1` on the
//! negative side, `alpha2` on the positive side, so sign changes are
//! attenuated more gently there.

use crate::{is_finite3, magnitude_ascending};
use vessel_core::SatoEmphasis;

/// Sato line response.
///
/// Returns 0 outside the plate/line cone (`nv <= 0`), on non-finite input,
/// or for non-positive `alpha1`/`alpha2` (the pipeline validates these up
/// front; this keeps the function total).
#[must_use]
pub fn sato_response(value_asc: [f64; 3], alpha1: f64, alpha2: f64, emphasis: SatoEmphasis) -> f64 {
    if !is_finite3(value_asc) || alpha1 <= 0.0 || alpha2 <= 0.0 {
        return 0.0;
    }
    let [l0, l1, l2] = value_asc;

    // nv <= 0 outside bright line structures.
    let nv = (-l1).min(-l0);
    if nv <= 0.0 {
        return 0.0;
    }

    match emphasis {
        SatoEmphasis::Line => {
            let alpha = if l2 <= 0.0 { alpha1 } else { alpha2 };
            let ratio = l2 / (alpha * nv);
            let line = (-0.5 * ratio * ratio).exp();
            line * nv
        }
        SatoEmphasis::Contrast => {
            let [m0, m1, m2] = magnitude_ascending(value_asc);
            m0.abs() * (m2.abs() - m1.abs())
        }
    }
}
