// crates/vessel-measure/src/fa.rs

//! Fractional-anisotropy response and orientation similarity.
//!
//! FA is the normalized eigenvalue dispersion
//! `sqrt(3/2) * sqrt(sum (li - mean)^2) / sqrt(sum li^2)`, in [0, 1]. It is
//! permutation-invariant; only the brightness sign gate depends on the
//! (magnitude) ordering.

use crate::{is_finite3, magnitude_ascending};

/// `sqrt(3/2)`, the FA normalization constant.
const K: f64 = 1.224_744_871_39;

/// Fractional anisotropy of an eigenvalue triple, in [0, 1].
///
/// Returns 0 for non-finite input or an all-zero triple.
#[must_use]
pub fn fractional_anisotropy(lambda: [f64; 3]) -> f64 {
    if !is_finite3(lambda) {
        return 0.0;
    }
    let [a, b, c] = lambda;
    let norm2 = c.mul_add(c, b.mul_add(b, a * a));
    if norm2 <= 0.0 {
        return 0.0;
    }
    let mean = (a + b + c) / 3.0;
    let (da, db, dc) = (a - mean, b - mean, c - mean);
    let disp2 = dc.mul_add(dc, db.mul_add(db, da * da));
    (K * (disp2 / norm2).sqrt()).min(1.0)
}

/// FA gated by the bright/dark sign test: in bright mode the two
/// largest-magnitude eigenvalues must be negative (mirrored for dark).
#[must_use]
pub fn fa_response(value_asc: [f64; 3], bright_vessels: bool) -> f64 {
    if !is_finite3(value_asc) {
        return 0.0;
    }
    let [_, m2, m3] = magnitude_ascending(value_asc);
    let sign_ok = if bright_vessels {
        m2 <= 0.0 && m3 < 0.0
    } else {
        m2 >= 0.0 && m3 > 0.0
    };
    if sign_ok {
        fractional_anisotropy(value_asc)
    } else {
        0.0
    }
}

/// Absolute cosine of the angle between two (unit) principal directions.
///
/// Returns 0 when either vector is non-finite, so degenerate voxels never
/// contribute to the similarity map.
#[must_use]
pub fn orientation_similarity(e1: [f64; 3], e2: [f64; 3]) -> f64 {
    let dot = e1[2].mul_add(e2[2], e1[1].mul_add(e2[1], e1[0] * e2[0]));
    if dot.is_finite() {
        dot.abs().min(1.0)
    } else {
        0.0
    }
}
