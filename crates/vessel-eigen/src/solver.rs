// crates/vessel-eigen/src/solver.rs

//! Closed-form eigendecomposition of symmetric 3x3 tensors.
//!
//! Eigenvalues come from the trace/deviator reduction: with
//! `p1 = xy^2 + xz^2 + yz^2`, `q = tr(T)/3`,
//! `p = sqrt((sum (Tii - q)^2 + 2 p1) / 6)` and `B = (T - qI)/p`,
//! the angle `phi = acos(det(B)/2) / 3` (argument clamped to [-1, 1])
//! gives `l_max = q + 2p cos(phi)`, `l_min = q + 2p cos(phi + 2pi/3)`,
//! and the middle one from the trace. When the off-diagonal energy is
//! negligible the diagonal entries are returned directly.
//!
//! Eigenvectors are extracted as the largest cross product of rows of
//! `T - lI`, with a Gram-Schmidt fallback for (near-)repeated eigenvalues.

use crate::{sort_indices, EigenOrdering, SymmetricTensor3};

const TWO_PI_OVER_3: f64 = 2.0 * std::f64::consts::PI / 3.0;

/// Result of [`decompose`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EigenDecomposition {
    /// Eigenvalues, ordered by the requested policy.
    pub values: [f64; 3],
    /// Orthonormal eigenvectors; `vectors[c]` is the column paired with
    /// `values[c]`. `None` unless requested.
    pub vectors: Option<[[f64; 3]; 3]>,
    /// Set when the input was non-finite and the result is the zero/identity
    /// fallback.
    pub degenerate: bool,
}

/// Eigenvalues only, in **value-ascending** order.
///
/// Non-finite input yields `[0.0; 3]` (callers detect it via
/// [`SymmetricTensor3::is_finite`] or [`decompose`]).
#[must_use]
pub fn eigenvalues(t: &SymmetricTensor3) -> [f64; 3] {
    if !t.is_finite() {
        return [0.0; 3];
    }

    let p1 = t.xy * t.xy + t.xz * t.xz + t.yz * t.yz;
    let diag_scale = t.xx * t.xx + t.yy * t.yy + t.zz * t.zz;

    // Effectively diagonal: return the diagonal entries sorted.
    if p1 <= diag_scale * 1.0e-24 || (p1 == 0.0 && diag_scale == 0.0) {
        let mut d = [t.xx, t.yy, t.zz];
        d.sort_by(f64::total_cmp);
        return d;
    }

    let q = t.trace() / 3.0;
    let dxx = t.xx - q;
    let dyy = t.yy - q;
    let dzz = t.zz - q;
    let p2 = 2.0f64.mul_add(p1, dxx * dxx + dyy * dyy + dzz * dzz);
    let p = (p2 / 6.0).sqrt();

    if p == 0.0 {
        // Isotropic tensor.
        return [q, q, q];
    }

    let inv_p = 1.0 / p;
    let b = SymmetricTensor3::new(
        dxx * inv_p,
        t.xy * inv_p,
        t.xz * inv_p,
        dyy * inv_p,
        t.yz * inv_p,
        dzz * inv_p,
    );
    let r = (det(&b) / 2.0).clamp(-1.0, 1.0);
    let phi = r.acos() / 3.0;

    let hi = 2.0f64.mul_add(p * phi.cos(), q);
    let lo = 2.0f64.mul_add(p * (phi + TWO_PI_OVER_3).cos(), q);
    let mid = 3.0f64.mul_add(q, -hi - lo);
    [lo, mid, hi]
}

/// Full eigendecomposition under `ordering`; eigenvectors are computed only
/// when `with_vectors` is set.
///
/// Non-finite input yields zero eigenvalues, an identity eigenvector matrix,
/// and `degenerate = true`. The call never panics and never errors.
#[must_use]
pub fn decompose(
    t: &SymmetricTensor3,
    ordering: EigenOrdering,
    with_vectors: bool,
) -> EigenDecomposition {
    if !t.is_finite() {
        return EigenDecomposition {
            values: [0.0; 3],
            vectors: with_vectors.then_some(IDENTITY),
            degenerate: true,
        };
    }

    let ascending = eigenvalues(t);
    let columns = with_vectors.then(|| eigenvectors_for(t, ascending));

    let idx = sort_indices(ascending, ordering);
    EigenDecomposition {
        values: [ascending[idx[0]], ascending[idx[1]], ascending[idx[2]]],
        vectors: columns.map(|c| [c[idx[0]], c[idx[1]], c[idx[2]]]),
        degenerate: false,
    }
}

const IDENTITY: [[f64; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Orthonormal eigenvectors paired with value-ascending eigenvalues.
fn eigenvectors_for(t: &SymmetricTensor3, ascending: [f64; 3]) -> [[f64; 3]; 3] {
    let spread = ascending[2] - ascending[0];
    if spread == 0.0 {
        // Isotropic: every basis is an eigenbasis.
        return IDENTITY;
    }

    let v_lo = null_vector(t, ascending[0]);
    let v_hi = null_vector(t, ascending[2]);

    match (v_lo, v_hi) {
        (Some(a), Some(c)) => {
            // Re-orthogonalize the second extraction against the first; the
            // middle eigenvector completes the frame.
            let c = match orthogonalize(c, a) {
                Some(c) => c,
                None => any_orthogonal(a),
            };
            let b = cross(c, a);
            [a, b, c]
        }
        (Some(a), None) => {
            let c = any_orthogonal(a);
            let b = cross(c, a);
            [a, b, c]
        }
        (None, Some(c)) => {
            let a = any_orthogonal(c);
            let b = cross(c, a);
            [a, b, c]
        }
        (None, None) => IDENTITY,
    }
}

/// Unit vector spanning the (one-dimensional) null space of `T - lI`,
/// or `None` when the eigenvalue is repeated and the rows are collinear.
fn null_vector(t: &SymmetricTensor3, lambda: f64) -> Option<[f64; 3]> {
    let r0 = [t.xx - lambda, t.xy, t.xz];
    let r1 = [t.xy, t.yy - lambda, t.yz];
    let r2 = [t.xz, t.yz, t.zz - lambda];

    let candidates = [cross(r0, r1), cross(r0, r2), cross(r1, r2)];
    let mut best = candidates[0];
    let mut best_n2 = norm2(best);
    for c in &candidates[1..] {
        let n2 = norm2(*c);
        if n2 > best_n2 {
            best = *c;
            best_n2 = n2;
        }
    }

    // Relative threshold against the row magnitudes.
    let row_scale = norm2(r0).max(norm2(r1)).max(norm2(r2));
    if best_n2 <= row_scale * row_scale * 1.0e-24 {
        return None;
    }
    let inv = best_n2.sqrt().recip();
    Some([best[0] * inv, best[1] * inv, best[2] * inv])
}

fn orthogonalize(v: [f64; 3], against: [f64; 3]) -> Option<[f64; 3]> {
    let d = dot(v, against);
    let w = [
        v[0] - d * against[0],
        v[1] - d * against[1],
        v[2] - d * against[2],
    ];
    let n2 = norm2(w);
    if n2 <= 1.0e-24 {
        return None;
    }
    let inv = n2.sqrt().recip();
    Some([w[0] * inv, w[1] * inv, w[2] * inv])
}

/// Any unit vector orthogonal to `v` (assumed unit).
fn any_orthogonal(v: [f64; 3]) -> [f64; 3] {
    let pick = if v[0].abs() <= v[1].abs() && v[0].abs() <= v[2].abs() {
        [1.0, 0.0, 0.0]
    } else if v[1].abs() <= v[2].abs() {
        [0.0, 1.0, 0.0]
    } else {
        [0.0, 0.0, 1.0]
    };
    let c = cross(v, pick);
    let inv = norm2(c).sqrt().recip();
    [c[0] * inv, c[1] * inv, c[2] * inv]
}

#[inline]
fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
fn norm2(a: [f64; 3]) -> f64 {
    dot(a, a)
}

fn det(t: &SymmetricTensor3) -> f64 {
    t.xx * (t.yy * t.zz - t.yz * t.yz) - t.xy * (t.xy * t.zz - t.yz * t.xz)
        + t.xz * (t.xy * t.yz - t.yy * t.xz)
}
