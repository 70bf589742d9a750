//! Symmetric 3x3 tensors and their eigendecomposition.
//!
//! - [`SymmetricTensor3`]: six-component symmetric tensor (xx, xy, xz, yy, yz, zz).
//! - [`decompose`]: closed-form eigenvalues (trace/deviator reduction) plus
//!   optional orthonormal eigenvectors, under a selectable ordering policy.
//! - [`EigenOrdering`]: value-ascending or magnitude-ascending, with ties
//!   broken by original index order.
//!
//! The solver never fails: non-finite inputs yield zero eigenvalues, an
//! identity eigenvector matrix, and a `degenerate` flag the caller can count.
//! This crate is intentionally small and self-contained.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::doc_markdown
)]

pub mod solver;
pub use solver::{decompose, eigenvalues, EigenDecomposition};

use serde::{Deserialize, Serialize};

/// Eigenvalue ordering policy.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EigenOrdering {
    /// `l1 <= l2 <= l3`.
    ByValueAsc,
    /// `|l1| <= |l2| <= |l3|`.
    #[default]
    ByMagnitudeAsc,
}

/// Symmetric 3x3 tensor stored as six components.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SymmetricTensor3 {
    /// d2/dx2 component.
    pub xx: f64,
    /// d2/dxdy component.
    pub xy: f64,
    /// d2/dxdz component.
    pub xz: f64,
    /// d2/dy2 component.
    pub yy: f64,
    /// d2/dydz component.
    pub yz: f64,
    /// d2/dz2 component.
    pub zz: f64,
}

impl SymmetricTensor3 {
    /// Construct from the six independent components.
    #[inline]
    #[must_use]
    pub const fn new(xx: f64, xy: f64, xz: f64, yy: f64, yz: f64, zz: f64) -> Self {
        Self {
            xx,
            xy,
            xz,
            yy,
            yz,
            zz,
        }
    }

    /// Diagonal tensor.
    #[inline]
    #[must_use]
    pub const fn diagonal(xx: f64, yy: f64, zz: f64) -> Self {
        Self::new(xx, 0.0, 0.0, yy, 0.0, zz)
    }

    /// All components zero.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0)
    }

    /// Whether every component is finite.
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.xx.is_finite()
            && self.xy.is_finite()
            && self.xz.is_finite()
            && self.yy.is_finite()
            && self.yz.is_finite()
            && self.zz.is_finite()
    }

    /// Trace.
    #[inline]
    #[must_use]
    pub fn trace(&self) -> f64 {
        self.xx + self.yy + self.zz
    }

    /// Frobenius norm (off-diagonals counted twice).
    #[inline]
    #[must_use]
    pub fn frobenius_norm(&self) -> f64 {
        let d = self.xx * self.xx + self.yy * self.yy + self.zz * self.zz;
        let o = self.xy * self.xy + self.xz * self.xz + self.yz * self.yz;
        2.0f64.mul_add(o, d).sqrt()
    }

    /// Matrix-vector product `T v`.
    #[inline]
    #[must_use]
    pub fn mul_vec(&self, v: [f64; 3]) -> [f64; 3] {
        [
            self.xx * v[0] + self.xy * v[1] + self.xz * v[2],
            self.xy * v[0] + self.yy * v[1] + self.yz * v[2],
            self.xz * v[0] + self.yz * v[1] + self.zz * v[2],
        ]
    }
}

/// Stable permutation of `[0, 1, 2]` ordering `values` under `policy`.
/// Equal keys keep their original index order.
#[must_use]
pub fn sort_indices(values: [f64; 3], policy: EigenOrdering) -> [usize; 3] {
    let key = |i: usize| match policy {
        EigenOrdering::ByValueAsc => values[i],
        EigenOrdering::ByMagnitudeAsc => values[i].abs(),
    };
    let mut idx = [0usize, 1, 2];
    // Three elements: a stable insertion sort written out.
    if key(idx[1]) < key(idx[0]) {
        idx.swap(0, 1);
    }
    if key(idx[2]) < key(idx[1]) {
        idx.swap(1, 2);
        if key(idx[1]) < key(idx[0]) {
            idx.swap(0, 1);
        }
    }
    idx
}

/// Reorder a value-triple under `policy`.
#[must_use]
pub fn reorder(values: [f64; 3], policy: EigenOrdering) -> [f64; 3] {
    let idx = sort_indices(values, policy);
    [values[idx[0]], values[idx[1]], values[idx[2]]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_indices_by_value_is_ascending() {
        assert_eq!(sort_indices([3.0, 1.0, 2.0], EigenOrdering::ByValueAsc), [1, 2, 0]);
    }

    #[test]
    fn sort_indices_by_magnitude_ignores_sign() {
        assert_eq!(
            sort_indices([-5.0, 1.0, -2.0], EigenOrdering::ByMagnitudeAsc),
            [1, 2, 0]
        );
    }

    #[test]
    fn ties_keep_original_index_order() {
        // |-2| == |2|: index 0 must stay ahead of index 2.
        assert_eq!(
            sort_indices([-2.0, 1.0, 2.0], EigenOrdering::ByMagnitudeAsc),
            [1, 0, 2]
        );
    }

    #[test]
    fn mul_vec_matches_matrix_form() {
        let t = SymmetricTensor3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        assert_eq!(t.mul_vec([1.0, 0.0, 0.0]), [1.0, 2.0, 3.0]);
        assert_eq!(t.mul_vec([0.0, 1.0, 0.0]), [2.0, 4.0, 5.0]);
        assert_eq!(t.mul_vec([0.0, 0.0, 1.0]), [3.0, 5.0, 6.0]);
    }
}
