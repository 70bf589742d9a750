// crates/vessel-core/src/volume.rs

//! Dense 3D scalar and mask volumes.
//!
//! Storage is row-major with `x` fastest: `index(i, j, k) = i + nx*(j + ny*k)`.
//! `spacing` is the physical voxel size per axis and must be strictly
//! positive. Values are `f64` internally; casting to narrower pixel types is
//! the I/O layer's job.

use crate::error::{Result, VesselError};
use serde::{Deserialize, Serialize};

/// Grid shape `(nx, ny, nz)`.
pub type Dim = (usize, usize, usize);

/// Physical voxel size `(sx, sy, sz)`, strictly positive.
pub type Spacing = (f64, f64, f64);

/// Dense 3D scalar volume with spacing metadata.
///
/// **Invariants**
/// - `data.len() == nx * ny * nz`
/// - every spacing component is finite and `> 0`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScalarVolume {
    dim: Dim,
    spacing: Spacing,
    data: Vec<f64>,
}

impl ScalarVolume {
    /// Allocate a volume filled with `value`.
    ///
    /// # Errors
    /// Returns [`VesselError::InvalidParameter`] if any spacing component is
    /// non-finite or not strictly positive.
    pub fn filled(dim: Dim, spacing: Spacing, value: f64) -> Result<Self> {
        validate_spacing(spacing)?;
        let n = dim.0 * dim.1 * dim.2;
        Ok(Self {
            dim,
            spacing,
            data: vec![value; n],
        })
    }

    /// Allocate a zero-filled volume.
    ///
    /// # Errors
    /// Same conditions as [`ScalarVolume::filled`].
    pub fn zeros(dim: Dim, spacing: Spacing) -> Result<Self> {
        Self::filled(dim, spacing, 0.0)
    }

    /// Build a volume from raw samples.
    ///
    /// # Errors
    /// Returns [`VesselError::InvalidParameter`] if the sample count does not
    /// equal `nx*ny*nz` or the spacing is degenerate.
    pub fn from_vec(dim: Dim, spacing: Spacing, data: Vec<f64>) -> Result<Self> {
        validate_spacing(spacing)?;
        let n = dim.0 * dim.1 * dim.2;
        if data.len() != n {
            return Err(VesselError::invalid(format!(
                "sample count {} does not match dim {:?} ({} expected)",
                data.len(),
                dim,
                n
            )));
        }
        Ok(Self { dim, spacing, data })
    }

    /// Zero-filled volume on the same grid as `self`.
    #[must_use]
    pub fn like(&self) -> Self {
        Self {
            dim: self.dim,
            spacing: self.spacing,
            data: vec![0.0; self.data.len()],
        }
    }

    /// Grid shape.
    #[inline]
    #[must_use]
    pub const fn dim(&self) -> Dim {
        self.dim
    }

    /// Physical voxel size.
    #[inline]
    #[must_use]
    pub const fn spacing(&self) -> Spacing {
        self.spacing
    }

    /// Total number of voxels.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the volume holds no voxels.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Linear offset of `(i, j, k)`. Callers must pass a valid index.
    #[inline]
    #[must_use]
    pub const fn offset(&self, i: usize, j: usize, k: usize) -> usize {
        i + self.dim.0 * (j + self.dim.1 * k)
    }

    /// Value at `(i, j, k)`.
    ///
    /// # Panics
    /// Panics if the index is out of bounds.
    #[inline]
    #[must_use]
    pub fn get(&self, i: usize, j: usize, k: usize) -> f64 {
        self.data[self.offset(i, j, k)]
    }

    /// Write `value` at `(i, j, k)`.
    ///
    /// # Panics
    /// Panics if the index is out of bounds.
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, k: usize, value: f64) {
        let o = self.offset(i, j, k);
        self.data[o] = value;
    }

    /// Flat read-only view of the samples.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Flat mutable view of the samples.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Consume the volume, returning the raw samples.
    #[inline]
    #[must_use]
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Iterate `((i, j, k), value)` in storage order.
    pub fn indexed_iter(&self) -> impl Iterator<Item = ((usize, usize, usize), f64)> + '_ {
        let (nx, ny, _) = self.dim;
        self.data.iter().enumerate().map(move |(o, &v)| {
            let i = o % nx;
            let j = (o / nx) % ny;
            let k = o / (nx * ny);
            ((i, j, k), v)
        })
    }

    /// Index of the maximum sample (first occurrence), or `None` when empty.
    #[must_use]
    pub fn argmax(&self) -> Option<(usize, usize, usize)> {
        let (mut best, mut best_off) = (f64::NEG_INFINITY, None);
        for (o, &v) in self.data.iter().enumerate() {
            if v > best {
                best = v;
                best_off = Some(o);
            }
        }
        best_off.map(|o| {
            let (nx, ny, _) = self.dim;
            (o % nx, (o / nx) % ny, o / (nx * ny))
        })
    }

    /// Check that `other` lives on the same grid.
    ///
    /// # Errors
    /// Returns [`VesselError::ShapeMismatch`] when the shapes differ.
    pub fn check_same_shape(&self, other_dim: Dim) -> Result<()> {
        if self.dim == other_dim {
            Ok(())
        } else {
            Err(VesselError::ShapeMismatch {
                expected: self.dim,
                found: other_dim,
            })
        }
    }
}

/// Dense 3D binary mask (values 0/1) on the same grid model as
/// [`ScalarVolume`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MaskVolume {
    dim: Dim,
    data: Vec<u8>,
}

impl MaskVolume {
    /// Allocate a mask filled with `value` (clamped to 0/1).
    #[must_use]
    pub fn filled(dim: Dim, value: u8) -> Self {
        let n = dim.0 * dim.1 * dim.2;
        Self {
            dim,
            data: vec![u8::from(value != 0); n],
        }
    }

    /// Zero-filled mask.
    #[must_use]
    pub fn zeros(dim: Dim) -> Self {
        Self::filled(dim, 0)
    }

    /// Build a mask from raw samples; any non-zero sample becomes 1.
    ///
    /// # Errors
    /// Returns [`VesselError::InvalidParameter`] on a sample-count mismatch.
    pub fn from_vec(dim: Dim, data: Vec<u8>) -> Result<Self> {
        let n = dim.0 * dim.1 * dim.2;
        if data.len() != n {
            return Err(VesselError::invalid(format!(
                "mask sample count {} does not match dim {:?}",
                data.len(),
                dim
            )));
        }
        Ok(Self {
            dim,
            data: data.into_iter().map(|v| u8::from(v != 0)).collect(),
        })
    }

    /// Grid shape.
    #[inline]
    #[must_use]
    pub const fn dim(&self) -> Dim {
        self.dim
    }

    /// Total number of voxels.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the mask holds no voxels.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Linear offset of `(i, j, k)`.
    #[inline]
    #[must_use]
    pub const fn offset(&self, i: usize, j: usize, k: usize) -> usize {
        i + self.dim.0 * (j + self.dim.1 * k)
    }

    /// Whether the voxel at `(i, j, k)` is inside the mask.
    #[inline]
    #[must_use]
    pub fn is_set(&self, i: usize, j: usize, k: usize) -> bool {
        self.data[self.offset(i, j, k)] != 0
    }

    /// Write 0/1 at `(i, j, k)`.
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, k: usize, value: bool) {
        let o = self.offset(i, j, k);
        self.data[o] = u8::from(value);
    }

    /// Flat read-only view.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Flat mutable view.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Number of voxels set to 1.
    #[must_use]
    pub fn count_set(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }
}

fn validate_spacing(spacing: Spacing) -> Result<()> {
    let components = [spacing.0, spacing.1, spacing.2];
    if components.iter().any(|s| !s.is_finite() || *s <= 0.0) {
        return Err(VesselError::invalid(format!(
            "spacing must be finite and strictly positive, got {spacing:?}"
        )));
    }
    Ok(())
}
