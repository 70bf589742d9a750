// crates/vessel-pipeline/src/binarize.rs

//! Hysteresis binarization of a vesselness map.
//!
//! Voxels at or above the upper threshold seed a flood that spreads through
//! the 26-connected neighborhood to every voxel at or above the lower
//! threshold. The reachable set is uniquely defined, so the labeling does
//! not depend on propagation order. Non-finite response values never seed
//! and never propagate.

use std::collections::VecDeque;
use vessel_core::{MaskVolume, Result, ScalarVolume, VesselError};

/// Simple thresholding: label 1 where `response >= low`.
#[must_use]
pub fn binarize(response: &ScalarVolume, low: f64) -> MaskVolume {
    let mut mask = MaskVolume::zeros(response.dim());
    for (slot, &v) in mask.as_mut_slice().iter_mut().zip(response.as_slice()) {
        *slot = u8::from(v >= low);
    }
    mask
}

/// Hysteresis thresholding: seed at `response >= high`, grow through
/// 26-connected voxels with `response >= low`.
///
/// With `high == low` this reduces to [`binarize`].
///
/// # Errors
/// Returns [`VesselError::InvalidParameter`] when `high < low` or either
/// threshold is non-finite.
pub fn binarize_hysteresis(response: &ScalarVolume, low: f64, high: f64) -> Result<MaskVolume> {
    if !low.is_finite() || !high.is_finite() {
        return Err(VesselError::invalid(format!(
            "thresholds must be finite, got low {low}, high {high}"
        )));
    }
    if high < low {
        return Err(VesselError::invalid(format!(
            "upper threshold {high} must not be below lower threshold {low}"
        )));
    }

    let (nx, ny, nz) = response.dim();
    let data = response.as_slice();
    let mut mask = MaskVolume::zeros(response.dim());
    let mut queue = VecDeque::new();

    // Seed pass.
    for (off, &v) in data.iter().enumerate() {
        if v >= high {
            mask.as_mut_slice()[off] = 1;
            queue.push_back(off);
        }
    }

    // Flood through the 26-connected neighborhood.
    while let Some(off) = queue.pop_front() {
        let i = off % nx;
        let j = (off / nx) % ny;
        let k = off / (nx * ny);
        for dk in -1i64..=1 {
            for dj in -1i64..=1 {
                for di in -1i64..=1 {
                    if di == 0 && dj == 0 && dk == 0 {
                        continue;
                    }
                    let (ni, nj, nk) = (i as i64 + di, j as i64 + dj, k as i64 + dk);
                    if ni < 0
                        || nj < 0
                        || nk < 0
                        || ni >= nx as i64
                        || nj >= ny as i64
                        || nk >= nz as i64
                    {
                        continue;
                    }
                    let noff = ni as usize + nx * (nj as usize + ny * nk as usize);
                    if mask.as_slice()[noff] == 0 && data[noff] >= low {
                        mask.as_mut_slice()[noff] = 1;
                        queue.push_back(noff);
                    }
                }
            }
        }
    }

    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_volume(values: &[f64]) -> ScalarVolume {
        ScalarVolume::from_vec((values.len(), 1, 1), (1.0, 1.0, 1.0), values.to_vec()).unwrap()
    }

    #[test]
    fn hysteresis_on_the_reference_profile() {
        let r = line_volume(&[5.0, 3.0, 0.0, 0.0, 3.0, 5.0]);
        let m = binarize_hysteresis(&r, 2.0, 4.0).unwrap();
        assert_eq!(m.as_slice(), &[1, 1, 0, 0, 1, 1]);

        let m = binarize_hysteresis(&r, 2.0, 2.0).unwrap();
        assert_eq!(m.as_slice(), &[1, 1, 0, 0, 1, 1]);

        let m = binarize(&r, 4.0);
        assert_eq!(m.as_slice(), &[1, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn weak_region_without_a_seed_stays_off() {
        let r = line_volume(&[3.0, 3.0, 0.0, 3.0, 5.0]);
        let m = binarize_hysteresis(&r, 2.0, 4.0).unwrap();
        assert_eq!(m.as_slice(), &[0, 0, 0, 1, 1]);
    }

    #[test]
    fn diagonal_neighbors_propagate() {
        // Seed at one corner, weak voxel at the opposite corner of a 2^3
        // cube: 26-connectivity reaches it in one hop.
        let mut r = ScalarVolume::zeros((2, 2, 2), (1.0, 1.0, 1.0)).unwrap();
        r.set(0, 0, 0, 10.0);
        r.set(1, 1, 1, 1.0);
        let m = binarize_hysteresis(&r, 0.5, 5.0).unwrap();
        assert!(m.is_set(0, 0, 0));
        assert!(m.is_set(1, 1, 1));
        assert_eq!(m.count_set(), 2);
    }

    #[test]
    fn zero_threshold_supports_positive_voxels() {
        let r = line_volume(&[0.0, 0.25, 0.0, 7.0]);
        // binarize(R, 0) keeps everything >= 0; the support law uses a tiny
        // positive threshold instead.
        let m = binarize(&r, f64::MIN_POSITIVE);
        assert_eq!(m.as_slice(), &[0, 1, 0, 1]);
    }

    #[test]
    fn binarization_is_idempotent() {
        let r = line_volume(&[5.0, 3.0, 0.0, 0.0, 3.0, 5.0]);
        let m = binarize_hysteresis(&r, 2.0, 4.0).unwrap();
        // Re-binarize the scaled mask with any threshold <= the scale.
        for k in [1.0, 2.5, 100.0] {
            let scaled: Vec<f64> = m.as_slice().iter().map(|&b| f64::from(b) * k).collect();
            let sv = line_volume(&scaled);
            let again = binarize_hysteresis(&sv, 0.5, 0.5).unwrap();
            assert_eq!(again.as_slice(), m.as_slice());
        }
    }

    #[test]
    fn nan_voxels_never_label() {
        let r = line_volume(&[f64::NAN, 10.0, f64::NAN]);
        let m = binarize_hysteresis(&r, 1.0, 5.0).unwrap();
        assert_eq!(m.as_slice(), &[0, 1, 0]);
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let r = line_volume(&[1.0]);
        assert!(binarize_hysteresis(&r, 5.0, 1.0).is_err());
        assert!(binarize_hysteresis(&r, f64::NAN, 1.0).is_err());
    }
}
