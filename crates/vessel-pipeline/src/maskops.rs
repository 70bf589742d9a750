// crates/vessel-pipeline/src/maskops.rs

//! Mask coupling: gating, morphological conditioning, CT bone rejection.
//!
//! The ball structuring element follows the tool convention: radius 1
//! erosion for CT masks (pull the mask inside the skull), radius 8 dilation
//! for other modalities. Voxels outside the volume count as background, so
//! erosion shrinks at the borders.

use rayon::prelude::*;
use vessel_core::{MaskVolume, Result, ScalarVolume};

/// Signed HU bone cap used when the CT volume contains negative intensities.
pub const CT_BONE_CAP_HU: f64 = 400.0;
/// Bone cap for offset-positive CT encodings.
pub const CT_BONE_CAP_OFFSET: f64 = 1324.0;

/// Zero `vol` outside `mask`.
///
/// # Errors
/// Returns [`vessel_core::VesselError::ShapeMismatch`] when the grids differ.
pub fn apply_mask(vol: &mut ScalarVolume, mask: &MaskVolume) -> Result<()> {
    vol.check_same_shape(mask.dim())?;
    for (v, &m) in vol.as_mut_slice().iter_mut().zip(mask.as_slice()) {
        if m == 0 {
            *v = 0.0;
        }
    }
    Ok(())
}

/// Zero `vol` wherever the original `intensities` reach `cap` (bone
/// rejection for CT inputs).
///
/// # Errors
/// Returns [`vessel_core::VesselError::ShapeMismatch`] when the grids differ.
pub fn apply_ct_exclusion(vol: &mut ScalarVolume, intensities: &ScalarVolume, cap: f64) -> Result<()> {
    vol.check_same_shape(intensities.dim())?;
    for (v, &x) in vol.as_mut_slice().iter_mut().zip(intensities.as_slice()) {
        if x >= cap {
            *v = 0.0;
        }
    }
    Ok(())
}

/// Pick the bone cap for a CT volume: signed HU encodings (any negative
/// intensity present) cap at [`CT_BONE_CAP_HU`], offset-positive encodings
/// at [`CT_BONE_CAP_OFFSET`].
#[must_use]
pub fn ct_bone_cap(intensities: &ScalarVolume) -> f64 {
    let has_negative = intensities.as_slice().iter().any(|&x| x < 0.0);
    if has_negative {
        CT_BONE_CAP_HU
    } else {
        CT_BONE_CAP_OFFSET
    }
}

/// Offsets within a Euclidean ball of the given voxel radius.
fn ball_offsets(radius: usize) -> Vec<(i64, i64, i64)> {
    let r = radius as i64;
    let r2 = r * r;
    let mut offsets = Vec::new();
    for dk in -r..=r {
        for dj in -r..=r {
            for di in -r..=r {
                if di * di + dj * dj + dk * dk <= r2 {
                    offsets.push((di, dj, dk));
                }
            }
        }
    }
    offsets
}

fn morph(mask: &MaskVolume, radius: usize, dilate: bool) -> MaskVolume {
    if radius == 0 {
        return mask.clone();
    }
    let offsets = ball_offsets(radius);
    let (nx, ny, nz) = mask.dim();
    let input = mask.as_slice();
    let mut out = MaskVolume::zeros(mask.dim());

    out.as_mut_slice()
        .par_chunks_mut(nx.max(1))
        .enumerate()
        .for_each(|(row, chunk)| {
            let j = row % ny.max(1);
            let k = row / ny.max(1);
            for (i, slot) in chunk.iter_mut().enumerate() {
                let mut hit = !dilate;
                for &(di, dj, dk) in &offsets {
                    let (ni, nj, nk) = (i as i64 + di, j as i64 + dj, k as i64 + dk);
                    let inside = ni >= 0
                        && nj >= 0
                        && nk >= 0
                        && ni < nx as i64
                        && nj < ny as i64
                        && nk < nz as i64;
                    let value = inside
                        && input[ni as usize + nx * (nj as usize + ny * nk as usize)] != 0;
                    if dilate && value {
                        hit = true;
                        break;
                    }
                    if !dilate && !value {
                        hit = false;
                        break;
                    }
                }
                *slot = u8::from(hit);
            }
        });
    out
}

/// Dilate `mask` by a Euclidean ball of the given voxel radius.
#[must_use]
pub fn dilate_ball(mask: &MaskVolume, radius: usize) -> MaskVolume {
    morph(mask, radius, true)
}

/// Erode `mask` by a Euclidean ball of the given voxel radius.
#[must_use]
pub fn erode_ball(mask: &MaskVolume, radius: usize) -> MaskVolume {
    morph(mask, radius, false)
}
