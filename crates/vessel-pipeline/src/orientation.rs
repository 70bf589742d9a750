// crates/vessel-pipeline/src/orientation.rs

//! Cross-image orientation similarity over scales.
//!
//! For two volumes on the same grid, each scale computes both Hessians and
//! compares the principal directions (smallest-magnitude eigenvector, the
//! local vessel axis): the per-voxel score is `|<e1, e2>|`, optionally
//! weighted by the fractional anisotropy of both tensors (the joint mode).
//! Scales fuse by per-voxel maximum of the product.

use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;
use vessel_core::{Result, ScalarVolume, ScaleSchedule};
use vessel_eigen::{decompose, EigenOrdering};
use vessel_gauss::HessianField;
use vessel_measure::{fractional_anisotropy, orientation_similarity};

use crate::multiscale::RunReport;

const CHUNK: usize = 4096;

/// Multi-scale orientation-similarity driver.
#[derive(Clone)]
pub struct OrientationSimilarity {
    schedule: ScaleSchedule,
    scale_normalized: bool,
    joint_fa: bool,
    cancel: Option<Arc<AtomicBool>>,
}

impl OrientationSimilarity {
    /// New driver over `schedule`.
    #[must_use]
    pub fn new(schedule: ScaleSchedule) -> Self {
        Self {
            schedule,
            scale_normalized: true,
            joint_fa: false,
            cancel: None,
        }
    }

    /// Disable the `sigma^2` normalization of the Hessians (the similarity
    /// itself is scale-invariant; this only matters for the FA weighting).
    #[must_use]
    pub fn without_scale_normalization(mut self) -> Self {
        self.scale_normalized = false;
        self
    }

    /// Weight the similarity by the fractional anisotropy of both tensors.
    #[must_use]
    pub fn joint_fa(mut self) -> Self {
        self.joint_fa = true;
        self
    }

    /// Cooperative cancellation flag, checked at scale boundaries.
    #[must_use]
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Run over both volumes.
    ///
    /// # Errors
    /// Returns [`vessel_core::VesselError::ShapeMismatch`] when the grids
    /// differ and propagates invalid-scale errors from the Hessian stage.
    pub fn run(&self, v1: &ScalarVolume, v2: &ScalarVolume) -> Result<(ScalarVolume, RunReport)> {
        v1.check_same_shape(v2.dim())?;

        let n = v1.len();
        let mut fused = v1.like();
        let mut report = RunReport {
            scales_processed: 0,
            degenerate_voxels: 0,
            completed: true,
        };

        for sigma in self.schedule.iter() {
            if self
                .cancel
                .as_ref()
                .is_some_and(|c| c.load(Ordering::Relaxed))
            {
                report.completed = false;
                break;
            }

            let h1 = HessianField::compute(v1, sigma, self.scale_normalized)?;
            let h2 = HessianField::compute(v2, sigma, self.scale_normalized)?;

            let mut scores = vec![0.0f64; n];
            let joint = self.joint_fa;
            let degenerate: u64 = scores
                .par_chunks_mut(CHUNK)
                .enumerate()
                .map(|(ci, out)| {
                    let base = ci * CHUNK;
                    let mut local = 0u64;
                    for (off, slot) in out.iter_mut().enumerate() {
                        let t1 = h1.tensor_at(base + off);
                        let t2 = h2.tensor_at(base + off);
                        let e1 = decompose(&t1, EigenOrdering::ByMagnitudeAsc, true);
                        let e2 = decompose(&t2, EigenOrdering::ByMagnitudeAsc, true);
                        if e1.degenerate || e2.degenerate {
                            local += 1;
                            *slot = 0.0;
                            continue;
                        }
                        // Principal direction = smallest-magnitude eigenvector.
                        let d1 = e1.vectors.map_or([0.0; 3], |q| q[0]);
                        let d2 = e2.vectors.map_or([0.0; 3], |q| q[0]);
                        let mut score = orientation_similarity(d1, d2);
                        if joint {
                            score *= fractional_anisotropy(e1.values)
                                * fractional_anisotropy(e2.values);
                        }
                        *slot = score;
                    }
                    local
                })
                .sum();

            report.degenerate_voxels += degenerate;
            debug!(sigma, degenerate, "orientation scale folded");

            for (acc, &s) in fused.as_mut_slice().iter_mut().zip(&scores) {
                if s > *acc {
                    *acc = s;
                }
            }
            report.scales_processed += 1;
        }

        Ok((fused, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vessel_core::{phantom, ScaleMode};

    fn schedule() -> ScaleSchedule {
        ScaleSchedule::new(1.0, 2.0, 2, ScaleMode::Linear).unwrap()
    }

    #[test]
    fn identical_tubes_have_high_similarity_on_the_axis() {
        let v = phantom::tube_z((15, 15, 15), (1.0, 1.0, 1.0), (7.0, 7.0), 1.5, (0, 15)).unwrap();
        let (sim, report) = OrientationSimilarity::new(schedule()).run(&v, &v).unwrap();
        assert!(report.completed);
        assert_eq!(report.scales_processed, 2);
        assert!(sim.get(7, 7, 7) > 0.9, "{}", sim.get(7, 7, 7));
    }

    #[test]
    fn shape_mismatch_is_rejected_up_front() {
        let a = phantom::constant((4, 4, 4), (1.0, 1.0, 1.0), 0.0).unwrap();
        let b = phantom::constant((4, 4, 5), (1.0, 1.0, 1.0), 0.0).unwrap();
        assert!(OrientationSimilarity::new(schedule()).run(&a, &b).is_err());
    }

    #[test]
    fn joint_mode_is_bounded_by_plain_similarity() {
        let mut v1 =
            phantom::tube_z((12, 12, 12), (1.0, 1.0, 1.0), (5.5, 5.5), 1.5, (0, 12)).unwrap();
        let mut v2 = v1.clone();
        phantom::add_noise(&mut v1, 0.01, 1);
        phantom::add_noise(&mut v2, 0.01, 2);
        let (plain, _) = OrientationSimilarity::new(schedule()).run(&v1, &v2).unwrap();
        let (joint, _) = OrientationSimilarity::new(schedule())
            .joint_fa()
            .run(&v1, &v2)
            .unwrap();
        for (p, j) in plain.as_slice().iter().zip(joint.as_slice()) {
            assert!(j <= p || (j - p).abs() < 1e-12, "joint {j} > plain {p}");
        }
    }
}
