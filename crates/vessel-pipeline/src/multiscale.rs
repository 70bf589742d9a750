// crates/vessel-pipeline/src/multiscale.rs

//! Multi-scale vesselness driver.
//!
//! For each scale in the schedule the driver computes the Hessian field,
//! reduces every tensor through the eigensolver and the selected response
//! family, and folds the result into a per-voxel running maximum. The scale
//! loop is sequential; the per-voxel work is parallel over fixed chunks, so
//! the output is a pure, bit-deterministic function of the inputs.
//!
//! A strict `>` comparison in the fold keeps the earlier scale on ties.
//! Cancellation is honored only at scale boundaries; the partial maximum is
//! returned with `completed = false`, never a half-updated volume.

use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use vessel_core::{
    MaskVolume, Result, ScalarVolume, ScaleSchedule, VesselnessParams,
};
use vessel_eigen::{decompose, reorder, EigenOrdering};
use vessel_gauss::HessianField;
use vessel_measure::respond;

use crate::maskops::{apply_ct_exclusion, apply_mask};

/// Voxel chunk size for the parallel eigen/response stage.
const CHUNK: usize = 4096;

/// Bookkeeping from a [`MultiScaleVesselness::run`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Scales fully folded into the response.
    pub scales_processed: usize,
    /// Voxels whose Hessian was non-finite at some scale (response forced
    /// to zero there). Surfaced as a warning, never fatal.
    pub degenerate_voxels: u64,
    /// False when the run was cancelled at a scale boundary.
    pub completed: bool,
}

impl RunReport {
    /// Treat a cancelled partial result as an error.
    ///
    /// # Errors
    /// Returns [`vessel_core::VesselError::Cancelled`] when the run stopped
    /// at a scale boundary before the full schedule was folded.
    pub fn ensure_completed(&self) -> Result<()> {
        if self.completed {
            Ok(())
        } else {
            Err(vessel_core::VesselError::Cancelled)
        }
    }
}

/// Output of a multi-scale run.
#[derive(Clone, Debug)]
pub struct VesselnessOutput {
    /// Per-voxel maximum response across the processed scales.
    pub response: ScalarVolume,
    /// Scale achieving the maximum, when recorded.
    pub scale_of_max: Option<ScalarVolume>,
    /// Eigenvalues at the scale of max (ordered per `order_policy`), when
    /// captured.
    pub eigenvalues: Option<[ScalarVolume; 3]>,
    /// Row-major 3x3 eigenvector matrices (columns paired with the
    /// eigenvalues) at the scale of max, when captured.
    pub eigenvectors: Option<Vec<[f64; 9]>>,
    /// Run bookkeeping.
    pub report: RunReport,
}

/// Builder-style driver owning all per-scale intermediates.
#[derive(Clone)]
pub struct MultiScaleVesselness<'a> {
    params: VesselnessParams,
    schedule: ScaleSchedule,
    mask: Option<&'a MaskVolume>,
    ct_exclusion: Option<(&'a ScalarVolume, f64)>,
    record_scale_of_max: bool,
    capture_eigen: bool,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> MultiScaleVesselness<'a> {
    /// New driver over `schedule` with `params`.
    #[must_use]
    pub fn new(params: VesselnessParams, schedule: ScaleSchedule) -> Self {
        Self {
            params,
            schedule,
            mask: None,
            ct_exclusion: None,
            record_scale_of_max: false,
            capture_eigen: false,
            cancel: None,
        }
    }

    /// Zero the fused response outside `mask`. The Hessian itself stays
    /// global to avoid border artifacts.
    #[must_use]
    pub fn with_mask(mut self, mask: &'a MaskVolume) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Additionally zero the response where `intensities >= cap`
    /// (CT bone rejection).
    #[must_use]
    pub fn with_ct_exclusion(mut self, intensities: &'a ScalarVolume, cap: f64) -> Self {
        self.ct_exclusion = Some((intensities, cap));
        self
    }

    /// Record the scale achieving the per-voxel maximum.
    #[must_use]
    pub fn with_scale_of_max(mut self) -> Self {
        self.record_scale_of_max = true;
        self
    }

    /// Capture eigenvalues (and eigenvectors when
    /// `params.compute_eigenvectors`) at the scale of max.
    #[must_use]
    pub fn with_eigen(mut self) -> Self {
        self.capture_eigen = true;
        self
    }

    /// Cooperative cancellation flag, checked at scale boundaries.
    #[must_use]
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Run the driver.
    ///
    /// # Errors
    /// Returns [`vessel_core::VesselError::InvalidParameter`] for invalid
    /// parameters and [`vessel_core::VesselError::ShapeMismatch`] when the
    /// mask or CT volume lives on a different grid. Both are raised before
    /// any per-scale work.
    pub fn run(&self, vol: &ScalarVolume) -> Result<VesselnessOutput> {
        self.params.validate()?;
        if let Some(mask) = self.mask {
            vol.check_same_shape(mask.dim())?;
        }
        if let Some((ct, _)) = self.ct_exclusion {
            vol.check_same_shape(ct.dim())?;
        }

        let n = vol.len();
        let mut response = vol.like();
        let first_sigma = self.schedule.sigmas()[0];
        let mut scale_of_max = if self.record_scale_of_max {
            Some(ScalarVolume::filled(vol.dim(), vol.spacing(), first_sigma)?)
        } else {
            None
        };
        let mut eigenvalues = if self.capture_eigen {
            Some([vol.like(), vol.like(), vol.like()])
        } else {
            None
        };
        let mut eigenvectors = (self.capture_eigen && self.params.compute_eigenvectors)
            .then(|| vec![IDENTITY9; n]);

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

            let hessian = HessianField::compute(vol, sigma, self.params.scale_normalized)?;
            let pass = self.scale_pass(&hessian);
            report.degenerate_voxels += pass.degenerate;
            debug!(sigma, degenerate = pass.degenerate, "scale folded");

            // Sequential fold: strict > keeps the earlier scale on ties.
            for i in 0..n {
                if pass.response[i] > response.as_slice()[i] {
                    response.as_mut_slice()[i] = pass.response[i];
                    if let Some(map) = scale_of_max.as_mut() {
                        map.as_mut_slice()[i] = sigma;
                    }
                    if let (Some(out), Some(lam)) = (eigenvalues.as_mut(), pass.lambda.as_ref()) {
                        out[0].as_mut_slice()[i] = lam[i][0];
                        out[1].as_mut_slice()[i] = lam[i][1];
                        out[2].as_mut_slice()[i] = lam[i][2];
                    }
                    if let (Some(out), Some(q)) = (eigenvectors.as_mut(), pass.vectors.as_ref()) {
                        out[i] = q[i];
                    }
                }
            }
            report.scales_processed += 1;
        }

        if report.degenerate_voxels > 0 {
            warn!(
                degenerate = report.degenerate_voxels,
                "non-finite Hessian entries treated as zero response"
            );
        }

        if let Some(mask) = self.mask {
            apply_mask(&mut response, mask)?;
        }
        if let Some((ct, cap)) = self.ct_exclusion {
            apply_ct_exclusion(&mut response, ct, cap)?;
        }

        Ok(VesselnessOutput {
            response,
            scale_of_max,
            eigenvalues,
            eigenvectors,
            report,
        })
    }

    fn scale_pass(&self, hessian: &HessianField) -> ScalePass {
        let n = hessian.len();
        let params = &self.params;

        if !self.capture_eigen {
            let mut response = vec![0.0f64; n];
            let degenerate = response
                .par_chunks_mut(CHUNK)
                .enumerate()
                .map(|(ci, out)| {
                    let base = ci * CHUNK;
                    let mut local = 0u64;
                    for (off, slot) in out.iter_mut().enumerate() {
                        let t = hessian.tensor_at(base + off);
                        let e = decompose(&t, EigenOrdering::ByValueAsc, false);
                        if e.degenerate {
                            local += 1;
                            *slot = 0.0;
                        } else {
                            *slot = respond(e.values, params);
                        }
                    }
                    local
                })
                .sum();
            return ScalePass {
                response,
                lambda: None,
                vectors: None,
                degenerate,
            };
        }

        let with_vectors = params.compute_eigenvectors;
        let mut response = vec![0.0f64; n];
        let mut lambda = vec![[0.0f64; 3]; n];
        let mut vectors = with_vectors.then(|| vec![IDENTITY9; n]);

        let degenerate = if let Some(q) = vectors.as_mut() {
            response
                .par_chunks_mut(CHUNK)
                .zip(lambda.par_chunks_mut(CHUNK))
                .zip(q.par_chunks_mut(CHUNK))
                .enumerate()
                .map(|(ci, ((out, lam), qv))| {
                    let base = ci * CHUNK;
                    let mut local = 0u64;
                    for off in 0..out.len() {
                        let t = hessian.tensor_at(base + off);
                        let e = decompose(&t, params.order_policy, true);
                        if e.degenerate {
                            local += 1;
                        }
                        lam[off] = e.values;
                        if let Some(cols) = e.vectors {
                            qv[off] = flatten_columns(cols);
                        }
                        out[off] = if e.degenerate {
                            0.0
                        } else {
                            respond(reorder(e.values, EigenOrdering::ByValueAsc), params)
                        };
                    }
                    local
                })
                .sum()
        } else {
            response
                .par_chunks_mut(CHUNK)
                .zip(lambda.par_chunks_mut(CHUNK))
                .enumerate()
                .map(|(ci, (out, lam))| {
                    let base = ci * CHUNK;
                    let mut local = 0u64;
                    for off in 0..out.len() {
                        let t = hessian.tensor_at(base + off);
                        let e = decompose(&t, params.order_policy, false);
                        if e.degenerate {
                            local += 1;
                        }
                        lam[off] = e.values;
                        out[off] = if e.degenerate {
                            0.0
                        } else {
                            respond(reorder(e.values, EigenOrdering::ByValueAsc), params)
                        };
                    }
                    local
                })
                .sum()
        };

        ScalePass {
            response,
            lambda: Some(lambda),
            vectors,
            degenerate,
        }
    }
}

const IDENTITY9: [f64; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Row-major 3x3 matrix whose columns are the eigenvector columns.
fn flatten_columns(cols: [[f64; 3]; 3]) -> [f64; 9] {
    [
        cols[0][0], cols[1][0], cols[2][0],
        cols[0][1], cols[1][1], cols[2][1],
        cols[0][2], cols[1][2], cols[2][2],
    ]
}

struct ScalePass {
    response: Vec<f64>,
    lambda: Option<Vec<[f64; 3]>>,
    vectors: Option<Vec<[f64; 9]>>,
    degenerate: u64,
}

/// One-call surface: multi-scale vesselness, optionally mask-gated.
///
/// # Errors
/// Same conditions as [`MultiScaleVesselness::run`].
pub fn vesselness(
    vol: &ScalarVolume,
    params: &VesselnessParams,
    schedule: &ScaleSchedule,
    mask: Option<&MaskVolume>,
) -> Result<ScalarVolume> {
    let mut driver = MultiScaleVesselness::new(params.clone(), schedule.clone());
    if let Some(m) = mask {
        driver = driver.with_mask(m);
    }
    Ok(driver.run(vol)?.response)
}

/// One-call surface with eigen capture at the scale of max.
///
/// # Errors
/// Same conditions as [`MultiScaleVesselness::run`].
pub fn vesselness_with_eigen(
    vol: &ScalarVolume,
    params: &VesselnessParams,
    schedule: &ScaleSchedule,
) -> Result<VesselnessOutput> {
    MultiScaleVesselness::new(params.clone(), schedule.clone())
        .with_scale_of_max()
        .with_eigen()
        .run(vol)
}
