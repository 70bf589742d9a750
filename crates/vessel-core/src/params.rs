// crates/vessel-core/src/params.rs

//! Parameter set for the vesselness responses and the multi-scale driver.
//!
//! All fields carry serde defaults so a parameter file containing only the
//! knobs a user cares about still round-trips.

use crate::error::{Result, VesselError};
use serde::{Deserialize, Serialize};

/// Which eigenvalue-to-vesselness response family drives the pipeline.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFamily {
    /// Sato line measure with asymmetric alpha penalty.
    #[default]
    Sato,
    /// Frangi RA/RB/S response.
    Frangi,
    /// Fractional-anisotropy / orientation family.
    FaOrientation,
}

/// Final emphasis term of the Sato response.
///
/// `Contrast` reproduces a variant that replaces the line measure with
/// `|l1| * (|l3| - |l2|)` just before writing the voxel.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SatoEmphasis {
    /// `lineMeasure * nv` (the Sato formula).
    #[default]
    Line,
    /// `|l1| * (|l3| - |l2|)` over magnitude-ordered eigenvalues.
    Contrast,
}

pub use vessel_eigen::EigenOrdering;

/// Full parameter set. Construct with [`VesselnessParams::default`] and
/// override fields, then [`validate`](VesselnessParams::validate) before a
/// run (the pipeline does this for you).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VesselnessParams {
    /// Sato penalty for `l3 <= 0`.
    pub alpha1: f64,
    /// Sato penalty for `l3 > 0`.
    pub alpha2: f64,
    /// Frangi plate/line discriminator weight.
    pub alpha: f64,
    /// Frangi blob discriminator weight.
    pub beta: f64,
    /// Frangi structure-strength weight.
    pub gamma: f64,
    /// Enhance bright structures on a dark background (vs. the reverse).
    pub bright_vessels: bool,
    /// Multiply second derivatives by `sigma^2` so responses are comparable
    /// across scales.
    pub scale_normalized: bool,
    /// Also compute orthonormal eigenvector matrices when capturing eigen
    /// output.
    pub compute_eigenvectors: bool,
    /// Ordering applied to captured eigen outputs.
    pub order_policy: EigenOrdering,
    /// Response family driving the run.
    pub response_family: ResponseFamily,
    /// Sato emphasis policy (see [`SatoEmphasis`]).
    pub sato_emphasis: SatoEmphasis,
    /// Multiply the Frangi response by `|l3|`.
    pub scale_vesselness_measure: bool,
}

impl Default for VesselnessParams {
    fn default() -> Self {
        Self {
            alpha1: 0.5,
            alpha2: 2.0,
            alpha: 0.5,
            beta: 0.5,
            gamma: 5.0,
            bright_vessels: true,
            scale_normalized: true,
            compute_eigenvectors: false,
            order_policy: EigenOrdering::default(),
            response_family: ResponseFamily::default(),
            sato_emphasis: SatoEmphasis::default(),
            scale_vesselness_measure: false,
        }
    }
}

impl VesselnessParams {
    /// Check every knob the active response family reads.
    ///
    /// # Errors
    /// Returns [`VesselError::InvalidParameter`] on a non-finite or
    /// non-positive weight for the active family.
    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, v: f64| -> Result<()> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(VesselError::invalid(format!(
                    "{name} must be finite and > 0, got {v}"
                )))
            }
        };
        match self.response_family {
            ResponseFamily::Sato => {
                positive("alpha1", self.alpha1)?;
                positive("alpha2", self.alpha2)?;
            }
            ResponseFamily::Frangi => {
                positive("alpha", self.alpha)?;
                positive("beta", self.beta)?;
                positive("gamma", self.gamma)?;
            }
            ResponseFamily::FaOrientation => {}
        }
        Ok(())
    }
}
