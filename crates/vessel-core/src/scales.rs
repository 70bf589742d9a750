// crates/vessel-core/src/scales.rs

//! Deterministic scale schedules over `[sigma_min, sigma_max]`.
//!
//! Two spacings are supported: `Linear` steps and `Exponential`
//! (log-uniform) steps. A single-step schedule collapses to `sigma_min`.

use crate::error::{Result, VesselError};
use serde::{Deserialize, Serialize};

/// How the sampled scales are distributed between the bounds.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    /// Equal arithmetic steps.
    #[default]
    Linear,
    /// Equal geometric steps.
    Exponential,
}

/// Finite ordered sequence of strictly positive smoothing scales.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScaleSchedule {
    sigmas: Vec<f64>,
}

impl ScaleSchedule {
    /// Build a schedule of `steps` scales between `sigma_min` and
    /// `sigma_max` (inclusive) under `mode`.
    ///
    /// `steps == 1` yields `[sigma_min]` regardless of `sigma_max`.
    ///
    /// # Errors
    /// Returns [`VesselError::InvalidParameter`] when `sigma_min <= 0`,
    /// `sigma_max < sigma_min`, either bound is non-finite, or `steps == 0`.
    pub fn new(sigma_min: f64, sigma_max: f64, steps: usize, mode: ScaleMode) -> Result<Self> {
        if !sigma_min.is_finite() || sigma_min <= 0.0 {
            return Err(VesselError::invalid(format!(
                "sigma_min must be finite and > 0, got {sigma_min}"
            )));
        }
        if !sigma_max.is_finite() || sigma_max < sigma_min {
            return Err(VesselError::invalid(format!(
                "sigma_max must be finite and >= sigma_min, got {sigma_max} < {sigma_min}"
            )));
        }
        if steps == 0 {
            return Err(VesselError::invalid("schedule needs at least one scale"));
        }

        if steps == 1 {
            return Ok(Self {
                sigmas: vec![sigma_min],
            });
        }

        let n = (steps - 1) as f64;
        let sigmas = (0..steps)
            .map(|k| {
                let t = k as f64 / n;
                match mode {
                    ScaleMode::Linear => (sigma_max - sigma_min).mul_add(t, sigma_min),
                    ScaleMode::Exponential => sigma_min * (sigma_max / sigma_min).powf(t),
                }
            })
            .collect();
        Ok(Self { sigmas })
    }

    /// Schedule from an explicit list of scales.
    ///
    /// # Errors
    /// Returns [`VesselError::InvalidParameter`] when the list is empty or
    /// any scale is non-finite or not strictly positive.
    pub fn from_sigmas(sigmas: Vec<f64>) -> Result<Self> {
        if sigmas.is_empty() {
            return Err(VesselError::invalid("schedule needs at least one scale"));
        }
        if let Some(bad) = sigmas.iter().find(|s| !s.is_finite() || **s <= 0.0) {
            return Err(VesselError::invalid(format!(
                "scales must be finite and > 0, got {bad}"
            )));
        }
        Ok(Self { sigmas })
    }

    /// Number of scales.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sigmas.len()
    }

    /// Whether the schedule is empty (never true for a constructed value).
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sigmas.is_empty()
    }

    /// The scales, in order.
    #[inline]
    #[must_use]
    pub fn sigmas(&self) -> &[f64] {
        &self.sigmas
    }

    /// Iterate the scales in order.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.sigmas.iter().copied()
    }

    /// The same scales in reverse order (useful for order-invariance tests).
    #[must_use]
    pub fn reversed(&self) -> Self {
        let mut sigmas = self.sigmas.clone();
        sigmas.reverse();
        Self { sigmas }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_endpoints_and_spacing() {
        let s = ScaleSchedule::new(1.0, 3.0, 5, ScaleMode::Linear).unwrap();
        assert_eq!(s.sigmas(), &[1.0, 1.5, 2.0, 2.5, 3.0]);
    }

    #[test]
    fn exponential_is_log_uniform() {
        let s = ScaleSchedule::new(1.0, 4.0, 3, ScaleMode::Exponential).unwrap();
        assert!((s.sigmas()[0] - 1.0).abs() < 1e-12);
        assert!((s.sigmas()[1] - 2.0).abs() < 1e-12);
        assert!((s.sigmas()[2] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn single_step_collapses_to_min() {
        let s = ScaleSchedule::new(1.25, 9.0, 1, ScaleMode::Exponential).unwrap();
        assert_eq!(s.sigmas(), &[1.25]);
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        assert!(ScaleSchedule::new(0.0, 1.0, 3, ScaleMode::Linear).is_err());
        assert!(ScaleSchedule::new(2.0, 1.0, 3, ScaleMode::Linear).is_err());
        assert!(ScaleSchedule::new(1.0, 2.0, 0, ScaleMode::Linear).is_err());
        assert!(ScaleSchedule::from_sigmas(vec![1.0, -2.0]).is_err());
        assert!(ScaleSchedule::from_sigmas(vec![]).is_err());
    }
}
