//! Scalar vesselness responses over ordered Hessian eigenvalues.
//!
//! Every entry point takes the eigenvalue triple in **value-ascending**
//! order (the eigensolver's natural output) and reorders internally where a
//! formula wants magnitude ordering. All responses are finite, non-negative,
//! and zero for non-finite input or a failed brightness sign test.
//!
//! - [`sato_response`]: line measure with asymmetric alpha penalty.
//! - [`frangi_response`]: RA/RB/S response.
//! - [`fa_response`] / [`fractional_anisotropy`]: anisotropy family.
//! - [`orientation_similarity`]: |cos| between principal directions.
//! - [`respond`]: family dispatch for the multi-scale driver.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

pub mod fa;
pub mod frangi;
pub mod sato;

pub use fa::{fa_response, fractional_anisotropy, orientation_similarity};
pub use frangi::frangi_response;
pub use sato::sato_response;

use vessel_core::{ResponseFamily, VesselnessParams};

fn is_finite3(l: [f64; 3]) -> bool {
    l[0].is_finite() && l[1].is_finite() && l[2].is_finite()
}

/// Reorder a value-ascending triple to magnitude-ascending, ties keeping
/// the value order.
#[must_use]
pub fn magnitude_ascending(value_asc: [f64; 3]) -> [f64; 3] {
    vessel_eigen::reorder(value_asc, vessel_eigen::EigenOrdering::ByMagnitudeAsc)
}

/// Dispatch to the response family selected in `params`.
///
/// Input is the value-ascending eigenvalue triple of one voxel.
#[must_use]
pub fn respond(value_asc: [f64; 3], params: &VesselnessParams) -> f64 {
    match params.response_family {
        ResponseFamily::Sato => sato_response(
            value_asc,
            params.alpha1,
            params.alpha2,
            params.sato_emphasis,
        ),
        ResponseFamily::Frangi => frangi_response(value_asc, params),
        ResponseFamily::FaOrientation => fa_response(value_asc, params.bright_vessels),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn magnitude_ascending_orders_by_abs() {
        assert_eq!(magnitude_ascending([-9.0, -4.0, 1.0]), [1.0, -4.0, -9.0]);
    }

    proptest! {
        #[test]
        fn every_family_is_finite_and_non_negative(
            l0 in -50.0f64..50.0, l1 in -50.0f64..50.0, l2 in -50.0f64..50.0,
        ) {
            let mut l = [l0, l1, l2];
            l.sort_by(f64::total_cmp);
            for family in [
                ResponseFamily::Sato,
                ResponseFamily::Frangi,
                ResponseFamily::FaOrientation,
            ] {
                let params = VesselnessParams {
                    response_family: family,
                    ..VesselnessParams::default()
                };
                let r = respond(l, &params);
                prop_assert!(r.is_finite(), "{family:?}: {r}");
                prop_assert!(r >= 0.0, "{family:?}: {r}");
            }
        }

        #[test]
        fn non_finite_input_maps_to_zero(l0 in -5.0f64..5.0) {
            for family in [
                ResponseFamily::Sato,
                ResponseFamily::Frangi,
                ResponseFamily::FaOrientation,
            ] {
                let params = VesselnessParams {
                    response_family: family,
                    ..VesselnessParams::default()
                };
                prop_assert_eq!(respond([f64::NAN, l0, 1.0], &params), 0.0);
                prop_assert_eq!(respond([l0, f64::INFINITY, 1.0], &params), 0.0);
            }
        }
    }
}
