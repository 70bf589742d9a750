//! End-to-end properties of the multi-scale driver.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vessel_core::{phantom, MaskVolume, ScaleSchedule, ScalarVolume, VesselnessParams};
use vessel_pipeline::{vesselness, vesselness_with_eigen, MultiScaleVesselness};

fn sato_params() -> VesselnessParams {
    VesselnessParams::default()
}

fn schedule(sigmas: &[f64]) -> ScaleSchedule {
    ScaleSchedule::from_sigmas(sigmas.to_vec()).unwrap()
}

#[test]
fn all_zero_volume_produces_all_zero_response() {
    let v = phantom::constant((3, 3, 3), (1.0, 1.0, 1.0), 0.0).unwrap();
    let out = MultiScaleVesselness::new(sato_params(), schedule(&[1.0, 2.0]))
        .run(&v)
        .unwrap();
    assert!(out.report.completed);
    assert_eq!(out.report.degenerate_voxels, 0);
    for &r in out.response.as_slice() {
        assert_eq!(r, 0.0);
    }
}

#[test]
fn constant_volume_produces_negligible_response() {
    let v = phantom::constant((10, 10, 10), (1.0, 1.0, 1.0), 42.0).unwrap();
    let r = vesselness(&v, &sato_params(), &schedule(&[1.0, 2.0]), None).unwrap();
    for &x in r.as_slice() {
        assert!(x.abs() < 1e-9, "{x}");
    }
}

#[test]
fn central_impulse_response_concentrates_at_the_center() {
    // A point source is not a line: the Sato measure penalizes the isotropic
    // blob at the center and peaks on its face neighbors, where one
    // curvature direction relaxes toward zero. The maximum therefore lies
    // inside the 26-neighborhood of the center, and the center responds.
    let v = phantom::impulse((5, 5, 5), (1.0, 1.0, 1.0), (2, 2, 2)).unwrap();
    let r = vesselness(&v, &sato_params(), &schedule(&[1.0]), None).unwrap();
    let (i, j, k) = r.argmax().unwrap();
    assert!(i.abs_diff(2) <= 1 && j.abs_diff(2) <= 1 && k.abs_diff(2) <= 1, "({i},{j},{k})");
    assert!(r.get(2, 2, 2) > 0.0);
}

#[test]
fn tube_centerline_beats_background_and_scale_of_max_tracks_radius() {
    // Length-20 tube along z with a sigma = 1.5 Gaussian cross-section.
    let v = phantom::tube_z((40, 40, 40), (1.0, 1.0, 1.0), (20.0, 20.0), 1.5, (0, 20)).unwrap();
    let sched = schedule(&[0.5, 1.0, 1.5, 2.0, 2.5]);
    let out = MultiScaleVesselness::new(sato_params(), sched)
        .with_scale_of_max()
        .run(&v)
        .unwrap();

    let on_axis = out.response.get(20, 20, 10);
    let off_axis = out.response.get(5, 5, 10);
    assert!(on_axis > 10.0 * off_axis.max(1e-12), "{on_axis} vs {off_axis}");

    // The best scale at the tube middle sits near the cross-section width,
    // within one sampled scale.
    let smax = out.scale_of_max.unwrap();
    let s = smax.get(20, 20, 10);
    assert!((1.0..=1.5).contains(&s), "scale of max {s}");
}

#[test]
fn adding_a_scale_never_decreases_the_response() {
    let mut v =
        phantom::tube_z((16, 16, 16), (1.0, 1.0, 1.0), (7.5, 7.5), 1.2, (0, 16)).unwrap();
    phantom::add_noise(&mut v, 0.02, 11);
    let p = sato_params();
    let small = vesselness(&v, &p, &schedule(&[1.0]), None).unwrap();
    let both = vesselness(&v, &p, &schedule(&[1.0, 1.8]), None).unwrap();
    for (a, b) in small.as_slice().iter().zip(both.as_slice()) {
        assert!(b >= a, "{b} < {a}");
    }
}

#[test]
fn schedule_reversal_leaves_the_response_unchanged() {
    let mut v =
        phantom::tube_z((14, 14, 14), (1.0, 1.0, 1.0), (6.5, 6.5), 1.2, (0, 14)).unwrap();
    phantom::add_noise(&mut v, 0.05, 23);
    let p = sato_params();
    let fwd = vesselness(&v, &p, &schedule(&[0.8, 1.2, 1.7]), None).unwrap();
    let rev = vesselness(&v, &p, &schedule(&[1.7, 1.2, 0.8]), None).unwrap();
    assert_eq!(fwd.as_slice(), rev.as_slice());
}

#[test]
fn repeated_runs_are_bit_identical() {
    let mut v =
        phantom::tube_z((14, 14, 14), (1.0, 1.0, 1.0), (6.5, 6.5), 1.4, (0, 14)).unwrap();
    phantom::add_noise(&mut v, 0.05, 5);
    let p = sato_params();
    let a = vesselness(&v, &p, &schedule(&[0.8, 1.3]), None).unwrap();
    let b = vesselness(&v, &p, &schedule(&[0.8, 1.3]), None).unwrap();
    assert_eq!(a.as_slice(), b.as_slice());
}

#[test]
fn all_zero_mask_gates_everything() {
    let v = phantom::tube_z((12, 12, 12), (1.0, 1.0, 1.0), (5.5, 5.5), 1.2, (0, 12)).unwrap();
    let mask = MaskVolume::zeros((12, 12, 12));
    let r = vesselness(&v, &sato_params(), &schedule(&[1.0]), Some(&mask)).unwrap();
    for &x in r.as_slice() {
        assert_eq!(x, 0.0);
    }
}

#[test]
fn mask_shape_mismatch_fails_before_any_work() {
    let v = phantom::constant((6, 6, 6), (1.0, 1.0, 1.0), 0.0).unwrap();
    let mask = MaskVolume::zeros((6, 6, 5));
    assert!(vesselness(&v, &sato_params(), &schedule(&[1.0]), Some(&mask)).is_err());
}

#[test]
fn invalid_parameters_fail_the_whole_call() {
    let v = phantom::constant((6, 6, 6), (1.0, 1.0, 1.0), 0.0).unwrap();
    let p = VesselnessParams {
        alpha1: 0.0,
        ..sato_params()
    };
    assert!(vesselness(&v, &p, &schedule(&[1.0]), None).is_err());
}

#[test]
fn frangi_sign_rule_holds_at_every_responding_voxel() {
    // The Frangi sign test is exact: a positive bright-vessel response
    // implies the two largest-magnitude eigenvalues are negative at the
    // scale of max.
    let mut v =
        phantom::tube_z((20, 20, 20), (1.0, 1.0, 1.0), (10.0, 10.0), 1.5, (0, 20)).unwrap();
    phantom::add_noise(&mut v, 0.02, 17);
    let p = VesselnessParams {
        response_family: vessel_core::ResponseFamily::Frangi,
        gamma: 0.5,
        ..VesselnessParams::default()
    };
    let out = vesselness_with_eigen(&v, &p, &schedule(&[1.0, 1.5])).unwrap();
    let lam = out.eigenvalues.as_ref().unwrap();
    for (off, &r) in out.response.as_slice().iter().enumerate() {
        if r > 0.0 {
            let l2 = lam[1].as_slice()[off];
            let l3 = lam[2].as_slice()[off];
            assert!(l2 < 0.0 && l3 < 0.0, "offset {off}: ({l2}, {l3})");
        }
    }
}

#[test]
fn eigen_capture_pairs_vectors_with_values() {
    let v = phantom::tube_z((17, 17, 17), (1.0, 1.0, 1.0), (8.0, 8.0), 1.5, (0, 17)).unwrap();
    let p = VesselnessParams {
        compute_eigenvectors: true,
        ..sato_params()
    };
    let out = MultiScaleVesselness::new(p, schedule(&[1.5]))
        .with_eigen()
        .run(&v)
        .unwrap();
    let q = out.eigenvectors.unwrap();
    let off = v.offset(8, 8, 8);
    // Principal (smallest-magnitude) eigenvector at the tube center is the
    // tube axis; columns are stored row-major, first column = entries 0,3,6.
    let axis_z = q[off][6].abs();
    assert!(axis_z > 0.9, "axis component {axis_z}");
}

#[test]
fn cancellation_keeps_the_partial_maximum() {
    let mut v =
        phantom::tube_z((12, 12, 12), (1.0, 1.0, 1.0), (5.5, 5.5), 1.2, (0, 12)).unwrap();
    phantom::add_noise(&mut v, 0.02, 9);
    let p = sato_params();

    let cancel = Arc::new(AtomicBool::new(true));
    let out = MultiScaleVesselness::new(p.clone(), schedule(&[1.0, 1.5, 2.0]))
        .with_cancel(Arc::clone(&cancel))
        .run(&v)
        .unwrap();
    // Cancelled before the first scale: zero response, flagged incomplete.
    assert!(!out.report.completed);
    assert!(out.report.ensure_completed().is_err());
    assert_eq!(out.report.scales_processed, 0);
    for &x in out.response.as_slice() {
        assert_eq!(x, 0.0);
    }

    // Not cancelled: full run.
    cancel.store(false, Ordering::Relaxed);
    let out = MultiScaleVesselness::new(p, schedule(&[1.0, 1.5, 2.0]))
        .with_cancel(cancel)
        .run(&v)
        .unwrap();
    assert!(out.report.completed);
    assert_eq!(out.report.scales_processed, 3);
}

#[test]
fn frangi_family_responds_on_the_tube() {
    let v = phantom::tube_z((20, 20, 20), (1.0, 1.0, 1.0), (10.0, 10.0), 1.5, (0, 20)).unwrap();
    let p = VesselnessParams {
        response_family: vessel_core::ResponseFamily::Frangi,
        gamma: 0.5,
        ..VesselnessParams::default()
    };
    let r = vesselness(&v, &p, &schedule(&[1.5]), None).unwrap();
    let on_axis = r.get(10, 10, 10);
    let corner = r.get(1, 1, 10);
    assert!(on_axis > 0.1, "{on_axis}");
    assert!(on_axis > 10.0 * corner.max(1e-12), "{on_axis} vs {corner}");
}

#[test]
fn ct_exclusion_zeroes_bone_voxels_in_the_output() {
    let v = phantom::tube_z((12, 12, 12), (1.0, 1.0, 1.0), (5.5, 5.5), 1.2, (0, 12)).unwrap();
    // Pretend the raw CT saturates at one voxel on the centerline.
    let mut ct = ScalarVolume::filled((12, 12, 12), (1.0, 1.0, 1.0), 100.0).unwrap();
    ct.set(5, 5, 6, 2000.0);
    let out = MultiScaleVesselness::new(sato_params(), schedule(&[1.2]))
        .with_ct_exclusion(&ct, 400.0)
        .run(&v)
        .unwrap();
    assert_eq!(out.response.get(5, 5, 6), 0.0);
}
