use rigcal_core::synthetic::noise::{UniformPixelNoise, UniformPointNoise};
use rigcal_core::synthetic::rig;
use rigcal_core::transform::pose_error;
use rigcal_core::{Camera, FxFyCxCySkew, Iso3, NoDistortion, Pinhole, Pt2, Pt3, RansacOptions};
use rigcal_linear::{
    PerspectivePoseEstimator, PnpOptions, ReprojectionVerifier, RigidTransformEstimator,
};

const K: FxFyCxCySkew<f64> = FxFyCxCySkew {
    fx: 820.0,
    fy: 815.0,
    cx: 640.0,
    cy: 360.0,
    skew: 0.0,
};

const OUTLIERS: [usize; 6] = [2, 5, 8, 11, 14, 17];

/// Camera looking along +Z at targets ~3 m ahead; returns `T_R_C`, targets
/// in the reference frame and exact pixels.
fn camera_scene(n: usize) -> (Iso3, Vec<Pt3>, Vec<Pt2>) {
    let ref_se3_cam = rig::sensor_pose([0.05, -0.08, 0.12], [0.2, -0.1, 0.05]);
    let targets = rig::target_positions(n, Pt3::new(0.0, 0.0, 3.0), [1.0, 0.7, 0.6], 5);
    let cam = Camera::new(Pinhole, NoDistortion, K);
    let pixels = rig::project_points(&cam, &ref_se3_cam, &targets).unwrap();
    (ref_se3_cam, targets, pixels)
}

fn corrupt(pixels: &mut [Pt2]) {
    let noise = UniformPixelNoise {
        seed: 99,
        max_abs_px: 1.0,
    };
    for &i in &OUTLIERS {
        let s = noise.sample(0, i);
        pixels[i].x += 200.0 + 50.0 * s.x;
        pixels[i].y += 140.0 + 60.0 * s.y;
    }
}

fn robust_opts(thresh: f64) -> PnpOptions {
    PnpOptions {
        ransac: RansacOptions {
            max_iters: 1000,
            thresh,
            min_inliers: 8,
            confidence: 0.99,
            seed: 7,
            refit_on_inliers: true,
        },
        ..PnpOptions::default()
    }
}

#[test]
fn robust_pnp_survives_outliers_where_deterministic_fails() {
    let (ref_se3_cam, targets, mut pixels) = camera_scene(20);
    corrupt(&mut pixels);
    let opts = robust_opts(2.0);

    let robust = PerspectivePoseEstimator::estimate(&targets, &pixels, &K, true, &opts).unwrap();
    let (dt, ang) = pose_error(&robust.object_se3_cam, &ref_se3_cam);
    assert!(dt < 1e-6, "robust translation error too large: {dt}");
    assert!(ang < 1e-6, "robust rotation error too large: {ang}");

    let expected_inliers: Vec<usize> = (0..20).filter(|i| !OUTLIERS.contains(i)).collect();
    assert_eq!(robust.inliers, expected_inliers);

    let (obj_in, img_in): (Vec<Pt3>, Vec<Pt2>) = robust
        .inliers
        .iter()
        .map(|&i| (targets[i], pixels[i]))
        .unzip();
    let inlier_err =
        ReprojectionVerifier::verify(&obj_in, &img_in, &robust.cam_se3_object, &K).unwrap();
    assert!(inlier_err.norm < 1e-3, "inlier residual {}", inlier_err.norm);

    match PerspectivePoseEstimator::estimate(&targets, &pixels, &K, false, &opts) {
        Ok(plain) => {
            let (dt, ang) = pose_error(&plain.object_se3_cam, &ref_se3_cam);
            assert!(
                dt > 1e-2 || ang > 1e-2,
                "deterministic pnp should degrade under outliers: {dt} / {ang}"
            );
        }
        Err(err) => eprintln!("deterministic pnp failed under outliers: {err}"),
    }
}

#[test]
fn robust_pnp_tolerates_pixel_noise() {
    let (ref_se3_cam, targets, mut pixels) = camera_scene(20);
    let jitter = UniformPixelNoise {
        seed: 3,
        max_abs_px: 0.5,
    };
    for (i, px) in pixels.iter_mut().enumerate() {
        *px = jitter.apply(1, i, px);
    }
    corrupt(&mut pixels);

    let est =
        PerspectivePoseEstimator::estimate(&targets, &pixels, &K, true, &robust_opts(3.0)).unwrap();
    let (dt, ang) = pose_error(&est.object_se3_cam, &ref_se3_cam);
    assert!(dt < 5e-2, "translation error too large: {dt}");
    assert!(ang < 1e-2, "rotation error too large: {ang}");
    assert_eq!(est.inliers.len(), 14);
}

#[test]
fn rigid_alignment_between_two_lidars() {
    let ref_se3_lidar = rig::sensor_pose([0.02, -0.01, 0.6], [0.35, -0.4, 0.1]);
    let targets = rig::target_positions(15, Pt3::new(3.0, 0.0, 0.5), [1.0, 1.5, 0.4], 21);
    let seen = rig::observe_points(&ref_se3_lidar, &targets);

    let exact = RigidTransformEstimator::estimate(&seen, &targets).unwrap();
    let (dt, ang) = pose_error(&exact.target_se3_source, &ref_se3_lidar);
    assert!(dt < 1e-9 && ang < 1e-9, "exact error {dt} / {ang}");

    let noise = UniformPointNoise {
        seed: 8,
        max_abs: 0.01,
    };
    let noisy: Vec<Pt3> = seen
        .iter()
        .enumerate()
        .map(|(i, p)| noise.apply(0, i, p))
        .collect();
    let est = RigidTransformEstimator::estimate(&noisy, &targets).unwrap();
    let (dt, ang) = pose_error(&est.target_se3_source, &ref_se3_lidar);
    assert!(dt < 2e-2, "translation error too large: {dt}");
    assert!(ang < 1e-2, "rotation error too large: {ang}");
    assert!(est.rms > 0.0 && est.rms < 0.02, "rms {}", est.rms);
}
