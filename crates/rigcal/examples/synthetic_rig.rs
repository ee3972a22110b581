//! Synthetic rig: planar laser (reference), roof lidar and a forward camera.
//!
//! Demonstrates the session API, checkpointing, and moving lidar points into
//! the camera image with the calibrated graph.
//!
//! Run with `RUST_LOG=debug` to see gate decisions.

use anyhow::{ensure, Result};
use nalgebra::{UnitQuaternion, Vector3};
use rigcal::core::synthetic::rig::{observe_points, project_points};
use rigcal::pipeline::fusion;
use rigcal::prelude::*;

fn main() -> Result<()> {
    env_logger::init();

    let intrinsics = CameraIntrinsics::pinhole(FxFyCxCySkew {
        fx: 700.0,
        fy: 700.0,
        cx: 640.0,
        cy: 360.0,
        skew: 0.0,
    });

    // Ground truth mounts (sensor -> reference, T_R_S).
    let lidar_gt = Iso3::from_parts(
        Vector3::new(0.3, 0.0, 0.8).into(),
        UnitQuaternion::from_euler_angles(0.0, 0.05, 0.02),
    );
    // Camera optical axis (+Z) along the reference forward axis (+X).
    let camera_gt = Iso3::from_parts(
        Vector3::new(0.15, -0.05, 0.5).into(),
        UnitQuaternion::from_euler_angles(-std::f64::consts::FRAC_PI_2, 0.0, -std::f64::consts::FRAC_PI_2),
    );

    // Target walked along a figure-eight in front of the rig.
    let positions: Vec<Pt3> = (0..15)
        .map(|i| {
            let a = i as f64 * 0.45;
            Pt3::new(3.0 + 0.7 * (2.0 * a).sin(), 1.2 * a.sin(), 0.2 * a.cos())
        })
        .collect();

    let lidar_points = observe_points(&lidar_gt, &positions);
    let pixels = project_points(&intrinsics.build(), &camera_gt, &positions)
        .ok_or_else(|| anyhow::anyhow!("target behind the camera"))?;

    let mut rounds: Vec<RoundCandidate> = positions
        .iter()
        .zip(&lidar_points)
        .zip(&pixels)
        .map(|((p, l), px)| {
            RoundCandidate::new()
                .with_point("laser", *p)
                .with_point("lidar", *l)
                .with_pixel("camera", *px)
        })
        .collect();
    // A round the camera missed, and a mismatched pixel the RANSAC fit drops.
    rounds[4] = rounds[4].clone().with_pixel("camera", Pt2::new(0.0, 0.0));
    rounds[9] = rounds[9].clone().with_pixel("camera", Pt2::new(90.0, 600.0));

    let config = CalibrationConfig {
        reference: SensorId::new("laser"),
        sensors: vec![
            SensorConfig {
                id: SensorId::new("laser"),
                kind: SensorKind::PlanarLaser,
            },
            SensorConfig {
                id: SensorId::new("lidar"),
                kind: SensorKind::MultiLayerLaser,
            },
            SensorConfig {
                id: SensorId::new("camera"),
                kind: SensorKind::MonocularCamera,
            },
        ],
        ..CalibrationConfig::default()
    };

    let mut session = CalibrationSession::new(config)?.with_description("synthetic demo rig");
    session.set_intrinsics(intrinsics.clone())?;
    let report = run_calibration(&mut session, &mut IterRoundSource::new(rounds))?;

    println!("{} rounds accepted", report.rounds);
    for t in &report.transforms {
        println!(
            "{:<7} via {:<24} t = {:?}",
            t.sensor.as_str(),
            t.method.to_string(),
            t.ref_se3_sensor.translation
        );
    }
    for v in &report.verification {
        println!(
            "{} reprojection norm: {:?} px (high: {})",
            v.sensor, v.norm, v.high_reprojection_error
        );
    }

    let graph = session
        .state
        .graph
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("no graph"))?;
    let (dt, ang) =
        rigcal::core::transform::pose_error(&graph.native(&SensorId::new("lidar"))?, &lidar_gt);
    ensure!(dt < 1e-6 && ang < 1e-6, "lidar pose off by {dt} m, {ang} rad");
    let (dt, ang) =
        rigcal::core::transform::pose_error(&graph.native(&SensorId::new("camera"))?, &camera_gt);
    ensure!(dt < 1e-3 && ang < 1e-3, "camera pose off by {dt} m, {ang} rad");

    let in_image = fusion::project_into_camera(
        graph,
        &SensorId::new("camera"),
        &intrinsics,
        &SensorId::new("lidar"),
        &lidar_points[..3],
    )?;
    println!("first lidar hits in the image: {in_image:?}");

    let checkpoint = session.to_json()?;
    let restored = CalibrationSession::from_json(&checkpoint)?;
    ensure!(restored.state.has_graph(), "checkpoint lost the graph");
    println!("checkpoint: {} bytes", checkpoint.len());

    Ok(())
}
