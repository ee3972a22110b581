//! Step functions operating on a [`CalibrationSession`].

use anyhow::{ensure, Context, Result};
use rigcal_core::{CalibError, CalibResult, CameraIntrinsics, Iso3, Pt2, Pt3};
use rigcal_linear::pnp::PNP_MIN_POINTS;
use rigcal_linear::{
    PerspectivePoseEstimator, ReprojectionVerifier, RigidTransformEstimator,
    MIN_RIGID_POINTS,
};
use serde::{Deserialize, Serialize};

use crate::config::{CalibrationConfig, SensorConfig};
use crate::gate::GateDecision;
use crate::graph::TransformGraph;
use crate::sensor::EstimationMethod;
use crate::source::RoundSource;
use crate::store::CorrespondenceSet;

use super::report::{
    finite, CalibrationReport, EstimateFailure, EstimateQuality, EstimateRecord, SensorEstimates,
    TransformRecord, VerificationRecord,
};
use super::CalibrationSession;

/// Counts from one [`step_acquire`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquireSummary {
    pub offered: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// Pull candidates from `source` through the validity gate until the source
/// ends or `target_rounds` rounds are stored.
///
/// # Errors
///
/// - The correspondences are already frozen by a calibration run
/// - The source fails
pub fn step_acquire<S: RoundSource + ?Sized>(
    session: &mut CalibrationSession,
    source: &mut S,
) -> Result<AcquireSummary> {
    let result = acquire(session, source);
    logged(session, "acquire", result)
}

fn acquire<S: RoundSource + ?Sized>(
    session: &mut CalibrationSession,
    source: &mut S,
) -> Result<AcquireSummary> {
    ensure!(
        !session.state.is_frozen(),
        "correspondences are frozen; reset the session before acquiring again"
    );
    let gate = session.config().gate();
    let target = session.config().target_rounds;
    let mut summary = AcquireSummary::default();

    while session.state.store.len() < target {
        let Some(candidate) = source.next_round().context("round source failed")? else {
            break;
        };
        summary.offered += 1;
        match session.state.store.offer(&gate, candidate) {
            GateDecision::Accepted { displacement, .. } => {
                summary.accepted += 1;
                log::info!(
                    "acquire: round {}/{target} accepted (moved {displacement:.3})",
                    session.state.store.len()
                );
            }
            GateDecision::Rejected(_) => summary.rejected += 1,
        }
    }

    if session.state.store.len() < target {
        log::info!(
            "acquire: source ended with {} of {target} rounds",
            session.state.store.len()
        );
    }
    session.log_success(
        "acquire",
        format!(
            "{} of {} candidates accepted",
            summary.accepted, summary.offered
        ),
    );
    Ok(summary)
}

/// Freeze the correspondences and estimate every non-reference sensor.
///
/// The graph is rebuilt from scratch. A failing estimator is recorded in the
/// report and does not affect other sensors; the first successful estimator
/// in the sensor's policy order goes into the graph.
///
/// # Errors
///
/// - No rounds were acquired
/// - The reference sensor has no 3D points
pub fn step_calibrate(session: &mut CalibrationSession) -> Result<()> {
    let result = calibrate(session);
    logged(session, "calibrate", result)
}

fn calibrate(session: &mut CalibrationSession) -> Result<()> {
    session.config().validate()?;
    ensure!(session.state.has_rounds(), "no rounds acquired");

    if !session.state.is_frozen() {
        session.state.correspondences = Some(session.state.store.freeze());
    }
    session.reset_calibration();

    let config = session.config().clone();
    let set = session
        .state
        .correspondences
        .clone()
        .context("correspondences missing")?;
    let reference_points = set
        .points(&config.reference)
        .with_context(|| format!("reference sensor {} has no 3D points", config.reference))?;

    let mut graph = TransformGraph::new(config.reference.clone());
    let mut all = Vec::new();
    for sensor in config.targets() {
        let inputs = SensorInputs {
            set: &set,
            reference: &reference_points,
            intrinsics: session.intrinsics(),
            config: &config,
        };
        let estimates = calibrate_sensor(&inputs, sensor, &mut graph)?;
        all.push(estimates);
    }

    let calibrated = graph.len();
    let targets = config.targets().count();
    session.set_report(CalibrationReport::new(&graph, set.len(), all.clone()));
    session.state.estimates = all;
    session.state.graph = Some(graph);
    session.log_success(
        "calibrate",
        format!("{calibrated} of {targets} sensors calibrated from {} rounds", set.len()),
    );
    Ok(())
}

/// Reproject the reference points through every camera's graph entry.
///
/// # Errors
///
/// Returns an error if [`step_calibrate`] has not been run.
pub fn step_verify(session: &mut CalibrationSession) -> Result<Vec<VerificationRecord>> {
    let result = verify(session);
    logged(session, "verify", result)
}

fn verify(session: &mut CalibrationSession) -> Result<Vec<VerificationRecord>> {
    let graph = session
        .state
        .graph
        .as_ref()
        .context("calibration has not been run")?;
    let set = session
        .state
        .correspondences
        .as_ref()
        .context("correspondences missing")?;
    let config = session.config();
    let reference_points = set
        .points(&config.reference)
        .with_context(|| format!("reference sensor {} has no 3D points", config.reference))?;

    let mut records = Vec::new();
    for sensor in config.targets().filter(|s| s.kind.observes_pixels()) {
        let Ok(ref_se3_cam) = graph.native(&sensor.id) else {
            continue;
        };
        let Some(intrinsics) = session.intrinsics() else {
            log::warn!("verify: no intrinsics, skipping {}", sensor.id);
            continue;
        };
        let pixels = set
            .pixels(&sensor.id)
            .with_context(|| format!("{} has no pixels", sensor.id))?;
        let pixels: Vec<Pt2> = pixels.iter().map(|p| intrinsics.undistort_pixel(p)).collect();
        let err = ReprojectionVerifier::verify(
            &reference_points,
            &pixels,
            &ref_se3_cam.inverse(),
            &intrinsics.k,
        )
        .with_context(|| format!("reprojection check failed for {}", sensor.id))?;

        let high = err.exceeds(config.max_reprojection_error);
        if high {
            log::warn!(
                "verify: {} reprojection error {:.3} px exceeds {:.3} px",
                sensor.id,
                err.norm,
                config.max_reprojection_error
            );
        } else {
            log::info!("verify: {} reprojection error {:.3} px", sensor.id, err.norm);
        }
        records.push(VerificationRecord {
            sensor: sensor.id.clone(),
            points: err.per_point.len(),
            norm: finite(err.norm),
            rms: finite(err.rms),
            max: finite(err.max),
            high_reprojection_error: high,
        });
    }

    let any_high = records.iter().any(|r| r.high_reprojection_error);
    if let Some(report) = session.report_mut() {
        report.verification = records.clone();
        report.high_reprojection_error = any_high;
    }
    session.state.verification = Some(records.clone());
    session.log_success("verify", format!("{} cameras checked", records.len()));
    Ok(records)
}

/// Acquire, calibrate and verify in one go.
pub fn run_calibration<S: RoundSource + ?Sized>(
    session: &mut CalibrationSession,
    source: &mut S,
) -> Result<CalibrationReport> {
    step_acquire(session, source)?;
    step_calibrate(session)?;
    step_verify(session)?;
    session.require_report().cloned()
}

/// Record a failed step in the session log.
fn logged<T>(session: &mut CalibrationSession, step: &str, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        log::warn!("{step}: {err:#}");
        session.log_failure(step, format!("{err:#}"));
    }
    result
}

struct SensorInputs<'a> {
    set: &'a CorrespondenceSet,
    reference: &'a [Pt3],
    intrinsics: Option<&'a CameraIntrinsics>,
    config: &'a CalibrationConfig,
}

fn calibrate_sensor(
    inputs: &SensorInputs<'_>,
    sensor: &SensorConfig,
    graph: &mut TransformGraph,
) -> Result<SensorEstimates> {
    let policy = sensor.kind.policy();
    let mut out = SensorEstimates {
        sensor: sensor.id.clone(),
        kind: sensor.kind,
        selected: None,
        estimates: Vec::new(),
        failures: Vec::new(),
    };

    for &method in policy.estimators {
        match estimate(inputs, sensor, method) {
            Ok((ref_se3_sensor, quality)) => {
                log::info!(
                    "calibrate: {} via {method}: t = [{:.4}, {:.4}, {:.4}]",
                    sensor.id,
                    ref_se3_sensor.translation.x,
                    ref_se3_sensor.translation.y,
                    ref_se3_sensor.translation.z
                );
                if out.selected.is_none() {
                    graph
                        .set(
                            sensor.id.clone(),
                            ref_se3_sensor,
                            method,
                            policy.axis_correction,
                        )
                        .with_context(|| format!("cannot store transform of {}", sensor.id))?;
                    out.selected = Some(method);
                }
                out.estimates.push(EstimateRecord {
                    method,
                    ref_se3_sensor: TransformRecord::from_iso(&ref_se3_sensor),
                    quality,
                });
            }
            Err(err) => {
                log::warn!("calibrate: {} via {method} failed: {err}", sensor.id);
                out.failures.push(EstimateFailure {
                    method,
                    error: err.to_string(),
                });
            }
        }
    }

    if out.selected.is_none() {
        log::warn!("calibrate: no transform for {}", sensor.id);
    }
    Ok(out)
}

/// `T_R_S` for one sensor and method, in the sensor's native frame.
fn estimate(
    inputs: &SensorInputs<'_>,
    sensor: &SensorConfig,
    method: EstimationMethod,
) -> CalibResult<(Iso3, EstimateQuality)> {
    match method {
        EstimationMethod::PointSetAlignment => {
            let points = inputs.set.points(&sensor.id).ok_or(
                CalibError::InsufficientCorrespondences {
                    required: MIN_RIGID_POINTS,
                    actual: 0,
                },
            )?;
            let fit = RigidTransformEstimator::estimate(&points, inputs.reference)?;
            Ok((
                fit.target_se3_source,
                EstimateQuality::Alignment {
                    rms: fit.rms,
                    max: fit.max,
                    reflection_corrected: fit.reflection_corrected,
                },
            ))
        }
        EstimationMethod::PoseFromPoints | EstimationMethod::PoseFromPointsRobust => {
            let intrinsics = inputs.intrinsics.ok_or_else(|| {
                CalibError::IntrinsicsUnavailable(format!("no intrinsics for {}", sensor.id))
            })?;
            let pixels = inputs.set.pixels(&sensor.id).ok_or(
                CalibError::InsufficientCorrespondences {
                    required: PNP_MIN_POINTS,
                    actual: 0,
                },
            )?;
            let pixels: Vec<Pt2> = pixels.iter().map(|p| intrinsics.undistort_pixel(p)).collect();
            let robust = method == EstimationMethod::PoseFromPointsRobust;
            let est = PerspectivePoseEstimator::estimate(
                inputs.reference,
                &pixels,
                &intrinsics.k,
                robust,
                &inputs.config.pnp,
            )?;
            let exceeds_limit =
                est.residual.is_nan() || est.residual > inputs.config.max_reprojection_error;
            if exceeds_limit {
                log::warn!(
                    "calibrate: {} via {method} reprojection error {:.3} px",
                    sensor.id,
                    est.residual
                );
            }
            Ok((
                est.object_se3_cam,
                EstimateQuality::Reprojection {
                    norm: finite(est.residual),
                    rms: finite(est.rms),
                    inliers: est.inliers.len(),
                    total: pixels.len(),
                    exceeds_limit,
                },
            ))
        }
    }
}
