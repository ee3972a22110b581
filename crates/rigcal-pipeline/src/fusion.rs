//! Using a calibrated graph: moving points between sensors and into images.
//!
//! All helpers take points in the frame the sensor measures in, so they use
//! the graph's native poses (no axis correction).

use rigcal_core::{CameraIntrinsics, Pt2, Pt3};

use crate::graph::{GraphError, TransformGraph};
use crate::sensor::SensorId;

/// Express points measured by `sensor` in the reference frame.
pub fn to_reference(
    graph: &TransformGraph,
    sensor: &SensorId,
    points: &[Pt3],
) -> Result<Vec<Pt3>, GraphError> {
    let ref_se3_sensor = graph.native(sensor)?;
    Ok(points
        .iter()
        .map(|p| ref_se3_sensor.transform_point(p))
        .collect())
}

/// Express points measured by `source` in the frame of `target`.
pub fn between(
    graph: &TransformGraph,
    target: &SensorId,
    source: &SensorId,
    points: &[Pt3],
) -> Result<Vec<Pt3>, GraphError> {
    let target_se3_source = graph.relative(target, source)?;
    Ok(points
        .iter()
        .map(|p| target_se3_source.transform_point(p))
        .collect())
}

/// Project points measured by `source` into the image of `camera`, with lens
/// distortion. Points behind the camera map to `None`.
pub fn project_into_camera(
    graph: &TransformGraph,
    camera: &SensorId,
    intrinsics: &CameraIntrinsics,
    source: &SensorId,
    points: &[Pt3],
) -> Result<Vec<Option<Pt2>>, GraphError> {
    let cam_se3_source = graph.relative(camera, source)?;
    let model = intrinsics.build();
    Ok(points
        .iter()
        .map(|p| {
            model
                .project_point(&cam_se3_source.transform_point(p))
                .map(Pt2::from)
        })
        .collect())
}
