//! Camera model building blocks.
//!
//! A camera is a three-stage pipeline:
//!
//! 1. `ProjectionModel`: map a 3D direction to normalized coordinates (pinhole).
//! 2. `DistortionModel`: apply radial/tangential distortion in normalized space.
//! 3. `IntrinsicsModel`: map normalized coordinates to pixels (K matrix).
//!
//! [`CameraIntrinsics`] is the serializable form loaded from disk and turned
//! into a runtime [`CameraModel`] with [`CameraIntrinsics::build`].

mod camera;
mod distortion;
mod intrinsics;
mod params;
mod projection;

pub use camera::*;
pub use distortion::*;
pub use intrinsics::*;
pub use params::*;
pub use projection::*;
