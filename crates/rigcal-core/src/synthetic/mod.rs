//! Deterministic synthetic data for tests and demos.
//!
//! - [`rig`]: sensor poses, target positions, per-sensor observations.
//! - [`noise`]: seeded pixel and point noise.
//!
//! # Example
//!
//! ```no_run
//! use rigcal_core::{synthetic::rig, Pt3};
//!
//! let lidar = rig::sensor_pose([0.0, 0.0, 0.1], [0.3, -0.2, 0.05]);
//! let targets = rig::target_positions(15, Pt3::new(3.0, 0.0, 0.0), [1.0, 1.5, 0.5], 42);
//! let seen_by_lidar = rig::observe_points(&lidar, &targets);
//! assert_eq!(seen_by_lidar.len(), 15);
//! ```

pub mod noise;
pub mod rig;
