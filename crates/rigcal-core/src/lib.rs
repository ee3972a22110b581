//! Core math and geometry primitives for `rigcal`.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vec2`, `Pt3`, `Iso3`, ...),
//! - rigid-transform helpers and axis corrections ([`transform`]),
//! - composable pinhole camera models with Brown-Conrady distortion,
//! - the shared estimator error type [`CalibError`],
//! - a generic RANSAC engine ([`ransac_fit`], [`Estimator`]),
//! - deterministic synthetic rigs for tests.
//!
//! Camera pipeline:
//! `pixel = K ∘ distortion ∘ projection(p_c)`

mod error;
/// Linear algebra type aliases and helpers.
pub mod math;
/// Camera models and distortion utilities.
pub mod models;
/// Generic RANSAC engine and traits.
pub mod ransac;
pub mod synthetic;
pub mod transform;

pub use error::*;
pub use math::*;
pub use models::*;
pub use ransac::*;
pub use transform::AxisCorrection;
