//! Acid-base titration pH curve computation library implemented in Rust.

use thiserror::Error;

pub mod engine;
pub mod sampler;
pub mod scenario;

pub use engine::{compute_ph, compute_ph_curve, Region};
pub use sampler::{build_curve, landmarks, Curve, Landmarks, SamplePoint, VolumeGrid};
pub use scenario::{Scenario, TitrationType};

/// Ion product of water at 25 C.
pub const KW: f64 = 1e-14;

/// -log10(Kw), so that pH + pOH = 14.
pub const PKW: f64 = 14.0;

/// pH of pure water, and of the salt solution at a strong/strong equivalence point.
pub const NEUTRAL_PH: f64 = 7.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TitrationError {
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("domain error: {quantity} must be positive and finite, got {value}")]
    Domain { quantity: &'static str, value: f64 },
}

pub type Result<T> = std::result::Result<T, TitrationError>;
