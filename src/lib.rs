//! ctrv-fusion: Lidar/Radar Sensor Fusion for Rust
//!
//! Estimates the kinematic state of a single moving object from asynchronous
//! lidar (Cartesian position) and radar (range, bearing, range-rate)
//! measurements using an Unscented Kalman Filter over a Constant Turn Rate and
//! Velocity (CTRV) motion model.
//!
//! # Features
//!
//! - **Type Safety**: State, measurement and innovation vectors live in distinct spaces
//! - **Allocation Free Core**: Sigma point sets are fixed-size matrices
//! - **no_std Support**: Works in embedded environments
//!
//! # Example
//!
//! ```
//! use ctrv_fusion::prelude::*;
//!
//! let mut engine: FusionEngine<f64> = FusionEngine::new(FusionConfig::default()).unwrap();
//!
//! engine.process_measurement(&MeasurementPackage::lidar(0, 3.0, 4.0)).unwrap();
//! engine.process_measurement(&MeasurementPackage::radar(100_000, 5.1, 0.93, 1.0)).unwrap();
//!
//! let x = engine.state();
//! assert!(x.index(0).is_finite());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod config;
pub mod filters;
pub mod models;
pub mod types;
pub mod utils;

pub mod prelude {
    pub use crate::config::*;
    pub use crate::filters::engine::*;
    pub use crate::filters::ukf::{UkfParams, SigmaWeights};
    pub use crate::models::*;
    pub use crate::types::angle::normalize_angle;
    pub use crate::types::measurement::*;
    pub use crate::types::spaces::*;
    pub use crate::utils::*;
    pub use crate::{FusionError, Result};
}

use crate::types::measurement::SensorKind;

/// Error types for the library
#[derive(Debug, Clone, PartialEq)]
pub enum FusionError {
    /// Augmented covariance lost positive definiteness (Cholesky failed)
    NotPositiveDefinite,
    /// Innovation covariance is singular and cannot be inverted
    SingularMatrix,
    /// Computation produced NaN or infinite values
    NumericalInstability,
    /// Predicted radar range fell below the minimum range floor
    DegenerateGeometry,
    /// Measurement timestamp precedes the previous one
    NonMonotonicTimestamp {
        /// Timestamp of the last processed measurement (microseconds)
        previous: i64,
        /// Offending timestamp (microseconds)
        current: i64,
    },
    /// Raw measurement vector has the wrong length for its sensor
    MeasurementDimension {
        /// Sensor the measurement was tagged with
        kind: SensorKind,
        /// Required number of components
        expected: usize,
        /// Number of components supplied
        actual: usize,
    },
    /// Measurement contains NaN or infinite components
    NonFiniteMeasurement,
    /// Both lidar and radar are disabled, so tracking can never start
    NoSensorEnabled,
    /// A noise standard deviation is not a positive finite number
    InvalidNoise,
}

#[cfg(feature = "std")]
impl std::error::Error for FusionError {}

impl ::core::fmt::Display for FusionError {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        match self {
            FusionError::NotPositiveDefinite => {
                write!(f, "Augmented covariance is not positive definite")
            }
            FusionError::SingularMatrix => write!(f, "Innovation covariance is singular"),
            FusionError::NumericalInstability => write!(f, "Numerical instability detected"),
            FusionError::DegenerateGeometry => {
                write!(f, "Predicted radar range is below the minimum range")
            }
            FusionError::NonMonotonicTimestamp { previous, current } => write!(
                f,
                "Timestamp {} us precedes previous timestamp {} us",
                current, previous
            ),
            FusionError::MeasurementDimension {
                kind,
                expected,
                actual,
            } => write!(
                f,
                "{} measurement needs {} components, got {}",
                kind, expected, actual
            ),
            FusionError::NonFiniteMeasurement => write!(f, "Measurement is not finite"),
            FusionError::NoSensorEnabled => write!(f, "Both lidar and radar are disabled"),
            FusionError::InvalidNoise => write!(f, "Invalid noise standard deviation"),
        }
    }
}

pub type Result<T> = ::core::result::Result<T, FusionError>;
