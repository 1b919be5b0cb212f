//! Unscented Kalman filtering
//!
//! - [`ukf`]: sigma points, weights and the prediction step
//! - [`update`]: the measurement update shared by every sensor
//! - [`engine::FusionEngine`]: the stateful lidar/radar tracker

pub mod engine;
pub mod ukf;
pub mod update;
