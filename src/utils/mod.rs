//! Evaluation utilities
//!
//! NIS sinks and chi-square consistency checks, and RMSE against ground truth.

mod consistency;
mod rmse;

pub use consistency::*;
pub use rmse::*;
