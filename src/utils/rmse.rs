//! Root mean squared error against ground truth

use nalgebra::{RealField, SVector};
use num_traits::Float;

use crate::types::spaces::CtrvState;

/// Accumulates squared estimation errors over `[px, py, vx, vy]`.
///
/// Velocity is compared in Cartesian form, derived from speed and heading,
/// so a heading error shows up as a velocity error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RmseAccumulator<T: RealField> {
    squared_error: SVector<T, 4>,
    count: usize,
}

impl<T: RealField + Float + Copy> Default for RmseAccumulator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RealField + Float + Copy> RmseAccumulator<T> {
    pub fn new() -> Self {
        Self {
            squared_error: SVector::zeros(),
            count: 0,
        }
    }

    /// Projects a CTRV state onto `[px, py, vx, vy]`.
    pub fn cartesian(state: &CtrvState<T>) -> SVector<T, 4> {
        let (vx, vy) = state.velocity();
        nalgebra::vector![state.px(), state.py(), vx, vy]
    }

    /// Adds one estimate / ground truth pair, both given as `[px, py, vx, vy]`.
    pub fn add(&mut self, estimate: &SVector<T, 4>, truth: &SVector<T, 4>) {
        let diff = estimate - truth;
        self.squared_error += diff.component_mul(&diff);
        self.count += 1;
    }

    /// Adds a CTRV estimate against a Cartesian ground truth.
    pub fn add_state(&mut self, estimate: &CtrvState<T>, truth: &SVector<T, 4>) {
        self.add(&Self::cartesian(estimate), truth);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Per-component RMSE, or `None` before the first sample.
    pub fn rmse(&self) -> Option<SVector<T, 4>> {
        if self.count == 0 {
            return None;
        }
        let n = T::from_usize(self.count).unwrap();
        Some((self.squared_error / n).map(Float::sqrt))
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::spaces::StateVector;

    #[test]
    fn test_empty() {
        let acc: RmseAccumulator<f64> = RmseAccumulator::new();
        assert_eq!(acc.rmse(), None);
    }

    #[test]
    fn test_rmse_values() {
        let mut acc = RmseAccumulator::new();
        let truth = nalgebra::vector![0.0, 0.0, 1.0, 0.0];
        acc.add(&nalgebra::vector![1.0, -2.0, 1.0, 0.0], &truth);
        acc.add(&nalgebra::vector![-1.0, 2.0, 1.0, 4.0], &truth);

        let rmse = acc.rmse().unwrap();
        assert!((rmse[0] - 1.0).abs() < 1e-12);
        assert!((rmse[1] - 2.0).abs() < 1e-12);
        assert!(rmse[2].abs() < 1e-12);
        assert!((rmse[3] - 8.0_f64.sqrt()).abs() < 1e-12, "vy rmse: {}", rmse[3]);
        assert_eq!(acc.count(), 2);

        acc.reset();
        assert_eq!(acc.count(), 0);
    }

    #[test]
    fn test_state_projection() {
        let mut acc = RmseAccumulator::new();
        // Heading north at 2 m/s
        let estimate = StateVector::ctrv(1.0, 1.0, 2.0, core::f64::consts::FRAC_PI_2, 0.0);
        acc.add_state(&estimate, &nalgebra::vector![1.0, 1.0, 0.0, 2.0]);

        let rmse = acc.rmse().unwrap();
        for i in 0..4 {
            assert!(rmse[i] < 1e-12, "component {}: {}", i, rmse[i]);
        }
    }
}
