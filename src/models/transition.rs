//! Transition (motion) models for target dynamics
//!
//! Describes how the tracked object evolves between measurements.

use nalgebra::{RealField, SMatrix, SVector};
use num_traits::Float;

use crate::config::ProcessNoise;
use crate::types::spaces::{wrapped_difference, StateCovariance, StateVector};

/// Dimension of the CTRV state: [px, py, v, yaw, yaw_rate]
pub const STATE_DIM: usize = 5;

/// Dimension of the augmented state: CTRV state plus [nu_a, nu_yawdd]
pub const AUGMENTED_DIM: usize = 7;

/// Index of the heading angle inside the CTRV state.
pub const YAW_INDEX: usize = 3;

/// Below this |yaw rate| (rad/s) the straight-line limit of the CTRV
/// equations is used instead of the curved-path integral.
pub const YAW_RATE_EPSILON: f64 = 0.001;

/// Trait for nonlinear transition models with noise folded into an augmented state.
///
/// The model propagates an augmented point `[x, noise]` of dimension `NA`
/// to a state of dimension `N`:
/// x_{k+1} = f(x_k, noise, dt)
pub trait NonlinearTransitionModel<T: RealField + Float + Copy, const N: usize, const NA: usize> {
    /// Builds the augmented mean and covariance from a state estimate.
    ///
    /// Noise components have zero mean; their variances occupy the lower-right block.
    fn augment(
        &self,
        mean: &StateVector<T, N>,
        covariance: &StateCovariance<T, N>,
    ) -> (SVector<T, NA>, SMatrix<T, NA, NA>);

    /// Propagates one augmented point forward by `dt` seconds.
    fn propagate(&self, augmented: &SVector<T, NA>, dt: T) -> StateVector<T, N>;

    /// Indices of state components that are angles.
    fn angular_components(&self) -> &'static [usize] {
        &[]
    }

    /// `a - b` with angular components wrapped into (-π, π].
    fn state_residual(&self, a: &SVector<T, N>, b: &SVector<T, N>) -> SVector<T, N> {
        wrapped_difference(a, b, self.angular_components())
    }
}

// ============================================================================
// Constant Turn Rate and Velocity
// ============================================================================

/// Constant Turn Rate and Velocity (CTRV) model in 2D.
///
/// State: [px, py, v, yaw, yaw_rate]
///
/// Speed and yaw rate are constant between updates; longitudinal and yaw
/// accelerations enter as white noise through the augmented state.
#[derive(Debug, Clone)]
pub struct Ctrv2D<T: RealField> {
    /// Longitudinal acceleration noise standard deviation (m/s²)
    pub std_a: T,
    /// Yaw acceleration noise standard deviation (rad/s²)
    pub std_yawdd: T,
}

impl<T: RealField + Float + Copy> Ctrv2D<T> {
    /// Creates a new CTRV model.
    ///
    /// # Panics
    /// Panics if either standard deviation is not positive.
    pub fn new(std_a: T, std_yawdd: T) -> Self {
        assert!(std_a > T::zero(), "Process noise std_a must be positive");
        assert!(std_yawdd > T::zero(), "Process noise std_yawdd must be positive");
        Self { std_a, std_yawdd }
    }

    /// Creates the model from configured process noise.
    ///
    /// # Panics
    /// Panics if either standard deviation is not positive.
    pub fn from_noise(noise: &ProcessNoise<T>) -> Self {
        Self::new(noise.std_a, noise.std_yawdd)
    }

    /// Applies the CTRV dynamics to one augmented point.
    ///
    /// # Panics
    /// Panics if `dt < 0`.
    pub fn predict_nonlinear(&self, augmented: &SVector<T, AUGMENTED_DIM>, dt: T) -> StateVector<T, STATE_DIM> {
        assert!(dt >= T::zero(), "Time step dt must be non-negative");
        let px = augmented[0];
        let py = augmented[1];
        let v = augmented[2];
        let yaw = augmented[3];
        let yawd = augmented[4];
        let nu_a = augmented[5];
        let nu_yawdd = augmented[6];

        let half = T::from_f64(0.5).unwrap();
        let eps = T::from_f64(YAW_RATE_EPSILON).unwrap();
        let (sin_yaw, cos_yaw) = Float::sin_cos(yaw);

        let (mut px_p, mut py_p) = if Float::abs(yawd) > eps {
            // Curved path: integrate the heading change over the arc.
            let yaw_end = yaw + yawd * dt;
            let (sin_end, cos_end) = Float::sin_cos(yaw_end);
            (
                px + v / yawd * (sin_end - sin_yaw),
                py + v / yawd * (cos_yaw - cos_end),
            )
        } else {
            (px + v * dt * cos_yaw, py + v * dt * sin_yaw)
        };

        let mut v_p = v;
        let mut yaw_p = yaw + yawd * dt;
        let mut yawd_p = yawd;

        let dt2 = dt * dt;
        px_p += half * nu_a * dt2 * cos_yaw;
        py_p += half * nu_a * dt2 * sin_yaw;
        v_p += nu_a * dt;
        yaw_p += half * nu_yawdd * dt2;
        yawd_p += nu_yawdd * dt;

        StateVector::from_array([px_p, py_p, v_p, yaw_p, yawd_p])
    }
}

impl<T: RealField + Float + Copy> NonlinearTransitionModel<T, STATE_DIM, AUGMENTED_DIM> for Ctrv2D<T> {
    fn augment(
        &self,
        mean: &StateVector<T, STATE_DIM>,
        covariance: &StateCovariance<T, STATE_DIM>,
    ) -> (SVector<T, AUGMENTED_DIM>, SMatrix<T, AUGMENTED_DIM, AUGMENTED_DIM>) {
        let mut x_aug = SVector::<T, AUGMENTED_DIM>::zeros();
        x_aug
            .fixed_rows_mut::<STATE_DIM>(0)
            .copy_from(mean.as_svector());

        let mut p_aug = SMatrix::<T, AUGMENTED_DIM, AUGMENTED_DIM>::zeros();
        p_aug
            .fixed_view_mut::<STATE_DIM, STATE_DIM>(0, 0)
            .copy_from(covariance.as_matrix());
        p_aug[(5, 5)] = self.std_a * self.std_a;
        p_aug[(6, 6)] = self.std_yawdd * self.std_yawdd;

        (x_aug, p_aug)
    }

    fn propagate(&self, augmented: &SVector<T, AUGMENTED_DIM>, dt: T) -> StateVector<T, STATE_DIM> {
        self.predict_nonlinear(augmented, dt)
    }

    fn angular_components(&self) -> &'static [usize] {
        &[YAW_INDEX]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    fn point(px: f64, py: f64, v: f64, yaw: f64, yawd: f64) -> SVector<f64, 7> {
        SVector::from([px, py, v, yaw, yawd, 0.0, 0.0])
    }

    #[test]
    fn test_ctrv_straight() {
        let model = Ctrv2D::new(2.0_f64, 0.3);
        let yaw = FRAC_PI_4;
        let dt = 0.5;

        let next = model.predict_nonlinear(&point(1.0, 2.0, 4.0, yaw, 0.0), dt);

        // Constant velocity formula
        assert!((next.px() - (1.0 + 4.0 * dt * yaw.cos())).abs() < 1e-12);
        assert!((next.py() - (2.0 + 4.0 * dt * yaw.sin())).abs() < 1e-12);
        assert_eq!(next.speed(), 4.0);
        assert_eq!(next.yaw(), yaw);
        assert_eq!(next.yaw_rate(), 0.0);
    }

    #[test]
    fn test_ctrv_branches_agree_near_zero_turn_rate() {
        let model = Ctrv2D::new(2.0_f64, 0.3);
        let dt = 0.1;

        let straight = model.predict_nonlinear(&point(0.0, 0.0, 10.0, 0.3, 0.0), dt);
        let curved = model.predict_nonlinear(&point(0.0, 0.0, 10.0, 0.3, 0.0011), dt);

        assert!((straight.px() - curved.px()).abs() < 1e-3);
        assert!((straight.py() - curved.py()).abs() < 1e-3);
    }

    #[test]
    fn test_ctrv_quarter_turn() {
        let model = Ctrv2D::new(2.0_f64, 0.3);

        // Moving east at 10 m/s, turning left at pi/2 rad/s
        let next = model.predict_nonlinear(&point(0.0, 0.0, 10.0, 0.0, FRAC_PI_2), 1.0);

        let r = 10.0 / FRAC_PI_2;
        assert!((next.px() - r).abs() < 1e-9, "x: {}", next.px());
        assert!((next.py() - r).abs() < 1e-9, "y: {}", next.py());
        assert!((next.yaw() - FRAC_PI_2).abs() < 1e-12);
        assert!((next.speed() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_ctrv_noise_terms() {
        let model = Ctrv2D::new(2.0_f64, 0.3);
        let dt = 2.0;
        let mut aug = point(0.0, 0.0, 1.0, 0.0, 0.0);
        aug[5] = 0.5;
        aug[6] = 0.1;

        let next = model.predict_nonlinear(&aug, dt);

        assert!((next.px() - (2.0 + 0.5 * 0.5 * 4.0)).abs() < 1e-12);
        assert!(next.py().abs() < 1e-12);
        assert!((next.speed() - 2.0).abs() < 1e-12);
        assert!((next.yaw() - 0.5 * 0.1 * 4.0).abs() < 1e-12);
        assert!((next.yaw_rate() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_zero_dt_is_identity() {
        let model = Ctrv2D::new(2.0_f64, 0.3);
        let aug = point(3.0, -1.0, 5.0, 1.0, 0.4);

        let next = model.predict_nonlinear(&aug, 0.0);
        for i in 0..5 {
            assert!((next.index(i) - aug[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_augment() {
        let model = Ctrv2D::new(2.0_f64, 0.3);
        let mean = StateVector::ctrv(1.0, 2.0, 3.0, 0.5, 0.1);
        let cov = StateCovariance::identity();

        let (x_aug, p_aug) = model.augment(&mean, &cov);

        assert_eq!(x_aug[0], 1.0);
        assert_eq!(x_aug[4], 0.1);
        assert_eq!(x_aug[5], 0.0);
        assert_eq!(x_aug[6], 0.0);
        assert_eq!(p_aug[(0, 0)], 1.0);
        assert_eq!(p_aug[(4, 4)], 1.0);
        assert!((p_aug[(5, 5)] - 4.0).abs() < 1e-12);
        assert!((p_aug[(6, 6)] - 0.09).abs() < 1e-12);
        assert_eq!(p_aug[(0, 5)], 0.0);
    }

    #[test]
    fn test_state_residual_wraps_yaw() {
        let model = Ctrv2D::new(2.0_f64, 0.3);
        let a = SVector::from([0.0, 0.0, 0.0, PI - 0.1, 0.0]);
        let b = SVector::from([0.0, 0.0, 0.0, -PI + 0.1, 0.0]);

        let diff = model.state_residual(&a, &b);
        assert!((diff[3] + 0.2).abs() < 1e-12, "yaw diff: {}", diff[3]);
    }

    #[test]
    #[should_panic]
    fn test_negative_dt_panics() {
        let model = Ctrv2D::new(2.0_f64, 0.3);
        model.predict_nonlinear(&point(0.0, 0.0, 1.0, 0.0, 0.0), -1.0);
    }
}
