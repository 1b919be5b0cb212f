//! Unscented measurement update
//!
//! One correction step shared by every sensor: the observation model supplies
//! h(x), R and which residual components are angles; everything else is the
//! same for lidar and radar.

use nalgebra::{RealField, SMatrix};
use num_traits::Float;

use super::ukf::{Prediction, SigmaPoints, SigmaWeights, UkfState};
use crate::models::NonlinearObservationModel;
use crate::types::spaces::{
    wrapped_difference, ComputeInnovation, Innovation, Measurement, MeasurementCovariance,
    StateCovariance, StateVector,
};
use crate::{FusionError, Result};

/// Result of a measurement update.
#[derive(Debug, Clone, PartialEq)]
pub struct KalmanUpdate<T: RealField, const N: usize, const M: usize> {
    /// Corrected state estimate
    pub state: UkfState<T, N>,
    /// Predicted measurement z_pred
    pub predicted_measurement: Measurement<T, M>,
    /// Innovation covariance S (includes R)
    pub innovation_covariance: MeasurementCovariance<T, M>,
    /// z - z_pred, angle-wrapped
    pub innovation: Innovation<T, M>,
    /// Normalized Innovation Squared: yᵀ S⁻¹ y
    pub nis: T,
}

/// Corrects a prediction with one measurement.
///
/// 1. Transform the predicted sigma points into measurement space
/// 2. Recover z_pred and S = Σ wᵢ (Zᵢ - z_pred)(Zᵢ - z_pred)ᵀ + R
/// 3. Cross-covariance Tc = Σ wᵢ (Xᵢ - x)(Zᵢ - z_pred)ᵀ
/// 4. K = Tc S⁻¹
/// 5. x' = x + K y, P' = P - K S Kᵀ with y = z - z_pred
/// 6. NIS = yᵀ S⁻¹ y
///
/// # Errors
/// - `DegenerateGeometry` if the model cannot observe one of the sigma points
/// - `SingularMatrix` if S is not invertible
/// - `NumericalInstability` if the corrected estimate is not finite
pub fn update<T, Obs, const N: usize, const M: usize, const S: usize>(
    observation: &Obs,
    prediction: &Prediction<T, N, S>,
    weights: &SigmaWeights<T, S>,
    measurement: &Measurement<T, M>,
) -> Result<KalmanUpdate<T, N, M>>
where
    T: RealField + Float + Copy,
    Obs: NonlinearObservationModel<T, N, M>,
{
    let state_sigma = &prediction.sigma_points;

    let mut z_points = SMatrix::<T, M, S>::zeros();
    for i in 0..S {
        let state = StateVector::from_svector(state_sigma.column(i));
        let z = observation
            .observe(&state)
            .ok_or(FusionError::DegenerateGeometry)?;
        z_points.set_column(i, z.as_svector());
    }
    let z_sigma = SigmaPoints::from_matrix(z_points);

    let r = observation.measurement_noise();
    let (z_pred, s) =
        z_sigma.recover_mean_cov(weights, |a, b| observation.residual(a, b), Some(r.as_matrix()));

    let state_angles = prediction.angular;
    let tc = state_sigma.cross_covariance(
        prediction.state.mean.as_svector(),
        |a, b| wrapped_difference(a, b, state_angles),
        &z_sigma,
        &z_pred,
        |a, b| observation.residual(a, b),
        weights,
    );

    let s_inv = s.try_inverse().ok_or(FusionError::SingularMatrix)?;
    let kalman_gain = tc * s_inv;

    let predicted_measurement = Measurement::from_svector(z_pred);
    let innovation =
        (*measurement).innovation(&predicted_measurement, observation.angular_components());
    let y = innovation.as_svector();

    let mean = prediction.state.mean.as_svector() + kalman_gain * y;
    let covariance =
        prediction.state.covariance.as_matrix() - kalman_gain * s * kalman_gain.transpose();
    let nis = (y.transpose() * s_inv * y)[(0, 0)];

    let state = UkfState::new(
        StateVector::from_svector(mean),
        StateCovariance::from_matrix(covariance),
    );
    if !state.is_finite() || !Float::is_finite(nis) {
        return Err(FusionError::NumericalInstability);
    }

    Ok(KalmanUpdate {
        state,
        predicted_measurement,
        innovation_covariance: MeasurementCovariance::from_matrix(s),
        innovation,
        nis,
    })
}
