//! Observation (sensor) models
//!
//! Maps predicted CTRV states into each sensor's measurement space. The
//! Kalman updater only talks to these models through
//! [`NonlinearObservationModel`], so lidar and radar share one update path.

use nalgebra::{RealField, SVector};
use num_traits::Float;

use crate::config::{LidarNoise, RadarNoise};
use crate::models::transition::STATE_DIM;
use crate::types::measurement::SensorKind;
use crate::types::spaces::{wrapped_difference, Measurement, MeasurementCovariance, StateVector};

/// Radar predictions closer than this to the sensor (m) are treated as
/// degenerate: bearing is ill-defined and range rate divides by range.
///
/// Radar updates are skipped for as long as any predicted sigma point lies
/// this close, so a track initialized at the origin is only moved by lidar.
pub const MIN_RADAR_RANGE: f64 = 1e-4;

/// Trait for nonlinear observation models.
///
/// Describes the measurement process:
/// z = h(x) + v
///
/// where v is zero-mean Gaussian measurement noise with covariance R.
pub trait NonlinearObservationModel<T: RealField + Float + Copy, const N: usize, const M: usize> {
    /// Which sensor this model describes.
    fn kind(&self) -> SensorKind;

    /// Predicts the measurement for a state, or `None` where h(x) is undefined.
    fn observe(&self, state: &StateVector<T, N>) -> Option<Measurement<T, M>>;

    /// Measurement noise covariance R.
    fn measurement_noise(&self) -> MeasurementCovariance<T, M>;

    /// Indices of measurement components that are angles.
    fn angular_components(&self) -> &'static [usize] {
        &[]
    }

    /// `a - b` with angular components wrapped into (-π, π].
    fn residual(&self, a: &SVector<T, M>, b: &SVector<T, M>) -> SVector<T, M> {
        wrapped_difference(a, b, self.angular_components())
    }

    /// First state estimate derived from a single measurement.
    ///
    /// Components the sensor cannot observe are set to zero.
    fn initial_state(&self, measurement: &Measurement<T, M>) -> StateVector<T, N>;
}

// ============================================================================
// Lidar
// ============================================================================

/// Lidar: observes [px, py] directly from the CTRV state.
#[derive(Debug, Clone)]
pub struct LidarSensor<T: RealField> {
    /// Position x noise standard deviation (m)
    pub std_px: T,
    /// Position y noise standard deviation (m)
    pub std_py: T,
}

impl<T: RealField + Float + Copy> LidarSensor<T> {
    /// Creates a new lidar model.
    ///
    /// # Panics
    /// Panics if either standard deviation is not positive.
    pub fn new(std_px: T, std_py: T) -> Self {
        assert!(std_px > T::zero(), "Measurement noise std_px must be positive");
        assert!(std_py > T::zero(), "Measurement noise std_py must be positive");
        Self { std_px, std_py }
    }

    /// Creates the model from configured sensor noise.
    pub fn from_noise(noise: &LidarNoise<T>) -> Self {
        Self::new(noise.std_px, noise.std_py)
    }
}

impl<T: RealField + Float + Copy> NonlinearObservationModel<T, STATE_DIM, 2> for LidarSensor<T> {
    fn kind(&self) -> SensorKind {
        SensorKind::Lidar
    }

    fn observe(&self, state: &StateVector<T, STATE_DIM>) -> Option<Measurement<T, 2>> {
        Some(Measurement::from_array([state.px(), state.py()]))
    }

    fn measurement_noise(&self) -> MeasurementCovariance<T, 2> {
        MeasurementCovariance::from_diagonal(&nalgebra::vector![
            self.std_px * self.std_px,
            self.std_py * self.std_py
        ])
    }

    fn initial_state(&self, measurement: &Measurement<T, 2>) -> StateVector<T, STATE_DIM> {
        let zero = T::zero();
        StateVector::ctrv(*measurement.index(0), *measurement.index(1), zero, zero, zero)
    }
}

// ============================================================================
// Radar
// ============================================================================

/// Radar: observes [range, bearing, range_rate] from a sensor at the origin.
#[derive(Debug, Clone)]
pub struct RadarSensor<T: RealField> {
    /// Range noise standard deviation (m)
    pub std_rho: T,
    /// Bearing noise standard deviation (rad)
    pub std_phi: T,
    /// Range rate noise standard deviation (m/s)
    pub std_rhod: T,
    /// Minimum predicted range (m) for which a measurement is defined
    pub min_range: T,
}

impl<T: RealField + Float + Copy> RadarSensor<T> {
    /// Creates a new radar model with the default minimum range.
    ///
    /// # Panics
    /// Panics if any standard deviation is not positive.
    pub fn new(std_rho: T, std_phi: T, std_rhod: T) -> Self {
        assert!(std_rho > T::zero(), "Range noise std_rho must be positive");
        assert!(std_phi > T::zero(), "Bearing noise std_phi must be positive");
        assert!(std_rhod > T::zero(), "Range rate noise std_rhod must be positive");
        Self {
            std_rho,
            std_phi,
            std_rhod,
            min_range: T::from_f64(MIN_RADAR_RANGE).unwrap(),
        }
    }

    /// Creates the model from configured sensor noise.
    pub fn from_noise(noise: &RadarNoise<T>) -> Self {
        Self::new(noise.std_rho, noise.std_phi, noise.std_rhod)
    }

    /// Overrides the minimum range floor.
    pub fn with_min_range(mut self, min_range: T) -> Self {
        self.min_range = min_range;
        self
    }
}

impl<T: RealField + Float + Copy> NonlinearObservationModel<T, STATE_DIM, 3> for RadarSensor<T> {
    fn kind(&self) -> SensorKind {
        SensorKind::Radar
    }

    fn observe(&self, state: &StateVector<T, STATE_DIM>) -> Option<Measurement<T, 3>> {
        let px = state.px();
        let py = state.py();
        let rho = Float::sqrt(px * px + py * py);

        if Float::is_nan(rho) || rho < self.min_range {
            return None;
        }

        let (vx, vy) = state.velocity();
        let phi = Float::atan2(py, px);
        let rho_dot = (px * vx + py * vy) / rho;

        Some(Measurement::from_array([rho, phi, rho_dot]))
    }

    fn measurement_noise(&self) -> MeasurementCovariance<T, 3> {
        MeasurementCovariance::from_diagonal(&nalgebra::vector![
            self.std_rho * self.std_rho,
            self.std_phi * self.std_phi,
            self.std_rhod * self.std_rhod
        ])
    }

    fn angular_components(&self) -> &'static [usize] {
        &[1]
    }

    fn initial_state(&self, measurement: &Measurement<T, 3>) -> StateVector<T, STATE_DIM> {
        let rho = *measurement.index(0);
        let (sin_phi, cos_phi) = Float::sin_cos(*measurement.index(1));
        let zero = T::zero();
        StateVector::ctrv(rho * cos_phi, rho * sin_phi, zero, zero, zero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::FRAC_PI_2;

    #[test]
    fn test_lidar_observe() {
        let sensor = LidarSensor::new(0.15_f64, 0.15);
        let state = StateVector::ctrv(10.0, 20.0, 1.0, 2.0, 0.1);

        let z = sensor.observe(&state).unwrap();
        assert_eq!(*z.index(0), 10.0);
        assert_eq!(*z.index(1), 20.0);
        assert!(sensor.angular_components().is_empty());
    }

    #[test]
    fn test_lidar_noise() {
        let sensor = LidarSensor::new(0.15_f64, 0.2);
        let r = sensor.measurement_noise();
        assert!((r.as_matrix()[(0, 0)] - 0.0225).abs() < 1e-12);
        assert!((r.as_matrix()[(1, 1)] - 0.04).abs() < 1e-12);
        assert_eq!(r.as_matrix()[(0, 1)], 0.0);
    }

    #[test]
    fn test_lidar_initial_state() {
        let sensor = LidarSensor::new(0.15_f64, 0.15);
        let x = sensor.initial_state(&Measurement::from_array([3.0, 4.0]));
        assert_eq!(x.as_slice(), &[3.0, 4.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_radar_observe() {
        let sensor = RadarSensor::new(0.3_f64, 0.03, 0.3);
        // At (3, 4) moving straight away from the sensor at 2 m/s
        let heading = Float::atan2(4.0_f64, 3.0);
        let state = StateVector::ctrv(3.0, 4.0, 2.0, heading, 0.0);

        let z = sensor.observe(&state).unwrap();
        assert!((z.index(0) - 5.0).abs() < 1e-12);
        assert!((z.index(1) - heading).abs() < 1e-12);
        assert!((z.index(2) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_radar_tangential_motion_has_zero_range_rate() {
        let sensor = RadarSensor::new(0.3_f64, 0.03, 0.3);
        let state = StateVector::ctrv(10.0, 0.0, 5.0, FRAC_PI_2, 0.0);

        let z = sensor.observe(&state).unwrap();
        assert!(z.index(2).abs() < 1e-12);
    }

    #[test]
    fn test_radar_degenerate_at_origin() {
        let sensor = RadarSensor::new(0.3_f64, 0.03, 0.3);
        let state = StateVector::ctrv(0.0, 0.0, 5.0, 0.0, 0.0);
        assert!(sensor.observe(&state).is_none());

        let nan_state = StateVector::ctrv(f64::NAN, 0.0, 5.0, 0.0, 0.0);
        assert!(sensor.observe(&nan_state).is_none());
    }

    #[test]
    fn test_radar_residual_wraps_bearing() {
        let sensor = RadarSensor::new(0.3_f64, 0.03, 0.3);
        let a = nalgebra::vector![1.0, 3.0, 0.0];
        let b = nalgebra::vector![1.0, -3.0, 0.0];

        let r = sensor.residual(&a, &b);
        assert!((r[1] - (6.0 - 2.0 * core::f64::consts::PI)).abs() < 1e-12);
    }

    #[test]
    fn test_radar_initial_state() {
        let sensor = RadarSensor::new(0.3_f64, 0.03, 0.3);
        let x = sensor.initial_state(&Measurement::from_array([5.0, 0.0, 1.5]));
        assert_eq!(x.as_slice(), &[5.0, 0.0, 0.0, 0.0, 0.0]);
    }
}
