//! Engine configuration
//!
//! Process noise is a tuning knob. Sensor noise comes from the sensor
//! manufacturer and the defaults below should normally be left alone.

use nalgebra::RealField;
use num_traits::Float;

use crate::types::measurement::SensorKind;
use crate::{FusionError, Result};

/// Process noise standard deviations of the CTRV model.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessNoise<T> {
    /// Longitudinal acceleration noise (m/s²)
    pub std_a: T,
    /// Yaw acceleration noise (rad/s²)
    pub std_yawdd: T,
}

/// Lidar measurement noise standard deviations.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LidarNoise<T> {
    /// Position x noise (m)
    pub std_px: T,
    /// Position y noise (m)
    pub std_py: T,
}

/// Radar measurement noise standard deviations.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RadarNoise<T> {
    /// Range noise (m)
    pub std_rho: T,
    /// Bearing noise (rad)
    pub std_phi: T,
    /// Range rate noise (m/s)
    pub std_rhod: T,
}

/// Full configuration of a [`FusionEngine`](crate::filters::engine::FusionEngine).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FusionConfig<T> {
    /// Apply lidar updates after initialization
    pub use_lidar: bool,
    /// Apply radar updates after initialization
    pub use_radar: bool,
    /// Feeds the augmented state of every prediction
    pub process_noise: ProcessNoise<T>,
    /// R of the lidar update
    pub lidar_noise: LidarNoise<T>,
    /// R of the radar update
    pub radar_noise: RadarNoise<T>,
}

impl<T: RealField + Float + Copy> Default for ProcessNoise<T> {
    fn default() -> Self {
        Self {
            std_a: T::from_f64(2.0).unwrap(),
            std_yawdd: T::from_f64(0.3).unwrap(),
        }
    }
}

impl<T: RealField + Float + Copy> Default for LidarNoise<T> {
    fn default() -> Self {
        Self {
            std_px: T::from_f64(0.15).unwrap(),
            std_py: T::from_f64(0.15).unwrap(),
        }
    }
}

impl<T: RealField + Float + Copy> Default for RadarNoise<T> {
    fn default() -> Self {
        Self {
            std_rho: T::from_f64(0.3).unwrap(),
            std_phi: T::from_f64(0.03).unwrap(),
            std_rhod: T::from_f64(0.3).unwrap(),
        }
    }
}

impl<T: RealField + Float + Copy> Default for FusionConfig<T> {
    fn default() -> Self {
        Self {
            use_lidar: true,
            use_radar: true,
            process_noise: ProcessNoise::default(),
            lidar_noise: LidarNoise::default(),
            radar_noise: RadarNoise::default(),
        }
    }
}

impl<T: RealField + Float + Copy> FusionConfig<T> {
    /// Enables or disables lidar updates.
    pub fn with_lidar(mut self, enabled: bool) -> Self {
        self.use_lidar = enabled;
        self
    }

    /// Enables or disables radar updates.
    pub fn with_radar(mut self, enabled: bool) -> Self {
        self.use_radar = enabled;
        self
    }

    /// Sets the process noise standard deviations.
    pub fn with_process_noise(mut self, std_a: T, std_yawdd: T) -> Self {
        self.process_noise = ProcessNoise { std_a, std_yawdd };
        self
    }

    /// Whether updates from `kind` are applied.
    #[inline]
    pub fn is_enabled(&self, kind: SensorKind) -> bool {
        match kind {
            SensorKind::Lidar => self.use_lidar,
            SensorKind::Radar => self.use_radar,
        }
    }

    /// Checks the configuration for conditions under which the engine could
    /// never produce a valid estimate.
    ///
    /// # Errors
    /// - `NoSensorEnabled` if both sensors are disabled
    /// - `InvalidNoise` if any noise standard deviation is not a positive finite number
    pub fn validate(&self) -> Result<()> {
        if !self.use_lidar && !self.use_radar {
            return Err(FusionError::NoSensorEnabled);
        }

        // Zero process noise would make the augmented covariance singular.
        let positive = |v: T| Float::is_finite(v) && v > T::zero();

        let process_ok =
            positive(self.process_noise.std_a) && positive(self.process_noise.std_yawdd);
        let lidar_ok = positive(self.lidar_noise.std_px) && positive(self.lidar_noise.std_py);
        let radar_ok = positive(self.radar_noise.std_rho)
            && positive(self.radar_noise.std_phi)
            && positive(self.radar_noise.std_rhod);

        if process_ok && lidar_ok && radar_ok {
            Ok(())
        } else {
            Err(FusionError::InvalidNoise)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config: FusionConfig<f64> = FusionConfig::default();
        assert!(config.use_lidar && config.use_radar);
        assert!((config.process_noise.std_a - 2.0).abs() < 1e-12);
        assert!((config.process_noise.std_yawdd - 0.3).abs() < 1e-12);
        assert!((config.lidar_noise.std_px - 0.15).abs() < 1e-12);
        assert!((config.radar_noise.std_phi - 0.03).abs() < 1e-12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_both_sensors_disabled() {
        let config: FusionConfig<f64> = FusionConfig::default().with_lidar(false).with_radar(false);
        assert_eq!(config.validate(), Err(FusionError::NoSensorEnabled));
    }

    #[test]
    fn test_single_sensor_is_valid() {
        let config: FusionConfig<f64> = FusionConfig::default().with_radar(false);
        assert!(config.validate().is_ok());
        assert!(config.is_enabled(SensorKind::Lidar));
        assert!(!config.is_enabled(SensorKind::Radar));
    }

    #[test]
    fn test_invalid_noise() {
        let config: FusionConfig<f64> = FusionConfig::default().with_process_noise(-1.0, 0.3);
        assert_eq!(config.validate(), Err(FusionError::InvalidNoise));

        let mut config: FusionConfig<f64> = FusionConfig::default();
        config.radar_noise.std_phi = 0.0;
        assert_eq!(config.validate(), Err(FusionError::InvalidNoise));
    }

    #[test]
    fn test_zero_process_noise_rejected() {
        let config: FusionConfig<f64> = FusionConfig::default().with_process_noise(0.0, 0.3);
        assert_eq!(config.validate(), Err(FusionError::InvalidNoise));
    }
}
