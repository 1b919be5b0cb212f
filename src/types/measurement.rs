//! Measurement packages
//!
//! A package pairs one sensor reading with the microsecond timestamp at which
//! it was taken. The reading's dimension is fixed by its sensor kind.

use core::fmt;

use nalgebra::RealField;
use num_traits::Float;

use super::spaces::Measurement;
use crate::{FusionError, Result};

/// Which sensor produced a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SensorKind {
    /// Cartesian position sensor: [px, py]
    Lidar,
    /// Polar sensor: [range, bearing, range_rate]
    Radar,
}

impl SensorKind {
    /// Number of measurement components produced by this sensor.
    #[inline]
    pub const fn dimension(self) -> usize {
        match self {
            SensorKind::Lidar => 2,
            SensorKind::Radar => 3,
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorKind::Lidar => write!(f, "lidar"),
            SensorKind::Radar => write!(f, "radar"),
        }
    }
}

/// A typed sensor reading.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "T: nalgebra::Scalar + serde::Serialize",
        deserialize = "T: nalgebra::Scalar + serde::Deserialize<'de>"
    ))
)]
pub enum SensorReading<T: RealField> {
    /// Position in meters
    Lidar(Measurement<T, 2>),
    /// Range (m), bearing (rad, in (-π, π]) and range rate (m/s)
    Radar(Measurement<T, 3>),
}

/// One measurement as delivered to the estimation engine.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "T: nalgebra::Scalar + serde::Serialize",
        deserialize = "T: nalgebra::Scalar + serde::Deserialize<'de>"
    ))
)]
pub struct MeasurementPackage<T: RealField> {
    /// Acquisition time in microseconds; non-decreasing across a stream
    pub timestamp_us: i64,
    /// The sensor reading
    pub reading: SensorReading<T>,
}

impl<T: RealField + Float + Copy> MeasurementPackage<T> {
    /// Creates a lidar package from a Cartesian position.
    #[inline]
    pub fn lidar(timestamp_us: i64, px: T, py: T) -> Self {
        Self {
            timestamp_us,
            reading: SensorReading::Lidar(Measurement::from_array([px, py])),
        }
    }

    /// Creates a radar package from range, bearing and range rate.
    #[inline]
    pub fn radar(timestamp_us: i64, rho: T, phi: T, rho_dot: T) -> Self {
        Self {
            timestamp_us,
            reading: SensorReading::Radar(Measurement::from_array([rho, phi, rho_dot])),
        }
    }

    /// Creates a package from a raw component slice, checking its length
    /// against the sensor kind.
    ///
    /// # Errors
    /// `MeasurementDimension` if the slice has the wrong length.
    pub fn from_raw(kind: SensorKind, raw: &[T], timestamp_us: i64) -> Result<Self> {
        let expected = kind.dimension();
        if raw.len() != expected {
            return Err(FusionError::MeasurementDimension {
                kind,
                expected,
                actual: raw.len(),
            });
        }

        Ok(match kind {
            SensorKind::Lidar => Self::lidar(timestamp_us, raw[0], raw[1]),
            SensorKind::Radar => Self::radar(timestamp_us, raw[0], raw[1], raw[2]),
        })
    }

    #[inline]
    pub fn sensor_kind(&self) -> SensorKind {
        match self.reading {
            SensorReading::Lidar(_) => SensorKind::Lidar,
            SensorReading::Radar(_) => SensorKind::Radar,
        }
    }

    /// Raw measurement components.
    #[inline]
    pub fn raw(&self) -> &[T] {
        match &self.reading {
            SensorReading::Lidar(z) => z.as_slice(),
            SensorReading::Radar(z) => z.as_slice(),
        }
    }

    /// True when every component is finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.raw().iter().all(|v| Float::is_finite(*v))
    }
}
