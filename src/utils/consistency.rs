//! Filter consistency checking
//!
//! Every update produces a Normalized Innovation Squared (NIS) value. For a
//! well-tuned filter NIS follows a chi-square distribution whose degrees of
//! freedom equal the measurement dimension, so roughly 5% of samples should
//! exceed the 95% quantile.

use nalgebra::RealField;
use num_traits::{Float, ToPrimitive};

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::types::measurement::SensorKind;

/// 95% quantile of the chi-square distribution with 2 degrees of freedom.
pub const CHI_SQUARE_95_DOF2: f64 = 5.991;

/// 95% quantile of the chi-square distribution with 3 degrees of freedom.
pub const CHI_SQUARE_95_DOF3: f64 = 7.815;

/// 95% chi-square quantile for `dof` degrees of freedom.
///
/// Only the dimensions produced by the supported sensors are tabulated.
pub fn chi_square_95(dof: usize) -> Option<f64> {
    match dof {
        1 => Some(3.841),
        2 => Some(CHI_SQUARE_95_DOF2),
        3 => Some(CHI_SQUARE_95_DOF3),
        4 => Some(9.488),
        _ => None,
    }
}

/// One NIS value emitted by a measurement update.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NisSample<T> {
    /// Sensor whose update produced the value
    pub kind: SensorKind,
    /// yᵀ S⁻¹ y
    pub nis: T,
    /// Timestamp of the measurement (microseconds)
    pub timestamp_us: i64,
}

impl<T: RealField + Float + Copy> NisSample<T> {
    /// True if the sample exceeds the sensor's 95% chi-square quantile.
    pub fn exceeds_95(&self) -> bool {
        let threshold = chi_square_95(self.kind.dimension()).unwrap_or(f64::INFINITY);
        match ToPrimitive::to_f64(&self.nis) {
            Some(nis) => nis > threshold,
            None => false,
        }
    }
}

/// Receiver of NIS values.
///
/// The engine owns a sink and hands it one sample per completed update.
/// Closures taking a [`NisSample`] are sinks.
pub trait NisSink<T> {
    fn record(&mut self, sample: NisSample<T>);
}

impl<T, F> NisSink<T> for F
where
    F: FnMut(NisSample<T>),
{
    #[inline]
    fn record(&mut self, sample: NisSample<T>) {
        self(sample)
    }
}

/// Sink that drops every sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscardNis;

impl<T> NisSink<T> for DiscardNis {
    #[inline]
    fn record(&mut self, _sample: NisSample<T>) {}
}

/// Collects NIS samples, kept apart per sensor.
#[cfg(feature = "alloc")]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NisLog<T> {
    lidar: Vec<NisSample<T>>,
    radar: Vec<NisSample<T>>,
}

#[cfg(feature = "alloc")]
impl<T: RealField + Float + Copy> NisLog<T> {
    pub fn new() -> Self {
        Self {
            lidar: Vec::new(),
            radar: Vec::new(),
        }
    }

    /// Samples recorded for one sensor, in arrival order.
    pub fn samples(&self, kind: SensorKind) -> &[NisSample<T>] {
        match kind {
            SensorKind::Lidar => &self.lidar,
            SensorKind::Radar => &self.radar,
        }
    }

    pub fn len(&self) -> usize {
        self.lidar.len() + self.radar.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lidar.is_empty() && self.radar.is_empty()
    }

    /// Mean NIS for one sensor; approaches the measurement dimension when
    /// the filter is consistent.
    pub fn mean(&self, kind: SensorKind) -> Option<T> {
        let samples = self.samples(kind);
        if samples.is_empty() {
            return None;
        }
        let sum = samples.iter().fold(T::zero(), |acc, s| acc + s.nis);
        Some(sum / T::from_usize(samples.len()).unwrap())
    }

    /// Fraction of one sensor's samples above its 95% chi-square quantile.
    pub fn fraction_above_95(&self, kind: SensorKind) -> Option<f64> {
        fraction_above_95(self.samples(kind))
    }

    pub fn clear(&mut self) {
        self.lidar.clear();
        self.radar.clear();
    }
}

#[cfg(feature = "alloc")]
impl<T> NisSink<T> for NisLog<T> {
    fn record(&mut self, sample: NisSample<T>) {
        match sample.kind {
            SensorKind::Lidar => self.lidar.push(sample),
            SensorKind::Radar => self.radar.push(sample),
        }
    }
}

/// Fraction of samples above their sensor's 95% chi-square quantile, or
/// `None` for an empty slice.
pub fn fraction_above_95<T: RealField + Float + Copy>(samples: &[NisSample<T>]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let above = samples.iter().filter(|s| s.exceeds_95()).count();
    Some(above as f64 / samples.len() as f64)
}
