//! Estimation engine
//!
//! Owns the single-object estimate and runs the init → predict → update cycle
//! for every incoming measurement package.

use log::{debug, trace, warn};
use nalgebra::RealField;
use num_traits::Float;

use super::ukf::{predict, SigmaWeights, UkfParams, UkfState, SIGMA_POINT_COUNT};
use super::update::update;
use crate::config::FusionConfig;
use crate::models::{Ctrv2D, LidarSensor, NonlinearObservationModel, RadarSensor, AUGMENTED_DIM, STATE_DIM};
use crate::types::measurement::{MeasurementPackage, SensorKind, SensorReading};
use crate::types::spaces::{CtrvState, StateCovariance};
use crate::utils::{DiscardNis, NisSample, NisSink};
use crate::{FusionError, Result};

/// Timestamps are in microseconds; the motion model works in seconds.
pub const MICROS_PER_SECOND: f64 = 1e6;

/// Why a measurement update was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A predicted sigma point fell inside the radar's minimum range.
    ///
    /// A stationary track sitting on the sensor keeps hitting this on every
    /// radar package; only a lidar update can move it away.
    DegenerateGeometry,
}

/// What one call to [`FusionEngine::process_measurement`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome<T> {
    /// First measurement: the state was set from it, no prediction ran
    Initialized(SensorKind),
    /// Prediction and update both ran
    Updated(NisSample<T>),
    /// The sensor is disabled, so only the prediction was applied
    PredictedOnly(SensorKind),
    /// The prediction was applied but the update could not be computed
    UpdateSkipped {
        /// Sensor of the skipped package
        kind: SensorKind,
        reason: SkipReason,
    },
}

#[derive(Debug, Clone, Copy)]
enum Phase<T: RealField> {
    Uninitialized,
    Tracking {
        last_timestamp_us: i64,
        weights: SigmaWeights<T, SIGMA_POINT_COUNT>,
    },
}

/// Unscented Kalman filter tracking one object with lidar and radar.
///
/// Every call either completes and commits a new estimate, or fails and
/// leaves the estimate, the timestamp and the phase exactly as they were.
/// NIS values of completed updates go to the sink `S`.
#[derive(Debug, Clone)]
pub struct FusionEngine<T: RealField, S = DiscardNis> {
    config: FusionConfig<T>,
    params: UkfParams<T>,
    transition: Ctrv2D<T>,
    lidar: LidarSensor<T>,
    radar: RadarSensor<T>,
    estimate: UkfState<T, STATE_DIM>,
    phase: Phase<T>,
    sink: S,
}

impl<T: RealField + Float + Copy> FusionEngine<T, DiscardNis> {
    /// Creates an engine that discards NIS values.
    ///
    /// # Errors
    /// Configuration errors from [`FusionConfig::validate`].
    pub fn new(config: FusionConfig<T>) -> Result<Self> {
        Self::with_sink(config, DiscardNis)
    }
}

impl<T: RealField + Float + Copy, S: NisSink<T>> FusionEngine<T, S> {
    /// Creates an engine that reports NIS values to `sink`.
    ///
    /// # Errors
    /// Configuration errors from [`FusionConfig::validate`].
    pub fn with_sink(config: FusionConfig<T>, sink: S) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            params: UkfParams::default(),
            transition: Ctrv2D::from_noise(&config.process_noise),
            lidar: LidarSensor::from_noise(&config.lidar_noise),
            radar: RadarSensor::from_noise(&config.radar_noise),
            estimate: UkfState::new(CtrvState::zeros(), StateCovariance::identity()),
            phase: Phase::Uninitialized,
            config,
            sink,
        })
    }

    /// Runs one filter cycle for `package`.
    ///
    /// The first package initializes the state. Every later one predicts
    /// forward to its timestamp and then, if its sensor is enabled, applies
    /// the matching measurement update.
    ///
    /// # Errors
    /// - `NonFiniteMeasurement` if the reading contains NaN or infinities
    /// - `NonMonotonicTimestamp` if the timestamp precedes the previous one
    /// - `NotPositiveDefinite`, `SingularMatrix` or `NumericalInstability`
    ///   if the filter diverged; [`reset`](Self::reset) to recover
    pub fn process_measurement(&mut self, package: &MeasurementPackage<T>) -> Result<CycleOutcome<T>> {
        let kind = package.sensor_kind();
        if !package.is_finite() {
            warn!("Rejecting non-finite {} measurement at {} us", kind, package.timestamp_us);
            return Err(FusionError::NonFiniteMeasurement);
        }

        let (last_timestamp_us, weights) = match self.phase {
            Phase::Tracking {
                last_timestamp_us,
                weights,
            } => (last_timestamp_us, weights),
            Phase::Uninitialized => return Ok(self.initialize(package)),
        };

        if package.timestamp_us < last_timestamp_us {
            warn!(
                "Rejecting {} measurement at {} us: previous measurement was at {} us",
                kind, package.timestamp_us, last_timestamp_us
            );
            return Err(FusionError::NonMonotonicTimestamp {
                previous: last_timestamp_us,
                current: package.timestamp_us,
            });
        }

        let elapsed_us = package
            .timestamp_us
            .checked_sub(last_timestamp_us)
            .and_then(T::from_i64)
            .ok_or_else(|| {
                warn!(
                    "Elapsed time from {} us to {} us is not representable",
                    last_timestamp_us, package.timestamp_us
                );
                FusionError::NumericalInstability
            })?;
        let dt = elapsed_us / T::from_f64(MICROS_PER_SECOND).unwrap();

        let prediction = predict(&self.transition, &self.estimate, &weights, &self.params, dt)
            .map_err(|e| {
                warn!("Prediction failed at {} us: {}", package.timestamp_us, e);
                e
            })?;

        if !self.config.is_enabled(kind) {
            self.commit(prediction.state, package.timestamp_us, weights);
            debug!("Predicted to {} us, {} updates disabled", package.timestamp_us, kind);
            return Ok(CycleOutcome::PredictedOnly(kind));
        }

        let updated = match &package.reading {
            SensorReading::Lidar(z) => update(&self.lidar, &prediction, &weights, z).map(|u| (u.state, u.nis)),
            SensorReading::Radar(z) => update(&self.radar, &prediction, &weights, z).map(|u| (u.state, u.nis)),
        };

        match updated {
            Ok((state, nis)) => {
                self.commit(state, package.timestamp_us, weights);
                let sample = NisSample {
                    kind,
                    nis,
                    timestamp_us: package.timestamp_us,
                };
                self.sink.record(sample);
                debug!("{} update at {} us, NIS {:?}", kind, package.timestamp_us, nis);
                Ok(CycleOutcome::Updated(sample))
            }
            Err(FusionError::DegenerateGeometry) => {
                self.commit(prediction.state, package.timestamp_us, weights);
                warn!(
                    "Skipping {} update at {} us: predicted range below {:?} m",
                    kind, package.timestamp_us, self.radar.min_range
                );
                Ok(CycleOutcome::UpdateSkipped {
                    kind,
                    reason: SkipReason::DegenerateGeometry,
                })
            }
            Err(e) => {
                warn!("{} update failed at {} us: {}", kind, package.timestamp_us, e);
                Err(e)
            }
        }
    }

    fn initialize(&mut self, package: &MeasurementPackage<T>) -> CycleOutcome<T> {
        let mean = match &package.reading {
            SensorReading::Lidar(z) => self.lidar.initial_state(z),
            SensorReading::Radar(z) => self.radar.initial_state(z),
        };

        self.estimate = UkfState::with_identity_covariance(mean);
        self.phase = Phase::Tracking {
            last_timestamp_us: package.timestamp_us,
            weights: SigmaWeights::new(&self.params, AUGMENTED_DIM),
        };

        let kind = package.sensor_kind();
        debug!(
            "Initialized from {} at {} us: x = {:?}",
            kind,
            package.timestamp_us,
            mean.as_slice()
        );
        CycleOutcome::Initialized(kind)
    }

    fn commit(
        &mut self,
        state: UkfState<T, STATE_DIM>,
        timestamp_us: i64,
        weights: SigmaWeights<T, SIGMA_POINT_COUNT>,
    ) {
        self.estimate = state;
        self.phase = Phase::Tracking {
            last_timestamp_us: timestamp_us,
            weights,
        };
        trace!("x = {:?}", self.estimate.mean.as_slice());
        trace!("P = {:?}", self.estimate.covariance.as_matrix());
    }

    /// Forgets the estimate; the next measurement initializes again.
    pub fn reset(&mut self) {
        debug!("Engine reset");
        self.estimate = UkfState::new(CtrvState::zeros(), StateCovariance::identity());
        self.phase = Phase::Uninitialized;
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current state `[px, py, v, yaw, yaw_rate]`.
    #[inline]
    pub fn state(&self) -> &CtrvState<T> {
        &self.estimate.mean
    }

    #[inline]
    pub fn covariance(&self) -> &StateCovariance<T, STATE_DIM> {
        &self.estimate.covariance
    }

    /// State and covariance together.
    #[inline]
    pub fn estimate(&self) -> &UkfState<T, STATE_DIM> {
        &self.estimate
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        matches!(self.phase, Phase::Tracking { .. })
    }

    /// Timestamp of the last accepted measurement.
    #[inline]
    pub fn last_timestamp(&self) -> Option<i64> {
        match self.phase {
            Phase::Tracking {
                last_timestamp_us, ..
            } => Some(last_timestamp_us),
            Phase::Uninitialized => None,
        }
    }

    #[inline]
    pub fn config(&self) -> &FusionConfig<T> {
        &self.config
    }

    #[inline]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    #[inline]
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
