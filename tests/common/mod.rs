//! Common test helpers for engine integration tests

#![allow(dead_code)]

use ctrv_fusion::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Routes `log` output through the test harness.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One synthetic measurement together with the true state at its timestamp.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioStep {
    pub truth: CtrvState<f64>,
    pub package: MeasurementPackage<f64>,
}

impl ScenarioStep {
    /// Ground truth as `[px, py, vx, vy]`.
    pub fn truth_cartesian(&self) -> nalgebra::Vector4<f64> {
        RmseAccumulator::cartesian(&self.truth)
    }
}

/// Parameters of a synthetic single-object scenario.
#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    pub seed: u64,
    pub steps: usize,
    pub step_us: i64,
    pub initial: CtrvState<f64>,
    /// Acceleration noise driving the truth (std_a, std_yawdd)
    pub truth_noise: (f64, f64),
    pub lidar_noise: LidarNoise<f64>,
    pub radar_noise: RadarNoise<f64>,
}

impl Scenario {
    /// A gently turning target far from the sensor, alternating lidar and radar.
    pub fn turning(seed: u64, steps: usize) -> Self {
        Self {
            seed,
            steps,
            step_us: 50_000,
            initial: StateVector::ctrv(40.0, 25.0, 4.0, 0.3, 0.1),
            truth_noise: (0.0, 0.0),
            lidar_noise: LidarNoise::default(),
            radar_noise: RadarNoise::default(),
        }
    }

    /// Truth driven by the same process noise the filter assumes.
    pub fn with_truth_noise(mut self, std_a: f64, std_yawdd: f64) -> Self {
        self.truth_noise = (std_a, std_yawdd);
        self
    }

    pub fn generate(&self) -> Vec<ScenarioStep> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let accel = Normal::new(0.0, self.truth_noise.0).unwrap();
        let yaw_accel = Normal::new(0.0, self.truth_noise.1).unwrap();
        let lidar_px = Normal::new(0.0, self.lidar_noise.std_px).unwrap();
        let lidar_py = Normal::new(0.0, self.lidar_noise.std_py).unwrap();
        let radar_rho = Normal::new(0.0, self.radar_noise.std_rho).unwrap();
        let radar_phi = Normal::new(0.0, self.radar_noise.std_phi).unwrap();
        let radar_rhod = Normal::new(0.0, self.radar_noise.std_rhod).unwrap();

        // Only used for its dynamics; its noise parameters play no role here
        let dynamics = Ctrv2D::new(1.0, 1.0);
        let radar = RadarSensor::new(1.0, 1.0, 1.0);
        let dt = self.step_us as f64 / MICROS_PER_SECOND;

        let mut truth = self.initial;
        let mut steps = Vec::with_capacity(self.steps);

        for k in 0..self.steps {
            if k > 0 {
                let s = truth.as_slice();
                let augmented = nalgebra::SVector::<f64, 7>::from([
                    s[0],
                    s[1],
                    s[2],
                    s[3],
                    s[4],
                    accel.sample(&mut rng),
                    yaw_accel.sample(&mut rng),
                ]);
                truth = dynamics.predict_nonlinear(&augmented, dt);
            }

            let timestamp_us = k as i64 * self.step_us;
            let package = if k % 2 == 0 {
                MeasurementPackage::lidar(
                    timestamp_us,
                    truth.px() + lidar_px.sample(&mut rng),
                    truth.py() + lidar_py.sample(&mut rng),
                )
            } else {
                let z = radar
                    .observe(&truth)
                    .expect("Scenario target passed through the radar origin");
                MeasurementPackage::radar(
                    timestamp_us,
                    z.index(0) + radar_rho.sample(&mut rng),
                    normalize_angle(z.index(1) + radar_phi.sample(&mut rng)),
                    z.index(2) + radar_rhod.sample(&mut rng),
                )
            };

            steps.push(ScenarioStep { truth, package });
        }

        steps
    }
}
