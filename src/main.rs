//! Example usage of the ctrv-fusion library
//!
//! Tracks a synthetic target driving a constant-rate turn, observed
//! alternately by a lidar and a radar.

use ctrv_fusion::prelude::*;

/// Ground truth at time `t` (seconds): `[px, py, vx, vy]` plus the CTRV state.
fn ground_truth(t: f64) -> (nalgebra::Vector4<f64>, CtrvState<f64>) {
    let speed = 5.0;
    let yaw_rate = 0.2;
    let yaw = 0.3 + yaw_rate * t;
    let radius = speed / yaw_rate;

    // Centre chosen so the target starts at (10, 5)
    let cx = 10.0 - radius * 0.3_f64.sin();
    let cy = 5.0 + radius * 0.3_f64.cos();
    let px = cx + radius * yaw.sin();
    let py = cy - radius * yaw.cos();

    let cartesian = nalgebra::vector![px, py, speed * yaw.cos(), speed * yaw.sin()];
    (cartesian, StateVector::ctrv(px, py, speed, yaw, yaw_rate))
}

/// Small deterministic disturbance standing in for sensor noise.
fn jitter(k: usize, scale: f64) -> f64 {
    scale * ((k as f64) * 1.7).sin()
}

fn main() {
    env_logger::init();

    println!("ctrv-fusion: Lidar/Radar UKF");
    println!("============================\n");

    let config = FusionConfig::default();
    let mut engine = match FusionEngine::with_sink(config, NisLog::new()) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return;
        }
    };

    let step_us: i64 = 50_000;
    let steps = 200;
    let mut rmse = RmseAccumulator::new();

    for k in 0..steps {
        let timestamp_us = k as i64 * step_us;
        let t = timestamp_us as f64 / MICROS_PER_SECOND;
        let (truth, state) = ground_truth(t);

        let package = if k % 2 == 0 {
            MeasurementPackage::lidar(
                timestamp_us,
                state.px() + jitter(k, 0.1),
                state.py() + jitter(k + 1, 0.1),
            )
        } else {
            let radar = RadarSensor::new(0.3, 0.03, 0.3);
            let z = match radar.observe(&state) {
                Some(z) => z,
                None => continue,
            };
            MeasurementPackage::radar(
                timestamp_us,
                z.index(0) + jitter(k, 0.2),
                z.index(1) + jitter(k + 1, 0.02),
                z.index(2) + jitter(k + 2, 0.2),
            )
        };

        match engine.process_measurement(&package) {
            Ok(CycleOutcome::Initialized(kind)) => {
                println!("Initialized from {} at t={:.2}s", kind, t);
            }
            Ok(CycleOutcome::UpdateSkipped { kind, reason }) => {
                println!("  t={:.2}s: {} update skipped ({:?})", t, kind, reason);
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("  t={:.2}s: filter error: {}", t, e);
                engine.reset();
                continue;
            }
        }

        rmse.add_state(engine.state(), &truth);

        if k % 40 == 0 {
            let x = engine.state();
            println!(
                "  t={:.2}s: pos=({:.2}, {:.2}), v={:.2}, yaw={:.2}, yaw_rate={:.3}",
                t,
                x.px(),
                x.py(),
                x.speed(),
                x.yaw(),
                x.yaw_rate()
            );
        }
    }

    println!();
    if let Some(r) = rmse.rmse() {
        println!(
            "RMSE over {} steps: px={:.3}, py={:.3}, vx={:.3}, vy={:.3}",
            rmse.count(),
            r[0],
            r[1],
            r[2],
            r[3]
        );
    }

    let log = engine.sink();
    for kind in [SensorKind::Lidar, SensorKind::Radar] {
        if let (Some(mean), Some(fraction)) = (log.mean(kind), log.fraction_above_95(kind)) {
            println!(
                "{} NIS: {} samples, mean {:.2} (expected {}), {:.1}% above 95% quantile",
                kind,
                log.samples(kind).len(),
                mean,
                kind.dimension(),
                fraction * 100.0
            );
        }
    }

    println!("\nTracking complete!");
}
