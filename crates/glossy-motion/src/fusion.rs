use crate::error::MotionError;
use crate::types::{Attitude, RawImuSample};
use ahrs::{Ahrs, Madgwick};
use glam::{DQuat, DVec3};
use nalgebra::Vector3;

/// Attitude from raw gyro and accelerometer readings, for hosts that only
/// report those.
///
/// The first readings after construction (or [`recalibrate`](Self::recalibrate))
/// are averaged into a gyro bias while the device rests. Attitudes are
/// reported relative to the pose captured by [`set_zero`](Self::set_zero).
pub struct SensorFusion {
    filter: Madgwick<f64>,
    bias: BiasWindow,
    home: DQuat,
}

/// Running mean of resting gyro readings.
struct BiasWindow {
    sum: DVec3,
    seen: usize,
    needed: usize,
}

impl BiasWindow {
    fn new(needed: u32) -> Self {
        Self {
            sum: DVec3::ZERO,
            seen: 0,
            needed: needed as usize,
        }
    }

    fn is_full(&self) -> bool {
        self.seen >= self.needed
    }

    fn mean(&self) -> DVec3 {
        if self.seen == 0 {
            DVec3::ZERO
        } else {
            self.sum / self.seen as f64
        }
    }
}

impl SensorFusion {
    pub fn new(sample_period: f64, beta: f64, calibration_samples: u32) -> Self {
        Self {
            filter: Madgwick::new(sample_period, beta),
            bias: BiasWindow::new(calibration_samples),
            home: DQuat::IDENTITY,
        }
    }

    /// Feed one reading. Returns `Calibrating` until the bias window is full;
    /// the reading that fills it is already fused.
    pub fn update(&mut self, sample: &RawImuSample) -> Result<Attitude, MotionError> {
        if !self.bias.is_full() {
            self.bias.sum += sample.gyro;
            self.bias.seen += 1;
            if !self.bias.is_full() {
                return Err(MotionError::Calibrating {
                    collected: self.bias.seen,
                    target: self.bias.needed,
                });
            }
            let bias = self.bias.mean();
            tracing::info!(x = bias.x, y = bias.y, z = bias.z, "Gyro bias estimated");
        }

        let gyro = Vector3::from((sample.gyro - self.bias.mean()).to_array());
        let accel = Vector3::from(sample.accel.to_array());
        self.filter
            .update_imu(&gyro, &accel)
            .map_err(|_| MotionError::FusionRejected)?;

        Ok(Attitude::new(self.home.inverse() * self.filtered()))
    }

    /// Report the current pose as identity from now on.
    pub fn set_zero(&mut self) {
        self.home = self.filtered();
        tracing::info!("Home attitude captured");
    }

    pub fn recalibrate(&mut self, samples: u32) {
        self.bias = BiasWindow::new(samples);
        tracing::info!(samples, "Gyro bias window reset");
    }

    pub fn is_calibrated(&self) -> bool {
        self.bias.is_full()
    }

    /// Current bias estimate. Zero until the first reading.
    pub fn gyro_bias(&self) -> DVec3 {
        self.bias.mean()
    }

    fn filtered(&self) -> DQuat {
        // Coordinates are laid out [i, j, k, w], matching glam's xyzw.
        DQuat::from_slice(self.filter.quat.coords.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resting(gyro: DVec3) -> RawImuSample {
        RawImuSample {
            gyro,
            accel: DVec3::new(0.0, 0.0, 9.81),
        }
    }

    #[test]
    fn reports_calibration_progress() {
        let mut fusion = SensorFusion::new(0.01, 0.1, 3);
        let err = fusion.update(&resting(DVec3::ZERO)).unwrap_err();
        assert!(matches!(err, MotionError::Calibrating { collected: 1, target: 3 }));
        assert!(fusion.update(&resting(DVec3::ZERO)).is_err());
        assert!(!fusion.is_calibrated());

        assert!(fusion.update(&resting(DVec3::ZERO)).is_ok());
        assert!(fusion.is_calibrated());
    }

    #[test]
    fn averages_gyro_bias() {
        let mut fusion = SensorFusion::new(0.01, 0.1, 2);
        let _ = fusion.update(&resting(DVec3::new(0.02, 0.0, -0.04)));
        let _ = fusion.update(&resting(DVec3::new(0.04, 0.0, -0.02)));
        let bias = fusion.gyro_bias();
        assert!((bias.x - 0.03).abs() < 1e-12);
        assert!((bias.z + 0.03).abs() < 1e-12);
    }

    #[test]
    fn resting_flat_stays_at_identity() {
        let mut fusion = SensorFusion::new(0.01, 0.1, 1);
        let mut last = Attitude::default();
        for _ in 0..50 {
            last = fusion.update(&resting(DVec3::ZERO)).unwrap();
        }
        assert!(last.quaternion.abs_diff_eq(DQuat::IDENTITY, 1e-6));
    }

    #[test]
    fn zero_pose_reads_as_identity() {
        let mut fusion = SensorFusion::new(0.01, 0.5, 1);
        // Gravity along +y: the filter settles on a tilted attitude.
        let tilted = RawImuSample {
            gyro: DVec3::ZERO,
            accel: DVec3::new(0.0, 9.81, 0.0),
        };
        let mut before = Attitude::default();
        for _ in 0..1000 {
            before = fusion.update(&tilted).unwrap();
        }
        assert!(!before.quaternion.abs_diff_eq(DQuat::IDENTITY, 1e-3));

        fusion.set_zero();
        let after = fusion.update(&tilted).unwrap();
        assert!(after.quaternion.abs_diff_eq(DQuat::IDENTITY, 1e-3));
    }

    #[test]
    fn recalibrate_restarts_collection() {
        let mut fusion = SensorFusion::new(0.01, 0.1, 1);
        assert!(fusion.update(&resting(DVec3::ZERO)).is_ok());
        fusion.recalibrate(2);
        assert!(!fusion.is_calibrated());
        assert!(fusion.update(&resting(DVec3::ZERO)).is_err());
    }
}
