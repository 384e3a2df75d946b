use thiserror::Error;

#[derive(Debug, Error)]
pub enum MotionError {
    #[error("Motion sensing is not available on this device")]
    Unavailable,
    #[error("Gyro bias calibration in progress ({collected}/{target} samples)")]
    Calibrating { collected: usize, target: usize },
    #[error("Sensor fusion rejected the sample")]
    FusionRejected,
}
