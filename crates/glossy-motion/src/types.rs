use glam::{DQuat, DVec3};

/// Raw sensor reading from a device IMU.
#[derive(Debug, Clone, Copy)]
pub struct RawImuSample {
    /// Gyroscope angular velocity (rad/s).
    pub gyro: DVec3,
    /// Accelerometer linear acceleration (m/s^2).
    pub accel: DVec3,
}

/// Device attitude at a point in time.
///
/// The quaternion is expected to be unit length. Nothing downstream
/// validates this; results for non-unit input are unspecified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attitude {
    pub quaternion: DQuat,
}

impl Attitude {
    pub fn new(quaternion: DQuat) -> Self {
        Self { quaternion }
    }

    /// Attitude from raw components in `(w, x, y, z)` order.
    pub fn from_wxyz(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self {
            quaternion: DQuat::from_xyzw(x, y, z, w),
        }
    }
}

impl Default for Attitude {
    fn default() -> Self {
        Self {
            quaternion: DQuat::IDENTITY,
        }
    }
}

/// Interface orientation reported by the host UI.
///
/// Only the portrait and landscape variants drive the estimator. The rest
/// leave its state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScreenOrientation {
    #[default]
    Portrait,
    LandscapeLeft,
    LandscapeRight,
    PortraitUpsideDown,
    Unknown,
}

/// Coarse tilt classification selecting the active roll formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zone {
    /// Primary angle below the upright band.
    #[default]
    Down,
    /// Within `epsilon` of upright.
    Front,
    /// Primary angle above the upright band.
    Up,
}
