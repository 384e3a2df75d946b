//! Device motion to reflection offset.
//!
//! [`OrientationEstimator`] turns attitude quaternions into a continuous
//! 2D offset. [`MotionSource`] implementations deliver those attitudes,
//! either pushed by the host or fused from raw IMU readings.

pub mod error;
pub mod estimator;
pub mod fusion;
pub mod source;
pub mod types;

pub use error::MotionError;
pub use estimator::{EstimatorConfig, EulerAngles, OrientationEstimator, OrientedAngles};
pub use fusion::SensorFusion;
pub use source::{
    attitude_channel, AttitudeFeed, FixedOrientation, ImuMotionSource, MotionSource,
    OrientationProvider, UnavailableMotionSource, WatchMotionSource,
};
pub use types::{Attitude, RawImuSample, ScreenOrientation, Zone};
