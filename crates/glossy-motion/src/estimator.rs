use crate::types::{Attitude, ScreenOrientation, Zone};
use glam::{DQuat, DVec2};
use std::f64::consts::{FRAC_PI_2, PI};

/// Tuning for [`OrientationEstimator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorConfig {
    /// Half width of the `Front` band around upright (radians).
    pub epsilon: f64,
    /// Roll rate multiplier while in the `Front` zone.
    pub front_roll_factor: f64,
    /// Output scale applied to `(roll, pitch)`.
    pub gain: DVec2,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.4,
            front_roll_factor: 0.7,
            gain: DVec2::new(-4.0, -2.0),
        }
    }
}

/// Roll (`phi`), pitch (`theta`) and yaw (`psi`) extracted from a quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerAngles {
    pub phi: f64,
    pub theta: f64,
    pub psi: f64,
}

impl EulerAngles {
    pub fn from_quat(q: DQuat) -> Self {
        let (w, x, y, z) = (q.w, q.x, q.y, q.z);

        let sinr_cosp = 2.0 * (w * x + y * z);
        let cosr_cosp = 1.0 - 2.0 * (x * x + y * y);
        let sinp = 2.0 * (w * y - z * x);
        let siny_cosp = 2.0 * (w * z + x * y);
        let cosy_cosp = 1.0 - 2.0 * (y * y + z * z);

        // Clamp at the poles, asin would return NaN for |sinp| > 1.
        let theta = if sinp.abs() >= 1.0 {
            FRAC_PI_2.copysign(sinp)
        } else {
            sinp.asin()
        };

        Self {
            phi: sinr_cosp.atan2(cosr_cosp),
            theta,
            psi: siny_cosp.atan2(cosy_cosp),
        }
    }

    /// Reorder the angles for the given screen orientation.
    ///
    /// Returns `None` for orientations the estimator does not track.
    pub fn remap(self, orientation: ScreenOrientation) -> Option<OrientedAngles> {
        let (primary, secondary) = match orientation {
            ScreenOrientation::Portrait => (self.phi, self.theta),
            ScreenOrientation::LandscapeLeft => (self.theta, self.phi),
            ScreenOrientation::LandscapeRight => (self.theta, -self.phi),
            ScreenOrientation::PortraitUpsideDown | ScreenOrientation::Unknown => return None,
        };
        Some(OrientedAngles {
            primary,
            secondary,
            tertiary: self.psi,
        })
    }
}

/// Angles already mapped to the current screen orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedAngles {
    /// Tilt towards/away from the user. Drives zone and pitch.
    pub primary: f64,
    /// Sideways tilt. Drives roll in `Down` and `Up`.
    pub secondary: f64,
    /// Heading. Drives roll in `Front`.
    pub tertiary: f64,
}

/// Converts attitude samples into a continuous 2D reflection offset.
///
/// Roll is accumulated across zone changes: on every transition the
/// reference angles and the roll reached so far are frozen, so the new
/// formula starts from a zero delta and the output never jumps.
#[derive(Debug, Clone)]
pub struct OrientationEstimator {
    config: EstimatorConfig,
    zone: Zone,
    base_theta: f64,
    base_psi: f64,
    base_roll: f64,
    last_roll: f64,
    pitch: f64,
}

impl OrientationEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            config,
            zone: Zone::Down,
            base_theta: 0.0,
            base_psi: 0.0,
            base_roll: 0.0,
            last_roll: 0.0,
            pitch: 0.0,
        }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    /// `(roll, pitch)` before gain.
    pub fn raw(&self) -> DVec2 {
        DVec2::new(self.last_roll, self.pitch)
    }

    /// Latest output offset, gain applied.
    pub fn offset(&self) -> DVec2 {
        self.config.gain * self.raw()
    }

    /// Feed one attitude sample and return the new offset.
    ///
    /// Untracked orientations leave the state as is and return the
    /// previous offset.
    pub fn update(&mut self, attitude: &Attitude, orientation: ScreenOrientation) -> DVec2 {
        match EulerAngles::from_quat(attitude.quaternion).remap(orientation) {
            Some(angles) => self.update_angles(angles),
            None => self.offset(),
        }
    }

    /// Feed angles that are already remapped to the screen orientation.
    pub fn update_angles(&mut self, angles: OrientedAngles) -> DVec2 {
        let zone = self.classify(angles.primary);
        if zone != self.zone {
            self.base_theta = angles.secondary;
            self.base_psi = angles.tertiary;
            self.base_roll = self.last_roll;
            tracing::debug!(from = ?self.zone, to = ?zone, "Zone transition");
            self.zone = zone;
        }

        self.pitch = angles.primary / PI;

        let delta = match self.zone {
            Zone::Down => (angles.secondary - self.base_theta) / PI,
            Zone::Front => -self.config.front_roll_factor * (angles.tertiary - self.base_psi) / PI,
            Zone::Up => -(angles.secondary - self.base_theta) / PI,
        };
        self.last_roll = delta + self.base_roll;

        self.offset()
    }

    /// Zone for a primary angle. Anything within `epsilon` of upright is `Front`.
    pub fn classify(&self, primary: f64) -> Zone {
        if primary < FRAC_PI_2 - self.config.epsilon {
            Zone::Down
        } else if primary > FRAC_PI_2 + self.config.epsilon {
            Zone::Up
        } else {
            Zone::Front
        }
    }

    /// Forget all accumulated state.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }
}

impl Default for OrientationEstimator {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}
