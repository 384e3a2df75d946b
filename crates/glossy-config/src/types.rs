use glam::DVec2;
use glossy_motion::{EstimatorConfig, SensorFusion};
use glossy_view::{LayerKind, Reflex, ReflexLayer, ReflexStyle};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlossyConfig {
    /// Motion estimation and broadcast timing.
    pub motion: MotionConfig,
    /// Raw IMU fusion, used when the host only provides gyro/accel readings.
    pub fusion: FusionConfig,
    /// Reflection layers to create at startup.
    pub layers: Vec<LayerConfig>,
}

impl Default for GlossyConfig {
    fn default() -> Self {
        Self {
            motion: MotionConfig::default(),
            fusion: FusionConfig::default(),
            layers: LayerConfig::defaults(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Half width of the upright band in radians. Wider = fewer zone changes.
    pub epsilon: f64,
    /// Roll rate multiplier while held upright.
    pub front_roll_factor: f64,
    /// Output scale for `[roll, pitch]`.
    pub gain: [f64; 2],
    /// Broadcast period in milliseconds.
    pub tick_interval_ms: u64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.4,
            front_roll_factor: 0.7,
            gain: [-4.0, -2.0],
            tick_interval_ms: 50,
        }
    }
}

impl MotionConfig {
    pub fn estimator(&self) -> EstimatorConfig {
        EstimatorConfig {
            epsilon: self.epsilon,
            front_roll_factor: self.front_roll_factor,
            gain: DVec2::from_array(self.gain),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Madgwick filter beta parameter (convergence speed). Higher = more responsive, less smooth.
    pub madgwick_beta: f64,
    /// Expected time between raw samples in seconds.
    pub sample_period_s: f64,
    /// Number of stationary samples for gyro bias calibration.
    pub calibration_samples: u32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            madgwick_beta: 0.1,
            sample_period_s: 0.01,
            calibration_samples: 100,
        }
    }
}

impl FusionConfig {
    pub fn build(&self) -> SensorFusion {
        SensorFusion::new(self.sample_period_s, self.madgwick_beta, self.calibration_samples)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    pub name: String,
    pub kind: LayerKind,
    /// Bias added to every broadcast offset.
    pub initial_offset: [f64; 2],
    /// Gap between reflection tiles, in points.
    pub spacing: f64,
    pub style: ReflexStyle,
    /// Reflection tile size in points.
    pub tile_size: [f64; 2],
}

impl LayerConfig {
    pub fn reflex(&self) -> Reflex {
        Reflex::default()
            .with_spacing(self.spacing)
            .with_style(self.style)
    }

    pub fn build(&self) -> ReflexLayer {
        let layer = ReflexLayer::new(
            self.name.clone(),
            self.kind,
            self.reflex(),
            DVec2::from_array(self.tile_size),
        );
        layer.set_initial_offset(DVec2::from_array(self.initial_offset));
        layer
    }

    /// Default set: a logo image, a text label and a tiled wallpaper.
    pub fn defaults() -> Vec<LayerConfig> {
        vec![
            LayerConfig {
                name: "logo".into(),
                kind: LayerKind::Wrapped,
                initial_offset: [0.0, 0.0],
                spacing: 0.0,
                style: ReflexStyle::Grid3x3,
                tile_size: [240.0, 240.0],
            },
            LayerConfig {
                name: "label".into(),
                kind: LayerKind::Linear,
                initial_offset: [-0.01, -0.5],
                spacing: 0.0,
                style: ReflexStyle::Grid1x1,
                tile_size: [0.0, 0.0],
            },
            LayerConfig {
                name: "wallpaper".into(),
                kind: LayerKind::Wrapped,
                initial_offset: [0.0, -0.8],
                spacing: 480.0,
                style: ReflexStyle::Grid3x3,
                tile_size: [1024.0, 1024.0],
            },
        ]
    }
}
