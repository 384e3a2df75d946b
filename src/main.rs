use anyhow::Result;
use glam::{DQuat, DVec3, EulerRot};
use glossy_broadcast::{Broadcaster, IntervalTicker};
use glossy_config::GlossyConfig;
use glossy_motion::{
    attitude_channel, Attitude, AttitudeFeed, ImuMotionSource, MotionSource, RawImuSample,
    ScreenOrientation, UnavailableMotionSource,
};
use glossy_view::{ManualOffsetControl, ReflexLayer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Where attitude samples come from in this run.
enum MotionMode {
    /// Synthetic attitude sweep pushed through a watch feed.
    Sweep,
    /// Synthetic raw gyro/accel readings fused on the fly.
    Imu,
    /// No motion hardware.
    Disabled,
}

impl MotionMode {
    fn from_args() -> Self {
        let mut mode = MotionMode::Sweep;
        for arg in std::env::args().skip(1) {
            match arg.as_str() {
                "--no-motion" => mode = MotionMode::Disabled,
                "--imu" => mode = MotionMode::Imu,
                other => warn!(arg = other, "Ignoring unknown argument"),
            }
        }
        mode
    }
}

/// Tilts from flat to past upright and back, wobbling sideways, so every
/// zone is visited.
fn sweep_attitude(t: f64) -> Attitude {
    let phi = 0.2 + 2.6 * (t * 0.4).sin().abs();
    let theta = 0.3 * (t * 1.3).sin();
    let psi = 0.4 * (t * 0.7).cos();
    Attitude::new(DQuat::from_euler(EulerRot::ZYX, psi, theta, phi))
}

fn spawn_sweep(feed: AttitudeFeed) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(20));
        let mut t = 0.0;
        loop {
            interval.tick().await;
            feed.publish(sweep_attitude(t));
            t += 0.02;
        }
    })
}

/// Resting device with a slowly rolling gyro, as raw readings.
fn spawn_raw_imu(tx: mpsc::UnboundedSender<RawImuSample>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        let mut t: f64 = 0.0;
        loop {
            interval.tick().await;
            let sample = RawImuSample {
                gyro: DVec3::new(0.3 * (t * 0.5).sin(), 0.0, 0.0),
                accel: DVec3::new(0.0, 0.0, 9.81),
            };
            if tx.send(sample).is_err() {
                break;
            }
            t += period.as_secs_f64();
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "glossy=info,glossy_motion=info,glossy_broadcast=info".into()),
        )
        .init();

    info!("Glossy reflection demo starting");

    // Load config.
    let config = glossy_config::load_config().unwrap_or_else(|e| {
        warn!(?e, "Failed to load config, using defaults");
        GlossyConfig::default()
    });
    info!(
        layers = config.layers.len(),
        tick_ms = config.motion.tick_interval_ms,
        "Config loaded"
    );

    // Pick the motion source.
    let mut background = Vec::new();
    let source: Arc<dyn MotionSource> = match MotionMode::from_args() {
        MotionMode::Sweep => {
            let (feed, source) = attitude_channel();
            background.push(spawn_sweep(feed));
            Arc::new(source)
        }
        MotionMode::Imu => {
            let imu = Arc::new(ImuMotionSource::new(config.fusion.build()));
            let (tx, rx) = mpsc::unbounded_channel();
            background.push(Arc::clone(&imu).pump(rx));
            let period = Duration::from_secs_f64(config.fusion.sample_period_s.max(0.001));
            background.push(spawn_raw_imu(tx, period));
            imu
        }
        MotionMode::Disabled => {
            warn!("Motion disabled, reflections stay static");
            Arc::new(UnavailableMotionSource)
        }
    };

    let (_orientation_tx, orientation_rx) = watch::channel(ScreenOrientation::Portrait);
    let broadcaster = Broadcaster::new(
        source,
        Arc::new(orientation_rx),
        IntervalTicker::new(config.motion.tick_interval()),
        config.motion.estimator(),
    )?;

    // Build layers and hand them to the broadcaster.
    let layers: Vec<Arc<ReflexLayer>> = config
        .layers
        .iter()
        .map(|layer| Arc::new(layer.build()))
        .collect();
    let mut control = ManualOffsetControl::default();
    for layer in &layers {
        broadcaster.register(layer);
    }
    if let Some(label) = layers.iter().find(|l| l.name() == "label") {
        control.attach(Arc::clone(label));
    }
    info!(state = ?broadcaster.state(), observers = broadcaster.live_count(), "Layers registered");

    // Report layer positions once a second until Ctrl-C.
    let mut report = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = report.tick() => {
                let offset = broadcaster.offset();
                for layer in &layers {
                    let position = layer.position();
                    info!(
                        layer = layer.name(),
                        offset_x = offset.x,
                        offset_y = offset.y,
                        x = position.x,
                        y = position.y,
                        "Reflection position"
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    broadcaster.stop();
    for task in background {
        task.abort();
    }

    // Persist the manual offset chosen for the label.
    let mut config = config;
    if let Some(layer) = config.layers.iter_mut().find(|l| l.name == "label") {
        layer.initial_offset = control.value().to_array();
    }
    if let Err(e) = glossy_config::save_config(&config) {
        warn!(?e, "Failed to save config");
    }

    info!(ticks = broadcaster.tick_count(), "Shut down");
    Ok(())
}
