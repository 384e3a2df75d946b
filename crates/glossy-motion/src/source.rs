use crate::error::MotionError;
use crate::fusion::SensorFusion;
use crate::types::{Attitude, RawImuSample, ScreenOrientation};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch};

/// Provider of device attitude samples.
///
/// `latest` is polled once per tick and must never block.
pub trait MotionSource: Send + Sync {
    /// Whether the device can deliver motion at all.
    fn is_available(&self) -> bool;
    /// Begin delivering samples. Called at most once per broadcaster.
    fn start(&self) -> Result<()>;
    /// Stop delivering samples and release the sensor.
    fn stop(&self);
    /// Last known attitude, or `None` if there is no sample right now.
    fn latest(&self) -> Option<Attitude>;
}

/// Provider of the current interface orientation.
pub trait OrientationProvider: Send + Sync {
    fn orientation(&self) -> ScreenOrientation;
}

/// Orientation that never changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedOrientation(pub ScreenOrientation);

impl OrientationProvider for FixedOrientation {
    fn orientation(&self) -> ScreenOrientation {
        self.0
    }
}

impl OrientationProvider for watch::Receiver<ScreenOrientation> {
    fn orientation(&self) -> ScreenOrientation {
        *self.borrow()
    }
}

/// Motion source for devices without any sensing capability.
#[derive(Debug, Default)]
pub struct UnavailableMotionSource;

impl MotionSource for UnavailableMotionSource {
    fn is_available(&self) -> bool {
        false
    }

    fn start(&self) -> Result<()> {
        Err(MotionError::Unavailable.into())
    }

    fn stop(&self) {}

    fn latest(&self) -> Option<Attitude> {
        None
    }
}

/// Sending half for a [`WatchMotionSource`]. Held by the host that owns
/// the real sensor.
#[derive(Debug, Clone)]
pub struct AttitudeFeed {
    tx: watch::Sender<Option<Attitude>>,
}

impl AttitudeFeed {
    /// Publish a new attitude. Older values are overwritten.
    pub fn publish(&self, attitude: Attitude) {
        self.tx.send_replace(Some(attitude));
    }

    /// Mark the sample as unavailable until the next publish.
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }
}

/// Motion source fed by the host through an [`AttitudeFeed`].
#[derive(Debug)]
pub struct WatchMotionSource {
    rx: watch::Receiver<Option<Attitude>>,
    active: AtomicBool,
}

/// Create a connected feed/source pair. No sample is available until the
/// first publish.
pub fn attitude_channel() -> (AttitudeFeed, WatchMotionSource) {
    let (tx, rx) = watch::channel(None);
    (
        AttitudeFeed { tx },
        WatchMotionSource {
            rx,
            active: AtomicBool::new(false),
        },
    )
}

impl MotionSource for WatchMotionSource {
    fn is_available(&self) -> bool {
        // Closed once every feed handle is gone.
        self.rx.has_changed().is_ok()
    }

    fn start(&self) -> Result<()> {
        self.active.store(true, Ordering::Release);
        tracing::info!("Attitude feed started");
        Ok(())
    }

    fn stop(&self) {
        self.active.store(false, Ordering::Release);
    }

    fn latest(&self) -> Option<Attitude> {
        if !self.active.load(Ordering::Acquire) {
            return None;
        }
        *self.rx.borrow()
    }
}

/// Motion source that fuses raw IMU readings into an attitude.
///
/// Samples pushed before `start` or while calibrating are consumed
/// without producing an attitude.
pub struct ImuMotionSource {
    fusion: Mutex<SensorFusion>,
    attitude_tx: watch::Sender<Option<Attitude>>,
    active: AtomicBool,
    sample_count: AtomicU64,
}

impl ImuMotionSource {
    pub fn new(fusion: SensorFusion) -> Self {
        let (attitude_tx, _) = watch::channel(None);
        Self {
            fusion: Mutex::new(fusion),
            attitude_tx,
            active: AtomicBool::new(false),
            sample_count: AtomicU64::new(0),
        }
    }

    /// Feed one raw reading through the fusion filter.
    pub fn push_sample(&self, sample: &RawImuSample) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }

        let result = self
            .fusion
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .update(sample);
        match result {
            Ok(attitude) => {
                self.attitude_tx.send_replace(Some(attitude));
            }
            Err(e) => tracing::trace!(?e, "No attitude from sample"),
        }

        let count = self.sample_count.fetch_add(1, Ordering::Relaxed) + 1;
        if count % 1000 == 0 {
            tracing::debug!(sample_count = count, "IMU samples processed");
        }
    }

    /// Drain raw readings from `samples` until the channel closes.
    pub fn pump(
        self: Arc<Self>,
        mut samples: mpsc::UnboundedReceiver<RawImuSample>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(sample) = samples.recv().await {
                self.push_sample(&sample);
            }
            tracing::debug!("IMU sample channel closed");
        })
    }

    /// Use the current attitude as the zero reference.
    pub fn set_zero(&self) {
        self.fusion
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_zero();
    }

    /// Restart gyro bias calibration. No attitude is reported until it completes.
    pub fn recalibrate(&self, samples: u32) {
        self.fusion
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recalibrate(samples);
        self.attitude_tx.send_replace(None);
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count.load(Ordering::Relaxed)
    }
}

impl MotionSource for ImuMotionSource {
    fn is_available(&self) -> bool {
        true
    }

    fn start(&self) -> Result<()> {
        self.active.store(true, Ordering::Release);
        tracing::info!("IMU motion updates started");
        Ok(())
    }

    fn stop(&self) {
        self.active.store(false, Ordering::Release);
        self.attitude_tx.send_replace(None);
        tracing::info!("IMU motion updates stopped");
    }

    fn latest(&self) -> Option<Attitude> {
        if !self.active.load(Ordering::Acquire) {
            return None;
        }
        *self.attitude_tx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{DQuat, DVec3};

    fn resting() -> RawImuSample {
        RawImuSample {
            gyro: DVec3::ZERO,
            accel: DVec3::new(0.0, 0.0, 9.81),
        }
    }

    #[test]
    fn unavailable_source_never_starts() {
        let source = UnavailableMotionSource;
        assert!(!source.is_available());
        assert!(source.start().is_err());
        assert!(source.latest().is_none());
    }

    #[test]
    fn watch_source_reports_latest_after_start() {
        let (feed, source) = attitude_channel();
        assert!(source.is_available());

        feed.publish(Attitude::from_wxyz(1.0, 0.0, 0.0, 0.0));
        // Not started yet.
        assert!(source.latest().is_none());

        source.start().unwrap();
        assert_eq!(source.latest(), Some(Attitude::default()));

        let tilted = Attitude::new(DQuat::from_rotation_x(0.5));
        feed.publish(tilted);
        assert_eq!(source.latest(), Some(tilted));

        feed.clear();
        assert!(source.latest().is_none());

        source.stop();
        feed.publish(tilted);
        assert!(source.latest().is_none());
    }

    #[test]
    fn watch_source_unavailable_once_feed_dropped() {
        let (feed, source) = attitude_channel();
        drop(feed);
        assert!(!source.is_available());
    }

    #[test]
    fn watch_receiver_provides_orientation() {
        let (tx, rx) = watch::channel(ScreenOrientation::Portrait);
        assert_eq!(rx.orientation(), ScreenOrientation::Portrait);
        tx.send_replace(ScreenOrientation::LandscapeLeft);
        assert_eq!(rx.orientation(), ScreenOrientation::LandscapeLeft);
        assert_eq!(
            FixedOrientation(ScreenOrientation::LandscapeRight).orientation(),
            ScreenOrientation::LandscapeRight
        );
    }

    #[test]
    fn imu_source_waits_for_calibration() {
        let source = ImuMotionSource::new(SensorFusion::new(0.01, 0.1, 5));
        source.push_sample(&resting());
        assert_eq!(source.sample_count(), 0, "samples before start are dropped");

        source.start().unwrap();
        for _ in 0..4 {
            source.push_sample(&resting());
            assert!(source.latest().is_none());
        }
        source.push_sample(&resting());
        assert!(source.latest().is_some());
        assert_eq!(source.sample_count(), 5);

        source.recalibrate(2);
        assert!(source.latest().is_none());
    }

    #[tokio::test]
    async fn pump_feeds_samples_until_closed() {
        let source = Arc::new(ImuMotionSource::new(SensorFusion::new(0.01, 0.1, 1)));
        source.start().unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        let task = Arc::clone(&source).pump(rx);
        for _ in 0..10 {
            tx.send(resting()).unwrap();
        }
        drop(tx);
        task.await.unwrap();

        assert_eq!(source.sample_count(), 10);
        let attitude = source.latest().unwrap();
        assert!(attitude.quaternion.abs_diff_eq(DQuat::IDENTITY, 1e-6));
    }
}
