use crate::registry::{ObserverToken, Offsetable, Registry};
use crate::ticker::{IntervalTicker, Ticker};
use anyhow::{Context, Result};
use glam::DVec2;
use glossy_motion::{EstimatorConfig, MotionSource, OrientationEstimator, OrientationProvider};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Lifecycle of a [`Broadcaster`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcasterState {
    /// No observer registered yet. Nothing runs.
    Uninitialized,
    /// Motion started and the tick loop is active.
    Running,
    /// Motion is unavailable. Observers are kept but never updated.
    Idle,
    /// Stopped explicitly. Never restarts.
    Stopped,
}

/// Fans the estimated offset out to every registered observer.
///
/// The motion source and tick loop are started lazily by the first
/// [`register`](Self::register) call. Observers are held weakly and may
/// disappear at any time.
pub struct Broadcaster<T: Ticker = IntervalTicker> {
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle<T>>,
    runtime: Handle,
}

struct Lifecycle<T> {
    state: BroadcasterState,
    ticker: Option<T>,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    source: Arc<dyn MotionSource>,
    orientation: Arc<dyn OrientationProvider>,
    estimator: Mutex<OrientationEstimator>,
    registry: Mutex<Registry>,
    /// Set only while the lifecycle is `Running`.
    running: AtomicBool,
    ticking: AtomicBool,
    tick_count: AtomicU64,
}

impl<T: Ticker> Broadcaster<T> {
    /// Create a broadcaster bound to the current Tokio runtime.
    pub fn new(
        source: Arc<dyn MotionSource>,
        orientation: Arc<dyn OrientationProvider>,
        ticker: T,
        config: EstimatorConfig,
    ) -> Result<Self> {
        let runtime = Handle::try_current().context("Broadcaster requires a Tokio runtime")?;
        Ok(Self::with_runtime(runtime, source, orientation, ticker, config))
    }

    pub fn with_runtime(
        runtime: Handle,
        source: Arc<dyn MotionSource>,
        orientation: Arc<dyn OrientationProvider>,
        ticker: T,
        config: EstimatorConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                orientation,
                estimator: Mutex::new(OrientationEstimator::new(config)),
                registry: Mutex::new(Registry::new()),
                running: AtomicBool::new(false),
                ticking: AtomicBool::new(false),
                tick_count: AtomicU64::new(0),
            }),
            lifecycle: Mutex::new(Lifecycle {
                state: BroadcasterState::Uninitialized,
                ticker: Some(ticker),
                task: None,
            }),
            runtime,
        }
    }

    /// Start delivering offsets to `observer`.
    ///
    /// The registry keeps only a weak reference, so dropping the observer
    /// is enough to stop updates.
    pub fn register<O: Offsetable + 'static>(&self, observer: &Arc<O>) -> ObserverToken {
        let weak: Weak<O> = Arc::downgrade(observer);
        self.register_weak(weak)
    }

    /// Observers that join after the first delivered tick are seeded with
    /// the current offset right away.
    pub fn register_weak(&self, observer: Weak<dyn Offsetable>) -> ObserverToken {
        self.start_if_needed();
        let token = {
            let mut registry = lock(&self.shared.registry);
            let token = registry.register(Weak::clone(&observer));
            debug!(count = registry.live_count(), "Registered observer");
            token
        };

        if self.tick_count() > 0 {
            if let Some(observer) = observer.upgrade() {
                observer.apply_offset(self.offset());
            }
        }
        token
    }

    pub fn unregister(&self, token: ObserverToken) -> bool {
        let removed = lock(&self.shared.registry).unregister(token);
        if removed {
            debug!(?token, "Unregistered observer");
        }
        removed
    }

    /// Run one tick by hand: read, estimate, deliver.
    ///
    /// Returns the delivered offset, or `None` if the tick was skipped
    /// because the broadcaster is not running, no sample was available or
    /// another tick was in progress.
    pub fn tick(&self) -> Option<DVec2> {
        self.shared.tick()
    }

    /// Stop the tick loop and release the motion source.
    pub fn stop(&self) {
        let mut lifecycle = lock(&self.lifecycle);
        self.shared.running.store(false, Ordering::Release);
        if let Some(task) = lifecycle.task.take() {
            task.abort();
        }
        if lifecycle.state == BroadcasterState::Running {
            self.shared.source.stop();
            info!(
                ticks = self.shared.tick_count.load(Ordering::Relaxed),
                "Motion broadcaster stopped"
            );
        }
        lifecycle.state = BroadcasterState::Stopped;
    }

    pub fn state(&self) -> BroadcasterState {
        lock(&self.lifecycle).state
    }

    /// Offset produced by the most recent tick.
    pub fn offset(&self) -> DVec2 {
        lock(&self.shared.estimator).offset()
    }

    pub fn live_count(&self) -> usize {
        lock(&self.shared.registry).live_count()
    }

    /// Registry entries, including dropped observers not yet pruned.
    pub fn registered(&self) -> usize {
        lock(&self.shared.registry).len()
    }

    /// Number of ticks that delivered an offset.
    pub fn tick_count(&self) -> u64 {
        self.shared.tick_count.load(Ordering::Relaxed)
    }

    fn start_if_needed(&self) {
        let mut lifecycle = lock(&self.lifecycle);
        if lifecycle.state != BroadcasterState::Uninitialized {
            return;
        }

        if !self.shared.source.is_available() {
            info!("Motion sensing unavailable, reflections stay static");
            lifecycle.state = BroadcasterState::Idle;
            return;
        }
        if let Err(e) = self.shared.source.start() {
            warn!(?e, "Failed to start motion updates, reflections stay static");
            lifecycle.state = BroadcasterState::Idle;
            return;
        }

        let Some(ticker) = lifecycle.ticker.take() else {
            lifecycle.state = BroadcasterState::Idle;
            return;
        };
        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        lifecycle.task = Some(self.runtime.spawn(tick_loop(shared, ticker)));
        lifecycle.state = BroadcasterState::Running;
        info!("Motion broadcaster started");
    }
}

impl<T: Ticker> Drop for Broadcaster<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    fn tick(&self) -> Option<DVec2> {
        if !self.running.load(Ordering::Acquire) {
            trace!("Broadcaster not running, skipping tick");
            return None;
        }
        if self.ticking.swap(true, Ordering::AcqRel) {
            trace!("Tick already in progress, skipping");
            return None;
        }
        let _guard = TickGuard(&self.ticking);

        let Some(attitude) = self.source.latest() else {
            trace!("No attitude sample, skipping tick");
            return None;
        };
        let orientation = self.orientation.orientation();
        let offset = lock(&self.estimator).update(&attitude, orientation);

        // Snapshot so observers can register or unregister from their callback.
        let observers = lock(&self.registry).live();
        for observer in &observers {
            observer.apply_offset(offset);
        }

        let count = self.tick_count.fetch_add(1, Ordering::Relaxed) + 1;
        if count % 200 == 0 {
            debug!(ticks = count, observers = observers.len(), "Broadcast heartbeat");
        }
        Some(offset)
    }
}

struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn tick_loop<T: Ticker>(shared: Arc<Shared>, mut ticker: T) {
    while ticker.tick().await {
        shared.tick();
    }
    debug!("Ticker exhausted, broadcast loop finished");
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
