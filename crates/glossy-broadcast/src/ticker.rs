use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Source of tick events driving the broadcast loop.
pub trait Ticker: Send + 'static {
    /// Wait for the next tick. Resolves to `false` once no more ticks will come.
    fn tick(&mut self) -> impl Future<Output = bool> + Send;
}

/// Fixed-rate ticker on the Tokio clock.
///
/// The first tick fires one period after the first call. Ticks missed
/// while the loop was busy are dropped rather than burst.
pub struct IntervalTicker {
    period: Duration,
    interval: Option<Interval>,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            interval: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Ticker for IntervalTicker {
    fn tick(&mut self) -> impl Future<Output = bool> + Send {
        async move {
            let period = self.period;
            let interval = self.interval.get_or_insert_with(|| {
                let mut interval = time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                interval
            });
            interval.tick().await;
            true
        }
    }
}

/// Ticker driven by explicit [`TickHandle::fire`] calls.
///
/// Useful for hosts that already run a frame loop, and for tests.
pub struct ManualTicker {
    rx: mpsc::UnboundedReceiver<()>,
}

/// Trigger for a [`ManualTicker`]. Dropping every handle ends the loop.
#[derive(Debug, Clone)]
pub struct TickHandle {
    tx: mpsc::UnboundedSender<()>,
}

impl ManualTicker {
    pub fn new() -> (Self, TickHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, TickHandle { tx })
    }
}

impl TickHandle {
    /// Request one tick. Returns `false` if the loop has already ended.
    pub fn fire(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

impl Ticker for ManualTicker {
    fn tick(&mut self) -> impl Future<Output = bool> + Send {
        async move { self.rx.recv().await.is_some() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn interval_ticks_once_per_period() {
        let mut ticker = IntervalTicker::new(Duration::from_millis(50));
        let start = Instant::now();
        for _ in 0..3 {
            assert!(ticker.tick().await);
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(150));
        assert!(elapsed < Duration::from_millis(155));
    }

    #[test]
    fn zero_period_is_clamped() {
        assert_eq!(IntervalTicker::new(Duration::ZERO).period(), Duration::from_millis(1));
    }

    #[tokio::test]
    async fn manual_ticker_ends_when_handles_drop() {
        let (mut ticker, handle) = ManualTicker::new();
        assert!(handle.fire());
        assert!(ticker.tick().await);
        drop(handle);
        assert!(!ticker.tick().await);
    }
}
