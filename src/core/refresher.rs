use crate::core::summary::Summary;
use chrono::{DateTime, Utc};
use log::debug;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Recurring tick source. Resolves `false` once no more ticks will come.
pub trait Ticker: Send + 'static {
    fn tick(&mut self) -> impl Future<Output = bool> + Send;
}

impl Ticker for Interval {
    fn tick(&mut self) -> impl Future<Output = bool> + Send {
        async move {
            Interval::tick(self).await;
            true
        }
    }
}

/// Ticks every `period`, starting one period from now.
pub fn every(period: std::time::Duration) -> Interval {
    let start = tokio::time::Instant::now() + period;
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Keeps the rendered summary current. The first value is available right
/// away; each tick re-renders against the clock. After `stop` returns or the
/// refresher is dropped, nothing more is published.
pub struct SummaryRefresher {
    updates: watch::Receiver<String>,
    stopped: Arc<Mutex<bool>>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

/// Renders and sends one update unless the refresher has been stopped. The
/// flag stays locked until the send is done, so once `halt` returns no
/// further update can go out.
fn publish<C: Clock>(
    stopped: &Mutex<bool>,
    tx: &watch::Sender<String>,
    summary: &Summary,
    clock: &C,
) -> bool {
    let stopped = stopped.lock().unwrap_or_else(PoisonError::into_inner);
    if *stopped {
        return false;
    }
    tx.send(summary.render(clock.now())).is_ok()
}

fn halt(stopped: &Mutex<bool>) {
    *stopped.lock().unwrap_or_else(PoisonError::into_inner) = true;
}

impl SummaryRefresher {
    pub fn start<C, T>(summary: Summary, clock: C, mut ticker: T) -> Self
    where
        C: Clock,
        T: Ticker,
    {
        let (tx, updates) = watch::channel(summary.render(clock.now()));
        let (stop, mut stop_rx) = oneshot::channel::<()>();
        let stopped = Arc::new(Mutex::new(false));
        let flag = stopped.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    more = ticker.tick() => {
                        if !more || !publish(&flag, &tx, &summary, &clock) {
                            break;
                        }
                    }
                }
            }
            debug!("summary refresher stopped");
        });
        Self {
            updates,
            stopped,
            stop: Some(stop),
            task: Some(task),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.updates.clone()
    }

    pub fn current(&self) -> String {
        self.updates.borrow().clone()
    }

    /// Cancels the refresher and waits until its task has exited.
    pub async fn stop(mut self) {
        halt(&self.stopped);
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SummaryRefresher {
    fn drop(&mut self) {
        halt(&self.stopped);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    #[derive(Clone)]
    struct ManualClock(Arc<Mutex<DateTime<Utc>>>);

    impl ManualClock {
        fn new(at: DateTime<Utc>) -> Self {
            Self(Arc::new(Mutex::new(at)))
        }

        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now = *now + by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    struct ManualTicker(mpsc::UnboundedReceiver<()>);

    impl Ticker for ManualTicker {
        fn tick(&mut self) -> impl Future<Output = bool> + Send {
            async move { self.0.recv().await.is_some() }
        }
    }

    /// Always ready, so the task publishes as fast as it is scheduled.
    struct BusyTicker;

    impl Ticker for BusyTicker {
        fn tick(&mut self) -> impl Future<Output = bool> + Send {
            async {
                tokio::task::yield_now().await;
                true
            }
        }
    }

    /// Counts how often the task renders.
    #[derive(Clone, Default)]
    struct CountingClock(Arc<AtomicUsize>);

    impl CountingClock {
        fn renders(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    impl Clock for CountingClock {
        fn now(&self) -> DateTime<Utc> {
            self.0.fetch_add(1, Ordering::SeqCst);
            posted()
        }
    }

    fn start_manual(
        clock: ManualClock,
        rx: mpsc::UnboundedReceiver<()>,
    ) -> SummaryRefresher {
        let summary = Summary::LastPosted(posted());
        SummaryRefresher::start(summary, clock, ManualTicker(rx))
    }

    fn posted() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[tokio::test]
    async fn re_renders_on_every_tick() {
        let clock = ManualClock::new(posted() + Duration::seconds(5));
        let (ticks, rx) = mpsc::unbounded_channel();
        let refresher = start_manual(clock.clone(), rx);
        let mut updates = refresher.subscribe();
        assert_eq!(
            *updates.borrow_and_update(),
            "Last notification posted 5 seconds ago"
        );

        clock.advance(Duration::minutes(2));
        ticks.send(()).unwrap();
        updates.changed().await.unwrap();
        assert_eq!(
            *updates.borrow_and_update(),
            "Last notification posted 2 minutes ago"
        );
        refresher.stop().await;
    }

    #[tokio::test]
    async fn nothing_is_emitted_after_stop() {
        let clock = ManualClock::new(posted());
        let (ticks, rx) = mpsc::unbounded_channel();
        let refresher = start_manual(clock.clone(), rx);
        let mut updates = refresher.subscribe();
        updates.borrow_and_update();

        refresher.stop().await;
        clock.advance(Duration::hours(1));
        // the task has exited, so its tick source is gone
        assert!(ticks.send(()).is_err());
        assert!(updates.changed().await.is_err());
        assert_eq!(
            *updates.borrow(),
            "Last notification posted in 0 seconds"
        );
    }

    #[tokio::test]
    async fn dropping_the_refresher_cancels_it() {
        let (ticks, rx) = mpsc::unbounded_channel();
        let refresher = start_manual(ManualClock::new(posted()), rx);
        let mut updates = refresher.subscribe();
        updates.borrow_and_update();
        drop(refresher);

        assert!(updates.changed().await.is_err());
        assert!(ticks.is_closed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn nothing_is_rendered_once_dropped_on_a_busy_runtime() {
        for _ in 0..20 {
            let clock = CountingClock::default();
            let refresher = SummaryRefresher::start(
                Summary::LastPosted(posted()),
                clock.clone(),
                BusyTicker,
            );
            while clock.renders() < 3 {
                tokio::task::yield_now().await;
            }
            drop(refresher);
            let seen = clock.renders();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            assert_eq!(clock.renders(), seen);
        }
    }

    #[tokio::test]
    async fn exhausted_ticker_ends_the_task() {
        let (ticks, rx) = mpsc::unbounded_channel::<()>();
        drop(ticks);
        let ticker = ManualTicker(rx);
        let refresher =
            SummaryRefresher::start(Summary::Empty, SystemClock, ticker);
        assert_eq!(refresher.current(), "No notifications posted yet");
        refresher.stop().await;
    }
}
