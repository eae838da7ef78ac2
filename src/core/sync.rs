use crate::core::error::{Error, ErrorKind, Result};
use crate::core::fetcher::HistoryFetcher;
use crate::core::history::{History, Merge};
use crate::core::record::NotificationRecord;
use crate::core::store::HistoryStore;
use crate::core::summary::Summary;
use log::{debug, info, warn};
use serde_json::from_slice;
use tokio::sync::{watch, Mutex};

/// Outcome of one synchronization pass. On failure `history` is the history
/// held before the pass and `error` says why.
#[derive(Debug)]
pub struct SyncOutcome {
    pub history: History,
    pub summary: Summary,
    pub added: usize,
    pub error: Option<Error>,
}

/// Reconciles the persisted history with the remote source. It owns the
/// current history and is its only writer: passes run one at a time, and
/// readers get complete snapshots via `subscribe`.
pub struct Synchronizer<S, F>
where
    S: HistoryStore,
    F: HistoryFetcher,
{
    store: S,
    fetcher: F,
    current: Mutex<History>,
    snapshot: watch::Sender<History>,
}

impl<S, F> Synchronizer<S, F>
where
    S: HistoryStore,
    F: HistoryFetcher,
{
    pub fn new(store: S, fetcher: F) -> Self {
        Self::with_history(store, fetcher, History::new())
    }

    /// Starts from an already known local history instead of an empty one.
    pub fn with_history(store: S, fetcher: F, history: History) -> Self {
        let (snapshot, _) = watch::channel(history.clone());
        Self {
            store,
            fetcher,
            current: Mutex::new(history),
            snapshot,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<History> {
        self.snapshot.subscribe()
    }

    /// Reads the persisted history, used once at startup.
    pub async fn load(&self) -> Result<History> {
        let mut current = self.current.lock().await;
        let history = History::from_records(self.store.load_history().await?);
        debug!("loaded {} notification(s) from storage", history.len());
        *current = history.clone();
        self.snapshot.send_replace(history.clone());
        Ok(history)
    }

    pub async fn sync(&self) -> SyncOutcome {
        let mut current = self.current.lock().await;
        match self.try_sync(&current).await {
            Ok(merge) => {
                let summary = match merge.history.latest() {
                    Some(latest) => Summary::LastPosted(latest.posted),
                    None => Summary::Empty,
                };
                if merge.changed {
                    *current = merge.history.clone();
                    self.snapshot.send_replace(merge.history.clone());
                }
                SyncOutcome {
                    history: merge.history,
                    summary,
                    added: merge.added,
                    error: None,
                }
            }
            Err(e) => {
                warn!("notification history sync failed: {}", e);
                SyncOutcome {
                    history: current.clone(),
                    summary: Summary::Unavailable,
                    added: 0,
                    error: Some(e),
                }
            }
        }
    }

    /// Fetches everything newer than the newest local record, merges it and
    /// persists the result. Nothing is written when the merge changes
    /// nothing. Callers hold the `current` lock.
    async fn try_sync(&self, local: &History) -> Result<Merge> {
        let bytes = self.fetcher.fetch_history(local.after()).await?;
        let incoming: Vec<NotificationRecord> =
            from_slice(&bytes).map_err(|e| {
                Error::wrap(
                    "failed to decode notification history".into(),
                    ErrorKind::Decode,
                    e,
                )
            })?;
        debug!("fetched {} notification(s)", incoming.len());

        let merge = local.merge(incoming);
        if merge.changed {
            self.store.save_history(merge.history.records()).await?;
            info!(
                "stored {} new notification(s), {} total",
                merge.added,
                merge.history.len()
            );
        }
        Ok(merge)
    }
}
