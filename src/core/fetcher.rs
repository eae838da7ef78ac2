use crate::core::error::Result;
use chrono::{DateTime, Utc};

/// Remote source of notification history.
pub trait HistoryFetcher {
    /// Raw JSON array of every record posted strictly after `after`, or of all
    /// records when `after` is absent. Timeouts are the implementation's job.
    async fn fetch_history(
        &self,
        after: Option<DateTime<Utc>>,
    ) -> Result<Vec<u8>>;
}
