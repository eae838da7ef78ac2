use crate::core::error::Result;
use crate::core::record::NotificationRecord;
use crate::core::registration::RegistrationState;

/// Durable storage for the notification history.
pub trait HistoryStore {
    /// Records newest-first. An empty store yields an empty list.
    async fn load_history(&self) -> Result<Vec<NotificationRecord>>;
    /// Replaces the stored history with `records` atomically.
    async fn save_history(&self, records: &[NotificationRecord]) -> Result<()>;
}

pub trait RegistrationStore {
    async fn load_registration(&self) -> Result<RegistrationState>;
    async fn save_registration(&self, state: &RegistrationState) -> Result<()>;
}
