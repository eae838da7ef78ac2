use crate::core::{
    error::Result,
    record::NotificationRecord,
    registration::RegistrationState,
    store::{HistoryStore, RegistrationStore},
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct MemoryStore {
    history: Arc<RwLock<Vec<NotificationRecord>>>,
    registration: Arc<RwLock<RegistrationState>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of history writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl HistoryStore for MemoryStore {
    async fn load_history(&self) -> Result<Vec<NotificationRecord>> {
        Ok(self.history.read().await.clone())
    }

    async fn save_history(&self, records: &[NotificationRecord]) -> Result<()> {
        *self.history.write().await = records.to_vec();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl RegistrationStore for MemoryStore {
    async fn load_registration(&self) -> Result<RegistrationState> {
        Ok(self.registration.read().await.clone())
    }

    async fn save_registration(&self, state: &RegistrationState) -> Result<()> {
        *self.registration.write().await = state.clone();
        Ok(())
    }
}
