use crate::core::error::{Error, Result};
use crate::core::store::RegistrationStore;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use tokio::sync::{oneshot, watch};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationState {
    pub registered: bool,
    pub last_registered: Option<DateTime<Utc>>,
    /// Device token of the last successful registration, lowercase hex.
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Succeeded { token: String, at: DateTime<Utc> },
    Failed { reason: String },
}

impl RegistrationState {
    pub fn apply(&self, outcome: &RegistrationOutcome) -> Self {
        match outcome {
            RegistrationOutcome::Succeeded { token, at } => Self {
                registered: true,
                last_registered: Some(*at),
                token: Some(token.clone()),
            },
            RegistrationOutcome::Failed { .. } => Self {
                registered: false,
                ..self.clone()
            },
        }
    }
}

pub fn token_to_hex(token: &[u8]) -> String {
    token.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Handed to the push framework for one registration attempt. Consumed by
/// exactly one outcome; dropping it counts as a failure.
#[derive(Debug)]
pub struct RegistrationCompletion {
    tx: oneshot::Sender<RegistrationOutcome>,
}

impl RegistrationCompletion {
    pub fn succeed(self, token: &[u8]) {
        self.succeed_at(token, Utc::now());
    }

    pub fn succeed_at(self, token: &[u8], at: DateTime<Utc>) {
        let _ = self.tx.send(RegistrationOutcome::Succeeded {
            token: token_to_hex(token),
            at,
        });
    }

    pub fn fail(self, reason: impl Into<String>) {
        let _ = self.tx.send(RegistrationOutcome::Failed {
            reason: reason.into(),
        });
    }
}

/// What a completed attempt produced. The outcome is always reported; `error`
/// is set when the resulting state could not be persisted.
#[derive(Debug)]
pub struct RegistrationReport {
    pub outcome: RegistrationOutcome,
    pub error: Option<Error>,
}

/// Pending outcome of a registration attempt.
#[derive(Debug)]
pub struct PendingRegistration {
    rx: oneshot::Receiver<RegistrationOutcome>,
}

pub struct RegistrationTracker<S>
where
    S: RegistrationStore,
{
    store: S,
    state: watch::Sender<RegistrationState>,
}

impl<S> RegistrationTracker<S>
where
    S: RegistrationStore,
{
    pub async fn load(store: S) -> Result<Self> {
        let (state, _) = watch::channel(store.load_registration().await?);
        Ok(Self { store, state })
    }

    pub fn state(&self) -> RegistrationState {
        self.state.borrow().clone()
    }

    pub fn is_registered(&self) -> bool {
        self.state.borrow().registered
    }

    pub fn last_registered(&self) -> Option<DateTime<Utc>> {
        self.state.borrow().last_registered
    }

    pub fn subscribe(&self) -> watch::Receiver<RegistrationState> {
        self.state.subscribe()
    }

    pub fn begin_attempt(
        &self,
    ) -> (RegistrationCompletion, PendingRegistration) {
        let (tx, rx) = oneshot::channel();
        (RegistrationCompletion { tx }, PendingRegistration { rx })
    }

    /// Waits for the attempt's outcome, records it and returns it. Each attempt
    /// yields exactly one outcome, even when saving the new state fails.
    pub async fn complete(
        &self,
        pending: PendingRegistration,
    ) -> RegistrationReport {
        let outcome = pending.rx.await.unwrap_or_else(|_| {
            RegistrationOutcome::Failed {
                reason: "registration attempt abandoned".into(),
            }
        });
        match &outcome {
            RegistrationOutcome::Succeeded { token, .. } => {
                info!("registered for push notifications");
                info!("got token: {}", token);
            }
            RegistrationOutcome::Failed { reason } => {
                error!("failed to register for push notifications: {}", reason);
            }
        }
        let next = self.state.borrow().apply(&outcome);
        let error = self.store.save_registration(&next).await.err();
        if let Some(e) = &error {
            warn!("registration state was not saved: {}", e);
        }
        self.state.send_replace(next);
        RegistrationReport { outcome, error }
    }

    /// Mirrors the platform's current registration flag, e.g. when the app
    /// comes to the foreground. Timestamp and token are kept.
    pub async fn refresh_registered(&self, registered: bool) -> Result<()> {
        if self.state.borrow().registered == registered {
            return Ok(());
        }
        let next = RegistrationState {
            registered,
            ..self.state()
        };
        self.store.save_registration(&next).await?;
        self.state.send_replace(next);
        Ok(())
    }
}
