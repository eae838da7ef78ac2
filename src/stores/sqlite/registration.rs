use super::{persist_err, SqliteStore};
use crate::core::error::Result;
use crate::core::record::from_epoch_micros;
use crate::core::registration::RegistrationState;
use crate::core::store::RegistrationStore;
use sqlx::{query, Row};

impl RegistrationStore for SqliteStore {
    async fn load_registration(&self) -> Result<RegistrationState> {
        let row = query(
            "SELECT registered, last_registered_micros, token
             FROM registration WHERE singleton = 0",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(persist_err("failed to load registration"))?;
        let Some(row) = row else {
            return Ok(RegistrationState::default());
        };
        let invalid = "invalid registration row";
        let registered: bool =
            row.try_get("registered").map_err(persist_err(invalid))?;
        let micros: Option<i64> = row
            .try_get("last_registered_micros")
            .map_err(persist_err(invalid))?;
        let token: Option<String> =
            row.try_get("token").map_err(persist_err(invalid))?;
        Ok(RegistrationState {
            registered,
            last_registered: micros.and_then(from_epoch_micros),
            token,
        })
    }

    async fn save_registration(
        &self,
        state: &RegistrationState,
    ) -> Result<()> {
        query(
            "INSERT INTO registration
             (singleton, registered, last_registered_micros, token)
             VALUES (0, ?1, ?2, ?3)
             ON CONFLICT (singleton) DO UPDATE SET
                registered = excluded.registered,
                last_registered_micros = excluded.last_registered_micros,
                token = excluded.token",
        )
        .bind(state.registered)
        .bind(state.last_registered.map(|at| at.timestamp_micros()))
        .bind(&state.token)
        .execute(&self.pool)
        .await
        .map_err(persist_err("failed to store registration"))?;
        Ok(())
    }
}
