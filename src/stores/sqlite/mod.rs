pub(crate) mod history;
pub(crate) mod registration;

use crate::core::error::{Error, ErrorKind, Result};
use log::debug;
use sqlx::{
    query,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;

const SCHEMA: [&str; 2] = [
    r#"CREATE TABLE IF NOT EXISTS notifications (
        position INTEGER NOT NULL,
        id_kind TEXT NOT NULL,
        id_value BLOB NOT NULL,
        topic TEXT NOT NULL,
        category TEXT,
        posted_micros INTEGER NOT NULL,
        title TEXT NOT NULL,
        body TEXT NOT NULL,
        PRIMARY KEY (id_kind, id_value)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS registration (
        singleton INTEGER PRIMARY KEY CHECK (singleton = 0),
        registered INTEGER NOT NULL,
        last_registered_micros INTEGER,
        token TEXT
    )"#,
];

fn persist_err(message: &str) -> impl FnOnce(sqlx::Error) -> Error + '_ {
    move |e| Error::wrap(message.into(), ErrorKind::Persist, e)
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `url`, e.g.
    /// `sqlite://launchpad.db` or `sqlite::memory:`.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| {
                let message = format!("invalid database url: {}", url);
                Error::wrap(message, ErrorKind::Config, e)
            })?
            .create_if_missing(true);
        // one connection keeps writes serialized and in-memory databases alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(persist_err("failed to open database"))?;
        let store = Self { pool };
        store.migrate().await?;
        debug!("opened notification database at {}", url);
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            query(statement)
                .execute(&self.pool)
                .await
                .map_err(persist_err("failed to create schema"))?;
        }
        Ok(())
    }
}
