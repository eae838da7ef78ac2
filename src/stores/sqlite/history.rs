use super::{persist_err, SqliteStore};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::record::{
    from_epoch_micros, NotificationRecord, Payload, RecordId,
};
use crate::core::store::HistoryStore;
use sqlx::{query, sqlite::SqliteRow, Row};

const ID_BYTES: &str = "bytes";
const ID_TEXT: &str = "text";

fn split_id(id: &RecordId) -> (&'static str, Vec<u8>) {
    match id {
        RecordId::Bytes(bytes) => (ID_BYTES, bytes.clone()),
        RecordId::Text(text) => (ID_TEXT, text.as_bytes().to_vec()),
    }
}

fn read_record(row: &SqliteRow) -> Result<NotificationRecord> {
    let kind: String =
        row.try_get("id_kind").map_err(persist_err("bad id_kind"))?;
    let value: Vec<u8> =
        row.try_get("id_value").map_err(persist_err("bad id_value"))?;
    let id = match kind.as_str() {
        ID_BYTES => RecordId::Bytes(value),
        ID_TEXT => RecordId::Text(String::from_utf8(value).map_err(|e| {
            let message = "stored text id is not utf-8".into();
            Error::wrap(message, ErrorKind::Persist, e)
        })?),
        other => {
            return Err(Error::new(
                format!("invalid stored id kind: {}", other),
                ErrorKind::Persist,
            ))
        }
    };
    let micros: i64 = row
        .try_get("posted_micros")
        .map_err(persist_err("bad posted_micros"))?;
    let posted = from_epoch_micros(micros).ok_or_else(|| {
        Error::new(
            format!("stored timestamp out of range: {}", micros),
            ErrorKind::Persist,
        )
    })?;
    Ok(NotificationRecord {
        id,
        topic: row.try_get("topic").map_err(persist_err("bad topic"))?,
        category: row
            .try_get("category")
            .map_err(persist_err("bad category"))?,
        posted,
        payload: Payload {
            title: row.try_get("title").map_err(persist_err("bad title"))?,
            body: row.try_get("body").map_err(persist_err("bad body"))?,
        },
    })
}

impl HistoryStore for SqliteStore {
    async fn load_history(&self) -> Result<Vec<NotificationRecord>> {
        query(
            "SELECT id_kind, id_value, topic, category, posted_micros,
                    title, body
             FROM notifications ORDER BY position ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(persist_err("failed to load notification history"))?
        .iter()
        .map(read_record)
        .collect()
    }

    async fn save_history(
        &self,
        records: &[NotificationRecord],
    ) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(persist_err("failed to begin transaction"))?;
        query("DELETE FROM notifications")
            .execute(&mut *tx)
            .await
            .map_err(persist_err("failed to clear notification history"))?;
        for (position, record) in records.iter().enumerate() {
            let (kind, value) = split_id(&record.id);
            query(
                "INSERT INTO notifications
                 (position, id_kind, id_value, topic, category,
                  posted_micros, title, body)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .bind(position as i64)
            .bind(kind)
            .bind(value)
            .bind(&record.topic)
            .bind(&record.category)
            .bind(record.posted.timestamp_micros())
            .bind(&record.payload.title)
            .bind(&record.payload.body)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Error::wrap(
                    format!(
                        "failed to store notification(id: {})",
                        record.id.qualified()
                    ),
                    ErrorKind::Persist,
                    e,
                )
            })?;
        }
        tx.commit()
            .await
            .map_err(persist_err("failed to commit notification history"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::history::tests::record;
    use crate::core::record::from_epoch_seconds;

    #[tokio::test]
    async fn round_trips_records_in_order() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        assert!(store.load_history().await.unwrap().is_empty());

        let mut bytes = record("ignored", 300);
        bytes.id = RecordId::Bytes(vec![0, 159, 255]);
        bytes.category = Some("build".into());
        bytes.posted = from_epoch_seconds(1_700_000_300.123456).unwrap();
        let records = vec![bytes, record("b", 200), record("a", 100)];

        store.save_history(&records).await.unwrap();
        assert_eq!(store.load_history().await.unwrap(), records);
    }

    #[tokio::test]
    async fn save_replaces_previous_history() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        store.save_history(&[record("a", 100)]).await.unwrap();
        store
            .save_history(&[record("b", 200), record("a", 100)])
            .await
            .unwrap();
        let loaded = store.load_history().await.unwrap();
        assert_eq!(loaded, vec![record("b", 200), record("a", 100)]);
    }

    #[tokio::test]
    async fn history_survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("launchpad.db");
        let url = format!("sqlite://{}", path.display());

        let store = SqliteStore::connect(&url).await.unwrap();
        store.save_history(&[record("a", 100)]).await.unwrap();
        drop(store);

        let reopened = SqliteStore::connect(&url).await.unwrap();
        assert_eq!(
            reopened.load_history().await.unwrap(),
            vec![record("a", 100)]
        );
    }
}
