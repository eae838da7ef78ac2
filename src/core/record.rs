use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Opaque notification identifier. The history source sends either a byte
/// array or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Bytes(Vec<u8>),
    Text(String),
}

impl Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordId::Bytes(bytes) => {
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            RecordId::Text(text) => write!(f, "{}", text),
        }
    }
}

impl RecordId {
    /// Display form prefixed with the identifier's kind, e.g. `bytes:01ff`
    /// or `text:abc`. Unlike `Display`, two distinct ids never share it.
    pub fn qualified(&self) -> String {
        match self {
            RecordId::Bytes(_) => format!("bytes:{}", self),
            RecordId::Text(_) => format!("text:{}", self),
        }
    }

    /// Whether `query` names this id, either kind-qualified or bare.
    pub fn matches(&self, query: &str) -> bool {
        match (self, query.split_once(':')) {
            (RecordId::Bytes(_), Some(("bytes", rest))) => {
                self.to_string().eq_ignore_ascii_case(rest)
            }
            (RecordId::Text(text), Some(("text", rest))) => text == rest,
            (RecordId::Bytes(_), _) => {
                self.to_string().eq_ignore_ascii_case(query)
            }
            (RecordId::Text(text), _) => text == query,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: RecordId,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(with = "epoch_seconds")]
    pub posted: DateTime<Utc>,
    pub payload: Payload,
}

/// Seconds since the Unix epoch, keeping microsecond precision.
pub fn to_epoch_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_micros() as f64 / 1_000_000.0
}

pub fn from_epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let micros = (secs * 1_000_000.0).round();
    if micros.abs() >= i64::MAX as f64 {
        return None;
    }
    from_epoch_micros(micros as i64)
}

pub fn from_epoch_micros(micros: i64) -> Option<DateTime<Utc>> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos)
}

mod epoch_seconds {
    use chrono::{DateTime, Utc};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(
        posted: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let micros = posted.timestamp_micros();
        if micros % 1_000_000 == 0 {
            serializer.serialize_i64(micros / 1_000_000)
        } else {
            serializer.serialize_f64(super::to_epoch_seconds(*posted))
        }
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        super::from_epoch_seconds(secs).ok_or_else(|| {
            D::Error::custom(format!("timestamp out of range: {}", secs))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, json, to_value};

    #[test]
    fn decodes_byte_and_text_identifiers() {
        let records: Vec<NotificationRecord> = from_str(
            r#"[
                {"id": [1, 171, 255], "topic": "dev.launchpad",
                 "posted": 1700000000,
                 "payload": {"title": "Build", "body": "Finished"}},
                {"id": "abc-123", "topic": "dev.launchpad",
                 "category": "alerts", "posted": 1700000000.25,
                 "payload": {"title": "Deploy", "body": "Started"}}
            ]"#,
        )
        .unwrap();

        assert_eq!(records[0].id, RecordId::Bytes(vec![1, 171, 255]));
        assert_eq!(records[0].id.to_string(), "01abff");
        assert_eq!(records[0].category, None);
        assert_eq!(records[0].posted.timestamp(), 1_700_000_000);

        assert_eq!(records[1].id, RecordId::Text("abc-123".into()));
        assert_eq!(records[1].category.as_deref(), Some("alerts"));
        assert_eq!(records[1].posted.timestamp_micros(), 1_700_000_000_250_000);
    }

    #[test]
    fn encodes_whole_seconds_as_integers() {
        let record = NotificationRecord {
            id: RecordId::Text("a".into()),
            topic: "t".into(),
            category: None,
            posted: from_epoch_seconds(1_700_000_000.0).unwrap(),
            payload: Payload {
                title: "x".into(),
                body: "y".into(),
            },
        };
        assert_eq!(
            to_value(&record).unwrap(),
            json!({"id": "a", "topic": "t", "posted": 1700000000,
                   "payload": {"title": "x", "body": "y"}})
        );
    }

    #[test]
    fn rejects_malformed_timestamps() {
        let res: Result<NotificationRecord, _> = from_str(
            r#"{"id": "a", "topic": "t", "posted": "yesterday",
                "payload": {"title": "x", "body": "y"}}"#,
        );
        assert!(res.is_err());
        assert!(from_epoch_seconds(f64::NAN).is_none());
        assert!(from_epoch_seconds(1e300).is_none());
    }

    #[test]
    fn qualified_ids_tell_kinds_apart() {
        let bytes = RecordId::Bytes(vec![0xab, 0xcd]);
        let text = RecordId::Text("abcd".into());
        assert_eq!(bytes.to_string(), text.to_string());
        assert_eq!(bytes.qualified(), "bytes:abcd");
        assert_eq!(text.qualified(), "text:abcd");

        assert!(bytes.matches("abcd") && text.matches("abcd"));
        assert!(bytes.matches("bytes:ABCD"));
        assert!(!bytes.matches("text:abcd"));
        assert!(text.matches("text:abcd"));
        assert!(!text.matches("bytes:abcd"));
        assert!(RecordId::Text("text:x".into()).matches("text:x"));
    }

    #[test]
    fn negative_micros_round_trip() {
        let at = from_epoch_micros(-1_500_000).unwrap();
        assert_eq!(at.timestamp_micros(), -1_500_000);
    }
}
