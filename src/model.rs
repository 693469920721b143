use std::fmt;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The kind of synthetic event the console can trigger.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    #[default]
    Like,
    Comment,
    Follow,
}

impl EventType {
    pub const ALL: [Self; 3] = [Self::Like, Self::Comment, Self::Follow];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Comment => "comment",
            Self::Follow => "follow",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Like => "Like",
            Self::Comment => "Comment",
            Self::Follow => "Follow",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the two hardcoded demo identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DemoUser {
    #[serde(rename = "user1")]
    Alice,
    #[serde(rename = "user2")]
    Bob,
}

impl DemoUser {
    pub const ALL: [Self; 2] = [Self::Alice, Self::Bob];

    pub fn id(self) -> &'static str {
        match self {
            Self::Alice => "user1",
            Self::Bob => "user2",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Alice => "Alice",
            Self::Bob => "Bob",
        }
    }
}

impl fmt::Display for DemoUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// The body of `POST /events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventType,
    pub source_user_id: DemoUser,
    pub target_user_id: DemoUser,
    pub data: EventData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    pub source_username: String,
}

impl Event {
    pub fn new(kind: EventType, source: DemoUser, target: DemoUser) -> Self {
        Self {
            kind,
            source_user_id: source,
            target_user_id: target,
            data: EventData {
                source_username: source.display_name().to_owned(),
            },
        }
    }
}

/// A notification as served by `GET /notifications/{user}`.
///
/// The backend owns these; the console only ever replaces whole snapshots of
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default, deserialize_with = "lenient_text")]
    pub notification_id: String,
    /// Left as an open string, the backend may add kinds.
    #[serde(default, rename = "type", deserialize_with = "lenient_text")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub content: String,
    /// `None` when the backend sent something that is not a time.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

// Renders scalars the way JSX text does: `null` and booleans are blank.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Null | Value::Bool(_) => String::new(),
        other => other.to_string(),
    })
}

// Accepts what a JS `Date` would: ISO-8601 strings and epoch milliseconds.
// Date-times without an offset are local time, bare dates are UTC midnight.
fn lenient_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let timestamp = match Value::deserialize(deserializer)? {
        Value::String(text) => parse_date(text.trim()),
        Value::Number(millis) => millis
            .as_i64()
            .or_else(|| millis.as_f64().map(|millis| millis as i64))
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    };

    Ok(timestamp)
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    let local = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok());
    if let Some(naive) = local {
        return Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
