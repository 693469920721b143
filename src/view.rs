//! What the console shows, independent of the widgets showing it.

use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::model::{DemoUser, Notification};

pub const TITLE: &str = "🚀 Insyd Notification POC";
pub const PLACEHOLDER: &str = "No notifications yet 🚫";
pub const INVALID_DATE: &str = "Invalid Date";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Empty(&'static str),
    Items(Vec<Row>),
}

/// One rendered notification, keyed by its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub key: String,
    pub kind: String,
    pub content: String,
    pub timestamp: String,
}

pub fn listing(notifications: &[Notification]) -> Listing {
    if notifications.is_empty() {
        return Listing::Empty(PLACEHOLDER);
    }

    Listing::Items(
        notifications
            .iter()
            .map(|notification| Row {
                key: notification.notification_id.clone(),
                kind: notification.kind.clone(),
                content: notification.content.clone(),
                timestamp: format_timestamp(notification.timestamp),
            })
            .collect(),
    )
}

pub fn header(target: DemoUser) -> String {
    format!("Notifications for {target}")
}

/// Formats in local time, shaped like `toLocaleString` in en-US.
pub fn format_timestamp(timestamp: Option<DateTime<Utc>>) -> String {
    match timestamp {
        Some(timestamp) => format_in(&timestamp.with_timezone(&Local)),
        None => INVALID_DATE.to_owned(),
    }
}

fn format_in<Tz>(timestamp: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    timestamp.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}
