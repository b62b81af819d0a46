//! A single `NOTIFY` event as seen by the listener.

use chrono::{DateTime, Local};
use sqlx::postgres::PgNotification;

/// One asynchronous notification.
///
/// Lives only between being dequeued from the connection and being printed;
/// notifications are never stored or retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Local time at which the notification was dequeued (not sent).
    pub received_at: DateTime<Local>,
    /// Channel the notification was published on.
    pub channel: String,
    /// Backend process ID of the notifying session.
    pub sender_pid: u32,
    /// Notification payload, possibly empty.
    pub payload: String,
}

impl Notification {
    /// Creates a notification stamped with the current local time.
    #[must_use]
    pub fn new(channel: impl Into<String>, sender_pid: u32, payload: impl Into<String>) -> Self {
        Self {
            received_at: Local::now(),
            channel: channel.into(),
            sender_pid,
            payload: payload.into(),
        }
    }
}

impl From<PgNotification> for Notification {
    fn from(notification: PgNotification) -> Self {
        Self::new(
            notification.channel(),
            notification.process_id(),
            notification.payload(),
        )
    }
}
