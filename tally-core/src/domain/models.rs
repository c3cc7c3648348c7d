use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{ActivityId, ClientId, ProjectId, TimeEntryId, UserId};

/// A billing client. Holds the default hourly rate for everything
/// underneath it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub description: Option<String>,
    pub hourly_rate: f64,
    pub color: String,
    pub user_id: UserId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A project under a client. `hourly_rate` is an override: `None`
/// falls through to the client rate, `Some(0.0)` is a real zero rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub hourly_rate: Option<f64>,
    pub color: String,
    pub client_id: ClientId,
    pub user_id: UserId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// An activity under a project; the unit a timer runs against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: ActivityId,
    pub name: String,
    pub description: Option<String>,
    pub hourly_rate: Option<f64>,
    pub project_id: ProjectId,
    pub user_id: UserId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A tracked span of work.
///
/// While `is_running` is true the entry has no `end_time` and
/// `duration_seconds` is only a best-effort checkpoint; the
/// authoritative elapsed time is `now - start_time`. Once stopped,
/// `duration_seconds` equals `end_time - start_time` in whole seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: TimeEntryId,
    pub activity_id: ActivityId,
    pub user_id: UserId,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    pub duration_seconds: i64,
    pub description: Option<String>,
    pub is_running: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl TimeEntry {
    /// Completed entries are the only ones that count for analytics
    /// and export.
    pub fn is_completed(&self) -> bool {
        self.end_time.is_some()
    }
}

/// Payload for creating a running entry when a timer starts.
#[derive(Debug, Clone)]
pub struct NewRunningEntry {
    pub activity_id: ActivityId,
    pub user_id: UserId,
    pub start_time: OffsetDateTime,
    pub description: Option<String>,
}
