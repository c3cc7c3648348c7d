//! Outbound port to the persisted entry store.
//!
//! The store is the single source of truth for "is a timer running";
//! the engine never trusts purely local state across a remount. The
//! Postgres implementation lives in the API crate; [`memory`] holds
//! an in-memory implementation for tests.

mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::{
    Activity, ActivityId, NewRunningEntry, ProjectId, StoreError, TimeEntry, TimeEntryId, UserId,
};
use crate::import::ImportPlan;

/// What an all-or-nothing import committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub activities_created: usize,
    pub entries_created: usize,
}

#[async_trait]
pub trait EntryStore: Send + Sync + 'static {
    /// The at-most-one running entry for this user and activity.
    async fn find_running_entry(
        &self,
        user_id: UserId,
        activity_id: ActivityId,
    ) -> Result<Option<TimeEntry>, StoreError>;

    /// Insert a new running entry (`is_running = true`, duration 0).
    async fn create_running_entry(&self, entry: &NewRunningEntry)
        -> Result<TimeEntry, StoreError>;

    /// Best-effort progress write for a running entry.
    async fn checkpoint_duration(
        &self,
        entry_id: TimeEntryId,
        duration_seconds: i64,
    ) -> Result<(), StoreError>;

    /// Finalize a running entry with its authoritative duration.
    async fn finish_entry(
        &self,
        entry_id: TimeEntryId,
        end_time: OffsetDateTime,
        duration_seconds: i64,
    ) -> Result<TimeEntry, StoreError>;

    /// Close every running entry for this user and activity with a
    /// synthesized end time. Returns how many were closed. Used as
    /// defensive cleanup before starting a new timer.
    async fn close_running_entries(
        &self,
        user_id: UserId,
        activity_id: ActivityId,
        end_time: OffsetDateTime,
    ) -> Result<u64, StoreError>;

    /// Activities under a project, used to resolve CSV rows by name.
    async fn list_activities(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> Result<Vec<Activity>, StoreError>;

    /// Execute an import plan atomically: create the plan's new
    /// activities, then insert every entry. Any failure must leave
    /// the store untouched.
    async fn import_entries(
        &self,
        user_id: UserId,
        project_id: ProjectId,
        plan: &ImportPlan,
    ) -> Result<ImportOutcome, StoreError>;
}
