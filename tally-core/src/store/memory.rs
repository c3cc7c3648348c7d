//! In-memory entry store for tests and local development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use time::OffsetDateTime;

use super::{EntryStore, ImportOutcome};
use crate::domain::{
    Activity, ActivityId, NewRunningEntry, ProjectId, StoreError, TimeEntry, TimeEntryId, UserId,
};
use crate::import::{ActivityRef, ImportPlan};

#[derive(Default)]
struct State {
    entries: HashMap<TimeEntryId, TimeEntry>,
    activities: HashMap<ActivityId, Activity>,
}

/// HashMap-backed [`EntryStore`] with failure injection knobs so
/// tests can exercise the engine's error paths.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    /// Fail the Nth (zero-based) entry insert of an import.
    fail_import_at: Mutex<Option<usize>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a running entry directly, as if a previous session had
    /// started it.
    pub fn seed_running_entry(
        &self,
        user_id: UserId,
        activity_id: ActivityId,
        start_time: OffsetDateTime,
    ) -> TimeEntry {
        let entry = TimeEntry {
            id: TimeEntryId::random(),
            activity_id,
            user_id,
            start_time,
            end_time: None,
            duration_seconds: 0,
            description: None,
            is_running: true,
            created_at: start_time,
            updated_at: start_time,
        };
        self.state
            .lock()
            .unwrap()
            .entries
            .insert(entry.id, entry.clone());
        entry
    }

    pub fn seed_activity(&self, activity: Activity) {
        self.state
            .lock()
            .unwrap()
            .activities
            .insert(activity.id, activity);
    }

    pub fn entry(&self, id: TimeEntryId) -> Option<TimeEntry> {
        self.state.lock().unwrap().entries.get(&id).cloned()
    }

    pub fn running_entries(&self, activity_id: ActivityId) -> Vec<TimeEntry> {
        self.state
            .lock()
            .unwrap()
            .entries
            .values()
            .filter(|e| e.activity_id == activity_id && e.is_running)
            .cloned()
            .collect()
    }

    pub fn entry_count(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    pub fn activity_count(&self) -> usize {
        self.state.lock().unwrap().activities.len()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_import_at(&self, index: usize) {
        *self.fail_import_at.lock().unwrap() = Some(index);
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::backend("simulated read failure"));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::backend("simulated write failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl EntryStore for InMemoryStore {
    async fn find_running_entry(
        &self,
        user_id: UserId,
        activity_id: ActivityId,
    ) -> Result<Option<TimeEntry>, StoreError> {
        self.check_read()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .entries
            .values()
            .find(|e| e.user_id == user_id && e.activity_id == activity_id && e.is_running)
            .cloned())
    }

    async fn create_running_entry(
        &self,
        entry: &NewRunningEntry,
    ) -> Result<TimeEntry, StoreError> {
        self.check_write()?;
        let created = TimeEntry {
            id: TimeEntryId::random(),
            activity_id: entry.activity_id,
            user_id: entry.user_id,
            start_time: entry.start_time,
            end_time: None,
            duration_seconds: 0,
            description: entry.description.clone(),
            is_running: true,
            created_at: entry.start_time,
            updated_at: entry.start_time,
        };
        self.state
            .lock()
            .unwrap()
            .entries
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn checkpoint_duration(
        &self,
        entry_id: TimeEntryId,
        duration_seconds: i64,
    ) -> Result<(), StoreError> {
        self.check_write()?;
        let mut state = self.state.lock().unwrap();
        let entry = state
            .entries
            .get_mut(&entry_id)
            .ok_or_else(|| StoreError::NotFound(entry_id.to_string()))?;
        entry.duration_seconds = duration_seconds;
        entry.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn finish_entry(
        &self,
        entry_id: TimeEntryId,
        end_time: OffsetDateTime,
        duration_seconds: i64,
    ) -> Result<TimeEntry, StoreError> {
        self.check_write()?;
        let mut state = self.state.lock().unwrap();
        let entry = state
            .entries
            .get_mut(&entry_id)
            .ok_or_else(|| StoreError::NotFound(entry_id.to_string()))?;
        entry.end_time = Some(end_time);
        entry.duration_seconds = duration_seconds;
        entry.is_running = false;
        entry.updated_at = end_time;
        Ok(entry.clone())
    }

    async fn close_running_entries(
        &self,
        user_id: UserId,
        activity_id: ActivityId,
        end_time: OffsetDateTime,
    ) -> Result<u64, StoreError> {
        self.check_write()?;
        let mut closed = 0;
        let mut state = self.state.lock().unwrap();
        for entry in state.entries.values_mut() {
            if entry.user_id == user_id && entry.activity_id == activity_id && entry.is_running {
                entry.is_running = false;
                entry.end_time = Some(end_time);
                entry.duration_seconds = (end_time - entry.start_time).whole_seconds().max(0);
                entry.updated_at = end_time;
                closed += 1;
            }
        }
        Ok(closed)
    }

    async fn list_activities(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> Result<Vec<Activity>, StoreError> {
        self.check_read()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .activities
            .values()
            .filter(|a| a.user_id == user_id && a.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn import_entries(
        &self,
        user_id: UserId,
        project_id: ProjectId,
        plan: &ImportPlan,
    ) -> Result<ImportOutcome, StoreError> {
        self.check_write()?;
        let fail_at = *self.fail_import_at.lock().unwrap();
        let now = OffsetDateTime::now_utc();

        // Stage everything first so a failure leaves the store
        // untouched, mirroring the transactional Postgres path.
        let mut staged_activities: HashMap<String, Activity> = HashMap::new();
        for name in &plan.new_activities {
            let activity = Activity {
                id: ActivityId::random(),
                name: name.clone(),
                description: None,
                hourly_rate: None,
                project_id,
                user_id,
                created_at: now,
                updated_at: now,
            };
            staged_activities.insert(name.clone(), activity);
        }

        let mut staged_entries = Vec::with_capacity(plan.entries.len());
        for (idx, planned) in plan.entries.iter().enumerate() {
            if fail_at == Some(idx) {
                return Err(StoreError::backend("simulated insert failure"));
            }
            let activity_id = match &planned.activity {
                ActivityRef::Existing(id) => *id,
                ActivityRef::New(name) => staged_activities
                    .get(name)
                    .map(|a| a.id)
                    .ok_or_else(|| StoreError::NotFound(name.clone()))?,
            };
            staged_entries.push(TimeEntry {
                id: TimeEntryId::random(),
                activity_id,
                user_id,
                start_time: planned.start_time,
                end_time: Some(planned.end_time),
                duration_seconds: planned.duration_seconds,
                description: planned.description.clone(),
                is_running: false,
                created_at: now,
                updated_at: now,
            });
        }

        let outcome = ImportOutcome {
            activities_created: staged_activities.len(),
            entries_created: staged_entries.len(),
        };

        let mut state = self.state.lock().unwrap();
        for activity in staged_activities.into_values() {
            state.activities.insert(activity.id, activity);
        }
        for entry in staged_entries {
            state.entries.insert(entry.id, entry);
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{build_plan, ColumnMapping, CsvTable};

    const CSV: &str = "Start,End,Task\n\
                       2024-05-01 09:00,2024-05-01 10:00,research\n\
                       2024-05-01 10:00,2024-05-01 11:30,writing\n";

    fn plan() -> ImportPlan {
        let table = CsvTable::parse(CSV).unwrap();
        let mapping = ColumnMapping {
            start_time: Some("Start".into()),
            end_time: Some("End".into()),
            activity: Some("Task".into()),
            ..Default::default()
        };
        build_plan(&table, &mapping, &[], None, OffsetDateTime::now_utc()).unwrap()
    }

    #[tokio::test]
    async fn import_commits_activities_and_entries() {
        let store = InMemoryStore::new();
        let outcome = store
            .import_entries(UserId::random(), ProjectId::random(), &plan())
            .await
            .unwrap();

        assert_eq!(outcome.activities_created, 2);
        assert_eq!(outcome.entries_created, 2);
        assert_eq!(store.entry_count(), 2);
        assert_eq!(store.activity_count(), 2);
    }

    #[tokio::test]
    async fn failed_import_commits_nothing() {
        let store = InMemoryStore::new();
        store.set_fail_import_at(1);

        let result = store
            .import_entries(UserId::random(), ProjectId::random(), &plan())
            .await;

        assert!(result.is_err());
        assert_eq!(store.entry_count(), 0);
        assert_eq!(store.activity_count(), 0);
    }
}
