use std::collections::HashMap;

use async_trait::async_trait;
use itertools::Itertools;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use tally_core::analytics::EntryFacts;
use tally_core::domain::{
    Activity, ActivityId, Client, ClientId, NewRunningEntry, ProjectId, StoreError, TimeEntry,
    TimeEntryId, UserId,
};
use tally_core::export::{ActivityEntries, ClientTree, ProjectTree};
use tally_core::import::{ActivityRef, ImportPlan};
use tally_core::rates::RateCard;
use tally_core::store::{EntryStore, ImportOutcome};

use super::activity_repo::ActivityRow;
use super::client_repo::ClientRow;
use super::project_repo::ProjectRow;
use super::repo_error::RepositoryError;

#[async_trait]
pub trait EntryRepository {
    async fn list(
        &self,
        user_id: UserId,
        activity_id: Option<ActivityId>,
    ) -> Result<Vec<TimeEntry>, RepositoryError>;
    async fn create_manual(
        &self,
        user_id: UserId,
        entry: &NewManualEntry,
    ) -> Result<TimeEntry, RepositoryError>;
    async fn update(
        &self,
        user_id: UserId,
        entry_id: TimeEntryId,
        changes: &UpdateTimeEntry,
    ) -> Result<TimeEntry, RepositoryError>;
    async fn delete(&self, user_id: UserId, entry_id: TimeEntryId)
        -> Result<(), RepositoryError>;

    /// A client's full entry tree, completed entries only.
    async fn client_tree(
        &self,
        user_id: UserId,
        client_id: ClientId,
    ) -> Result<ClientTree, RepositoryError>;

    /// One project's entry tree plus its parent client.
    async fn project_tree(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> Result<(Client, ProjectTree), RepositoryError>;

    /// Completed entries since `since`, joined with names and rates.
    async fn entry_facts(
        &self,
        user_id: UserId,
        since: OffsetDateTime,
    ) -> Result<Vec<EntryFacts>, RepositoryError>;
}

/// A closed entry created by hand rather than by the timer. The
/// duration is always recomputed from the timestamps.
pub struct NewManualEntry {
    pub activity_id: ActivityId,
    pub start_time: OffsetDateTime,
    pub end_time: OffsetDateTime,
    pub description: Option<String>,
}

pub struct UpdateTimeEntry {
    pub start_time: OffsetDateTime,
    pub end_time: OffsetDateTime,
    pub description: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    id: Uuid,
    activity_id: Uuid,
    user_id: Uuid,
    start_time: OffsetDateTime,
    end_time: Option<OffsetDateTime>,
    duration_seconds: i64,
    description: Option<String>,
    is_running: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<EntryRow> for TimeEntry {
    fn from(row: EntryRow) -> Self {
        TimeEntry {
            id: row.id.into(),
            activity_id: row.activity_id.into(),
            user_id: row.user_id.into(),
            start_time: row.start_time,
            end_time: row.end_time,
            duration_seconds: row.duration_seconds,
            description: row.description,
            is_running: row.is_running,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FactsRow {
    #[sqlx(flatten)]
    entry: EntryRow,
    activity_name: String,
    activity_rate: Option<f64>,
    project_id: Uuid,
    project_name: String,
    project_color: String,
    project_rate: Option<f64>,
    client_rate: f64,
}

impl From<FactsRow> for EntryFacts {
    fn from(row: FactsRow) -> Self {
        EntryFacts {
            activity_id: row.entry.activity_id.into(),
            activity_name: row.activity_name,
            project_id: row.project_id.into(),
            project_name: row.project_name,
            project_color: row.project_color,
            rates: RateCard {
                activity: row.activity_rate,
                project: row.project_rate,
                client: Some(row.client_rate),
            },
            entry: row.entry.into(),
        }
    }
}

pub struct EntryRepositoryImpl {
    pool: PgPool,
}

impl EntryRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn project_trees(
        &self,
        user_id: UserId,
        projects: Vec<ProjectRow>,
    ) -> Result<Vec<ProjectTree>, RepositoryError> {
        let projects: Vec<tally_core::domain::Project> =
            projects.into_iter().map(Into::into).collect();
        let project_ids: Vec<Uuid> = projects.iter().map(|p| p.id.into()).collect();

        let activities: Vec<Activity> = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, name, description, hourly_rate, project_id, user_id, created_at, updated_at
            FROM activities
            WHERE user_id = $1 AND project_id = ANY($2)
            ORDER BY created_at
            "#,
        )
        .bind(Uuid::from(user_id))
        .bind(&project_ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

        let activity_ids: Vec<Uuid> = activities.iter().map(|a| a.id.into()).collect();
        let entries: Vec<TimeEntry> = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT id, activity_id, user_id, start_time, end_time, duration_seconds,
                   description, is_running, created_at, updated_at
            FROM time_entries
            WHERE user_id = $1 AND activity_id = ANY($2) AND end_time IS NOT NULL
            ORDER BY start_time
            "#,
        )
        .bind(Uuid::from(user_id))
        .bind(&activity_ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

        let mut entries_by_activity: HashMap<ActivityId, Vec<TimeEntry>> = entries
            .into_iter()
            .map(|e| (e.activity_id, e))
            .into_group_map();

        let mut groups_by_project: HashMap<ProjectId, Vec<ActivityEntries>> = HashMap::new();
        for activity in activities {
            let entries = entries_by_activity.remove(&activity.id).unwrap_or_default();
            groups_by_project
                .entry(activity.project_id)
                .or_default()
                .push(ActivityEntries { activity, entries });
        }

        Ok(projects
            .into_iter()
            .map(|project| ProjectTree {
                activities: groups_by_project.remove(&project.id).unwrap_or_default(),
                project,
            })
            .collect())
    }
}

const ENTRY_COLUMNS: &str = "id, activity_id, user_id, start_time, end_time, duration_seconds, \
                             description, is_running, created_at, updated_at";

#[async_trait]
impl EntryRepository for EntryRepositoryImpl {
    async fn list(
        &self,
        user_id: UserId,
        activity_id: Option<ActivityId>,
    ) -> Result<Vec<TimeEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM time_entries
            WHERE user_id = $1 AND ($2::uuid IS NULL OR activity_id = $2)
            ORDER BY start_time DESC
            "#,
        ))
        .bind(Uuid::from(user_id))
        .bind(activity_id.map(Uuid::from))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_manual(
        &self,
        user_id: UserId,
        entry: &NewManualEntry,
    ) -> Result<TimeEntry, RepositoryError> {
        let duration = (entry.end_time - entry.start_time).whole_seconds();
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            r#"
            INSERT INTO time_entries
                (activity_id, user_id, start_time, end_time, duration_seconds, description, is_running)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE)
            RETURNING {ENTRY_COLUMNS}
            "#,
        ))
        .bind(Uuid::from(entry.activity_id))
        .bind(Uuid::from(user_id))
        .bind(entry.start_time)
        .bind(entry.end_time)
        .bind(duration)
        .bind(&entry.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update(
        &self,
        user_id: UserId,
        entry_id: TimeEntryId,
        changes: &UpdateTimeEntry,
    ) -> Result<TimeEntry, RepositoryError> {
        let duration = (changes.end_time - changes.start_time).whole_seconds();
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            r#"
            UPDATE time_entries
            SET start_time = $1, end_time = $2, duration_seconds = $3, description = $4,
                is_running = FALSE, updated_at = now()
            WHERE id = $5 AND user_id = $6
            RETURNING {ENTRY_COLUMNS}
            "#,
        ))
        .bind(changes.start_time)
        .bind(changes.end_time)
        .bind(duration)
        .bind(&changes.description)
        .bind(Uuid::from(entry_id))
        .bind(Uuid::from(user_id))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into)
            .ok_or_else(|| RepositoryError::NotFound(entry_id.to_string()))
    }

    async fn delete(
        &self,
        user_id: UserId,
        entry_id: TimeEntryId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            DELETE FROM time_entries
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(Uuid::from(entry_id))
        .bind(Uuid::from(user_id))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(entry_id.to_string()));
        }

        Ok(())
    }

    async fn client_tree(
        &self,
        user_id: UserId,
        client_id: ClientId,
    ) -> Result<ClientTree, RepositoryError> {
        let client: Client = sqlx::query_as::<_, ClientRow>(
            r#"
            SELECT id, name, description, hourly_rate, color, user_id, created_at, updated_at
            FROM clients
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(Uuid::from(client_id))
        .bind(Uuid::from(user_id))
        .fetch_optional(&self.pool)
        .await?
        .map(Into::into)
        .ok_or_else(|| RepositoryError::NotFound(client_id.to_string()))?;

        let projects = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, name, description, hourly_rate, color, client_id, user_id, created_at, updated_at
            FROM projects
            WHERE user_id = $1 AND client_id = $2
            ORDER BY created_at
            "#,
        )
        .bind(Uuid::from(user_id))
        .bind(Uuid::from(client_id))
        .fetch_all(&self.pool)
        .await?;

        let projects = self.project_trees(user_id, projects).await?;
        Ok(ClientTree { client, projects })
    }

    async fn project_tree(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> Result<(Client, ProjectTree), RepositoryError> {
        let project_rows = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, name, description, hourly_rate, color, client_id, user_id, created_at, updated_at
            FROM projects
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(Uuid::from(project_id))
        .bind(Uuid::from(user_id))
        .fetch_all(&self.pool)
        .await?;
        if project_rows.is_empty() {
            return Err(RepositoryError::NotFound(project_id.to_string()));
        }

        let mut trees = self.project_trees(user_id, project_rows).await?;
        let tree = trees.remove(0);

        let client: Client = sqlx::query_as::<_, ClientRow>(
            r#"
            SELECT id, name, description, hourly_rate, color, user_id, created_at, updated_at
            FROM clients
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(Uuid::from(tree.project.client_id))
        .bind(Uuid::from(user_id))
        .fetch_optional(&self.pool)
        .await?
        .map(Into::into)
        .ok_or_else(|| RepositoryError::NotFound(tree.project.client_id.to_string()))?;

        Ok((client, tree))
    }

    async fn entry_facts(
        &self,
        user_id: UserId,
        since: OffsetDateTime,
    ) -> Result<Vec<EntryFacts>, RepositoryError> {
        let rows = sqlx::query_as::<_, FactsRow>(
            r#"
            SELECT te.id, te.activity_id, te.user_id, te.start_time, te.end_time,
                   te.duration_seconds, te.description, te.is_running, te.created_at, te.updated_at,
                   a.name AS activity_name, a.hourly_rate AS activity_rate,
                   p.id AS project_id, p.name AS project_name, p.color AS project_color,
                   p.hourly_rate AS project_rate,
                   c.hourly_rate AS client_rate
            FROM time_entries te
            JOIN activities a ON a.id = te.activity_id
            JOIN projects p ON p.id = a.project_id
            JOIN clients c ON c.id = p.client_id
            WHERE te.user_id = $1 AND te.end_time IS NOT NULL AND te.start_time >= $2
            ORDER BY te.start_time
            "#,
        )
        .bind(Uuid::from(user_id))
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl EntryStore for EntryRepositoryImpl {
    async fn find_running_entry(
        &self,
        user_id: UserId,
        activity_id: ActivityId,
    ) -> Result<Option<TimeEntry>, StoreError> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM time_entries
            WHERE user_id = $1 AND activity_id = $2 AND is_running
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        ))
        .bind(Uuid::from(user_id))
        .bind(Uuid::from(activity_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.map(Into::into))
    }

    async fn create_running_entry(
        &self,
        entry: &NewRunningEntry,
    ) -> Result<TimeEntry, StoreError> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            r#"
            INSERT INTO time_entries
                (activity_id, user_id, start_time, description, duration_seconds, is_running)
            VALUES ($1, $2, $3, $4, 0, TRUE)
            RETURNING {ENTRY_COLUMNS}
            "#,
        ))
        .bind(Uuid::from(entry.activity_id))
        .bind(Uuid::from(entry.user_id))
        .bind(entry.start_time)
        .bind(&entry.description)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.into())
    }

    async fn checkpoint_duration(
        &self,
        entry_id: TimeEntryId,
        duration_seconds: i64,
    ) -> Result<(), StoreError> {
        // The entry may have been stopped elsewhere in the meantime;
        // a zero-row update is not an error.
        sqlx::query(
            r#"
            UPDATE time_entries
            SET duration_seconds = $1, updated_at = now()
            WHERE id = $2 AND is_running
            "#,
        )
        .bind(duration_seconds)
        .bind(Uuid::from(entry_id))
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn finish_entry(
        &self,
        entry_id: TimeEntryId,
        end_time: OffsetDateTime,
        duration_seconds: i64,
    ) -> Result<TimeEntry, StoreError> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            r#"
            UPDATE time_entries
            SET end_time = $1, duration_seconds = $2, is_running = FALSE, updated_at = now()
            WHERE id = $3
            RETURNING {ENTRY_COLUMNS}
            "#,
        ))
        .bind(end_time)
        .bind(duration_seconds)
        .bind(Uuid::from(entry_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.map(Into::into)
            .ok_or_else(|| StoreError::NotFound(entry_id.to_string()))
    }

    async fn close_running_entries(
        &self,
        user_id: UserId,
        activity_id: ActivityId,
        end_time: OffsetDateTime,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE time_entries
            SET is_running = FALSE,
                end_time = $1,
                duration_seconds = GREATEST(CAST(EXTRACT(EPOCH FROM ($1 - start_time)) AS BIGINT), 0),
                updated_at = now()
            WHERE user_id = $2 AND activity_id = $3 AND is_running
            "#,
        )
        .bind(end_time)
        .bind(Uuid::from(user_id))
        .bind(Uuid::from(activity_id))
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(result.rows_affected())
    }

    async fn list_activities(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> Result<Vec<Activity>, StoreError> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, name, description, hourly_rate, project_id, user_id, created_at, updated_at
            FROM activities
            WHERE user_id = $1 AND project_id = $2
            ORDER BY created_at
            "#,
        )
        .bind(Uuid::from(user_id))
        .bind(Uuid::from(project_id))
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn import_entries(
        &self,
        user_id: UserId,
        project_id: ProjectId,
        plan: &ImportPlan,
    ) -> Result<ImportOutcome, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(RepositoryError::from)?;

        let mut created: HashMap<&str, Uuid> = HashMap::new();
        for name in &plan.new_activities {
            let (id,): (Uuid,) = sqlx::query_as(
                r#"
                INSERT INTO activities (name, project_id, user_id)
                VALUES ($1, $2, $3)
                RETURNING id
                "#,
            )
            .bind(name)
            .bind(Uuid::from(project_id))
            .bind(Uuid::from(user_id))
            .fetch_one(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;
            created.insert(name, id);
        }

        for entry in &plan.entries {
            let activity_id = match &entry.activity {
                ActivityRef::Existing(id) => Uuid::from(*id),
                ActivityRef::New(name) => *created
                    .get(name.as_str())
                    .ok_or_else(|| StoreError::NotFound(name.clone()))?,
            };

            sqlx::query(
                r#"
                INSERT INTO time_entries
                    (activity_id, user_id, start_time, end_time, duration_seconds, description, is_running)
                VALUES ($1, $2, $3, $4, $5, $6, FALSE)
                "#,
            )
            .bind(activity_id)
            .bind(Uuid::from(user_id))
            .bind(entry.start_time)
            .bind(entry.end_time)
            .bind(entry.duration_seconds)
            .bind(&entry.description)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;
        }

        tx.commit().await.map_err(RepositoryError::from)?;

        Ok(ImportOutcome {
            activities_created: plan.new_activities.len(),
            entries_created: plan.entries.len(),
        })
    }
}
