use async_trait::async_trait;
use sqlx::PgPool;
use tally_core::domain::{Activity, ActivityId, ProjectId, UserId};
use uuid::Uuid;

use super::repo_error::RepositoryError;

#[async_trait]
pub trait ActivityRepository {
    async fn list(
        &self,
        user_id: UserId,
        project_id: Option<ProjectId>,
    ) -> Result<Vec<Activity>, RepositoryError>;
    async fn find(
        &self,
        user_id: UserId,
        activity_id: ActivityId,
    ) -> Result<Activity, RepositoryError>;
    async fn create(
        &self,
        user_id: UserId,
        activity: &NewActivity,
    ) -> Result<Activity, RepositoryError>;
    async fn update(
        &self,
        user_id: UserId,
        activity_id: ActivityId,
        changes: &UpdateActivity,
    ) -> Result<Activity, RepositoryError>;
    async fn delete(&self, user_id: UserId, activity_id: ActivityId)
        -> Result<(), RepositoryError>;
}

pub struct NewActivity {
    pub name: String,
    pub description: Option<String>,
    pub hourly_rate: Option<f64>,
    pub project_id: ProjectId,
}

pub struct UpdateActivity {
    pub name: String,
    pub description: Option<String>,
    pub hourly_rate: Option<f64>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ActivityRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    hourly_rate: Option<f64>,
    project_id: Uuid,
    user_id: Uuid,
    created_at: time::OffsetDateTime,
    updated_at: time::OffsetDateTime,
}

impl From<ActivityRow> for Activity {
    fn from(row: ActivityRow) -> Self {
        Activity {
            id: row.id.into(),
            name: row.name,
            description: row.description,
            hourly_rate: row.hourly_rate,
            project_id: row.project_id.into(),
            user_id: row.user_id.into(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct ActivityRepositoryImpl {
    pool: PgPool,
}

impl ActivityRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ACTIVITY_COLUMNS: &str =
    "id, name, description, hourly_rate, project_id, user_id, created_at, updated_at";

#[async_trait]
impl ActivityRepository for ActivityRepositoryImpl {
    async fn list(
        &self,
        user_id: UserId,
        project_id: Option<ProjectId>,
    ) -> Result<Vec<Activity>, RepositoryError> {
        let rows = sqlx::query_as::<_, ActivityRow>(&format!(
            r#"
            SELECT {ACTIVITY_COLUMNS}
            FROM activities
            WHERE user_id = $1 AND ($2::uuid IS NULL OR project_id = $2)
            ORDER BY created_at
            "#,
        ))
        .bind(Uuid::from(user_id))
        .bind(project_id.map(Uuid::from))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find(
        &self,
        user_id: UserId,
        activity_id: ActivityId,
    ) -> Result<Activity, RepositoryError> {
        let row = sqlx::query_as::<_, ActivityRow>(&format!(
            r#"
            SELECT {ACTIVITY_COLUMNS}
            FROM activities
            WHERE id = $1 AND user_id = $2
            "#,
        ))
        .bind(Uuid::from(activity_id))
        .bind(Uuid::from(user_id))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into)
            .ok_or_else(|| RepositoryError::NotFound(activity_id.to_string()))
    }

    async fn create(
        &self,
        user_id: UserId,
        activity: &NewActivity,
    ) -> Result<Activity, RepositoryError> {
        let row = sqlx::query_as::<_, ActivityRow>(&format!(
            r#"
            INSERT INTO activities (name, description, hourly_rate, project_id, user_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ACTIVITY_COLUMNS}
            "#,
        ))
        .bind(&activity.name)
        .bind(&activity.description)
        .bind(activity.hourly_rate)
        .bind(Uuid::from(activity.project_id))
        .bind(Uuid::from(user_id))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update(
        &self,
        user_id: UserId,
        activity_id: ActivityId,
        changes: &UpdateActivity,
    ) -> Result<Activity, RepositoryError> {
        let row = sqlx::query_as::<_, ActivityRow>(&format!(
            r#"
            UPDATE activities
            SET name = $1, description = $2, hourly_rate = $3, updated_at = now()
            WHERE id = $4 AND user_id = $5
            RETURNING {ACTIVITY_COLUMNS}
            "#,
        ))
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.hourly_rate)
        .bind(Uuid::from(activity_id))
        .bind(Uuid::from(user_id))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into)
            .ok_or_else(|| RepositoryError::NotFound(activity_id.to_string()))
    }

    async fn delete(
        &self,
        user_id: UserId,
        activity_id: ActivityId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            DELETE FROM activities
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(Uuid::from(activity_id))
        .bind(Uuid::from(user_id))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(activity_id.to_string()));
        }

        Ok(())
    }
}
