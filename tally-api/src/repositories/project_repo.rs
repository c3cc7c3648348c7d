use async_trait::async_trait;
use sqlx::PgPool;
use tally_core::domain::{ClientId, Project, ProjectId, UserId};
use uuid::Uuid;

use super::repo_error::RepositoryError;

#[async_trait]
pub trait ProjectRepository {
    async fn list(
        &self,
        user_id: UserId,
        client_id: Option<ClientId>,
    ) -> Result<Vec<Project>, RepositoryError>;
    async fn find(&self, user_id: UserId, project_id: ProjectId)
        -> Result<Project, RepositoryError>;
    async fn create(
        &self,
        user_id: UserId,
        project: &NewProject,
    ) -> Result<Project, RepositoryError>;
    async fn update(
        &self,
        user_id: UserId,
        project_id: ProjectId,
        changes: &UpdateProject,
    ) -> Result<Project, RepositoryError>;
    async fn delete(&self, user_id: UserId, project_id: ProjectId) -> Result<(), RepositoryError>;
}

pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub hourly_rate: Option<f64>,
    pub color: String,
    pub client_id: ClientId,
}

pub struct UpdateProject {
    pub name: String,
    pub description: Option<String>,
    pub hourly_rate: Option<f64>,
    pub color: String,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProjectRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    hourly_rate: Option<f64>,
    color: String,
    client_id: Uuid,
    user_id: Uuid,
    created_at: time::OffsetDateTime,
    updated_at: time::OffsetDateTime,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: row.id.into(),
            name: row.name,
            description: row.description,
            hourly_rate: row.hourly_rate,
            color: row.color,
            client_id: row.client_id.into(),
            user_id: row.user_id.into(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct ProjectRepositoryImpl {
    pool: PgPool,
}

impl ProjectRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PROJECT_COLUMNS: &str =
    "id, name, description, hourly_rate, color, client_id, user_id, created_at, updated_at";

#[async_trait]
impl ProjectRepository for ProjectRepositoryImpl {
    async fn list(
        &self,
        user_id: UserId,
        client_id: Option<ClientId>,
    ) -> Result<Vec<Project>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProjectRow>(&format!(
            r#"
            SELECT {PROJECT_COLUMNS}
            FROM projects
            WHERE user_id = $1 AND ($2::uuid IS NULL OR client_id = $2)
            ORDER BY created_at
            "#,
        ))
        .bind(Uuid::from(user_id))
        .bind(client_id.map(Uuid::from))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> Result<Project, RepositoryError> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            r#"
            SELECT {PROJECT_COLUMNS}
            FROM projects
            WHERE id = $1 AND user_id = $2
            "#,
        ))
        .bind(Uuid::from(project_id))
        .bind(Uuid::from(user_id))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into)
            .ok_or_else(|| RepositoryError::NotFound(project_id.to_string()))
    }

    async fn create(
        &self,
        user_id: UserId,
        project: &NewProject,
    ) -> Result<Project, RepositoryError> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            r#"
            INSERT INTO projects (name, description, hourly_rate, color, client_id, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PROJECT_COLUMNS}
            "#,
        ))
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.hourly_rate)
        .bind(&project.color)
        .bind(Uuid::from(project.client_id))
        .bind(Uuid::from(user_id))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update(
        &self,
        user_id: UserId,
        project_id: ProjectId,
        changes: &UpdateProject,
    ) -> Result<Project, RepositoryError> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            r#"
            UPDATE projects
            SET name = $1, description = $2, hourly_rate = $3, color = $4, updated_at = now()
            WHERE id = $5 AND user_id = $6
            RETURNING {PROJECT_COLUMNS}
            "#,
        ))
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.hourly_rate)
        .bind(&changes.color)
        .bind(Uuid::from(project_id))
        .bind(Uuid::from(user_id))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into)
            .ok_or_else(|| RepositoryError::NotFound(project_id.to_string()))
    }

    async fn delete(&self, user_id: UserId, project_id: ProjectId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            DELETE FROM projects
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(Uuid::from(project_id))
        .bind(Uuid::from(user_id))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(project_id.to_string()));
        }

        Ok(())
    }
}
