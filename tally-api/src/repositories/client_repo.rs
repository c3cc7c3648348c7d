use async_trait::async_trait;
use sqlx::PgPool;
use tally_core::domain::{Client, ClientId, UserId};
use uuid::Uuid;

use super::repo_error::RepositoryError;

#[async_trait]
pub trait ClientRepository {
    async fn list(&self, user_id: UserId) -> Result<Vec<Client>, RepositoryError>;
    async fn find(&self, user_id: UserId, client_id: ClientId) -> Result<Client, RepositoryError>;
    async fn create(&self, user_id: UserId, client: &NewClient) -> Result<Client, RepositoryError>;
    async fn update(
        &self,
        user_id: UserId,
        client_id: ClientId,
        changes: &UpdateClient,
    ) -> Result<Client, RepositoryError>;
    async fn delete(&self, user_id: UserId, client_id: ClientId) -> Result<(), RepositoryError>;
}

pub struct NewClient {
    pub name: String,
    pub description: Option<String>,
    pub hourly_rate: f64,
    pub color: String,
}

pub struct UpdateClient {
    pub name: String,
    pub description: Option<String>,
    pub hourly_rate: f64,
    pub color: String,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ClientRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    hourly_rate: f64,
    color: String,
    user_id: Uuid,
    created_at: time::OffsetDateTime,
    updated_at: time::OffsetDateTime,
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Client {
            id: row.id.into(),
            name: row.name,
            description: row.description,
            hourly_rate: row.hourly_rate,
            color: row.color,
            user_id: row.user_id.into(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct ClientRepositoryImpl {
    pool: PgPool,
}

impl ClientRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientRepository for ClientRepositoryImpl {
    async fn list(&self, user_id: UserId) -> Result<Vec<Client>, RepositoryError> {
        let rows = sqlx::query_as::<_, ClientRow>(
            r#"
            SELECT id, name, description, hourly_rate, color, user_id, created_at, updated_at
            FROM clients
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(Uuid::from(user_id))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find(&self, user_id: UserId, client_id: ClientId) -> Result<Client, RepositoryError> {
        let row = sqlx::query_as::<_, ClientRow>(
            r#"
            SELECT id, name, description, hourly_rate, color, user_id, created_at, updated_at
            FROM clients
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(Uuid::from(client_id))
        .bind(Uuid::from(user_id))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into)
            .ok_or_else(|| RepositoryError::NotFound(client_id.to_string()))
    }

    async fn create(&self, user_id: UserId, client: &NewClient) -> Result<Client, RepositoryError> {
        let row = sqlx::query_as::<_, ClientRow>(
            r#"
            INSERT INTO clients (name, description, hourly_rate, color, user_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, hourly_rate, color, user_id, created_at, updated_at
            "#,
        )
        .bind(&client.name)
        .bind(&client.description)
        .bind(client.hourly_rate)
        .bind(&client.color)
        .bind(Uuid::from(user_id))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update(
        &self,
        user_id: UserId,
        client_id: ClientId,
        changes: &UpdateClient,
    ) -> Result<Client, RepositoryError> {
        let row = sqlx::query_as::<_, ClientRow>(
            r#"
            UPDATE clients
            SET name = $1, description = $2, hourly_rate = $3, color = $4, updated_at = now()
            WHERE id = $5 AND user_id = $6
            RETURNING id, name, description, hourly_rate, color, user_id, created_at, updated_at
            "#,
        )
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.hourly_rate)
        .bind(&changes.color)
        .bind(Uuid::from(client_id))
        .bind(Uuid::from(user_id))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into)
            .ok_or_else(|| RepositoryError::NotFound(client_id.to_string()))
    }

    async fn delete(&self, user_id: UserId, client_id: ClientId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            DELETE FROM clients
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(Uuid::from(client_id))
        .bind(Uuid::from(user_id))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(client_id.to_string()));
        }

        Ok(())
    }
}
