use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use tally_core::domain::{Client, ClientId};

use super::ApiError;
use crate::{
    app_state::AppState,
    auth::CurrentUser,
    repositories::{ClientRepository, NewClient, UpdateClient},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_clients).post(create_client))
        .route("/:client_id", put(update_client).delete(delete_client))
}

const DEFAULT_COLOR: &str = "#22c55e";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientPayload {
    name: String,
    description: Option<String>,
    hourly_rate: f64,
    color: Option<String>,
}

#[instrument(name = "list_clients", skip(app_state))]
async fn list_clients(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<Client>>, ApiError> {
    let clients = app_state.clients.list(user_id).await?;
    Ok(Json(clients))
}

#[instrument(name = "create_client", skip(app_state, body))]
#[debug_handler]
async fn create_client(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<ClientPayload>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    let client = app_state
        .clients
        .create(
            user_id,
            &NewClient {
                name: body.name,
                description: body.description,
                hourly_rate: body.hourly_rate,
                color: body.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(client)))
}

#[instrument(name = "update_client", skip(app_state, body))]
async fn update_client(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(client_id): Path<ClientId>,
    Json(body): Json<ClientPayload>,
) -> Result<Json<Client>, ApiError> {
    let client = app_state
        .clients
        .update(
            user_id,
            client_id,
            &UpdateClient {
                name: body.name,
                description: body.description,
                hourly_rate: body.hourly_rate,
                color: body.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            },
        )
        .await?;

    Ok(Json(client))
}

#[instrument(name = "delete_client", skip(app_state))]
async fn delete_client(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(client_id): Path<ClientId>,
) -> Result<StatusCode, ApiError> {
    app_state.clients.delete(user_id, client_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
