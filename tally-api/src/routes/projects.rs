use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use tally_core::domain::{ClientId, Project, ProjectId};

use super::ApiError;
use crate::{
    app_state::AppState,
    auth::CurrentUser,
    repositories::{NewProject, ProjectRepository, UpdateProject},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route("/:project_id", put(update_project).delete(delete_project))
}

const DEFAULT_COLOR: &str = "#22c55e";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListFilter {
    client_id: Option<ClientId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateProjectPayload {
    name: String,
    description: Option<String>,
    hourly_rate: Option<f64>,
    color: Option<String>,
    client_id: ClientId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProjectPayload {
    name: String,
    description: Option<String>,
    hourly_rate: Option<f64>,
    color: Option<String>,
}

#[instrument(name = "list_projects", skip(app_state))]
async fn list_projects(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(filter): Query<ListFilter>,
) -> Result<Json<Vec<Project>>, ApiError> {
    let projects = app_state.projects.list(user_id, filter.client_id).await?;
    Ok(Json(projects))
}

#[instrument(name = "create_project", skip(app_state, body))]
async fn create_project(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<CreateProjectPayload>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let project = app_state
        .projects
        .create(
            user_id,
            &NewProject {
                name: body.name,
                description: body.description,
                hourly_rate: body.hourly_rate,
                color: body.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
                client_id: body.client_id,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

#[instrument(name = "update_project", skip(app_state, body))]
async fn update_project(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(project_id): Path<ProjectId>,
    Json(body): Json<UpdateProjectPayload>,
) -> Result<Json<Project>, ApiError> {
    let project = app_state
        .projects
        .update(
            user_id,
            project_id,
            &UpdateProject {
                name: body.name,
                description: body.description,
                hourly_rate: body.hourly_rate,
                color: body.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            },
        )
        .await?;

    Ok(Json(project))
}

#[instrument(name = "delete_project", skip(app_state))]
async fn delete_project(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(project_id): Path<ProjectId>,
) -> Result<StatusCode, ApiError> {
    app_state.projects.delete(user_id, project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
