use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use tally_core::domain::{Activity, ActivityId, ProjectId};

use super::ApiError;
use crate::{
    app_state::AppState,
    auth::CurrentUser,
    repositories::{ActivityRepository, NewActivity, UpdateActivity},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_activities).post(create_activity))
        .route(
            "/:activity_id",
            put(update_activity).delete(delete_activity),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListFilter {
    project_id: Option<ProjectId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateActivityPayload {
    name: String,
    description: Option<String>,
    hourly_rate: Option<f64>,
    project_id: ProjectId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateActivityPayload {
    name: String,
    description: Option<String>,
    hourly_rate: Option<f64>,
}

#[instrument(name = "list_activities", skip(app_state))]
async fn list_activities(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(filter): Query<ListFilter>,
) -> Result<Json<Vec<Activity>>, ApiError> {
    let activities = app_state.activities.list(user_id, filter.project_id).await?;
    Ok(Json(activities))
}

#[instrument(name = "create_activity", skip(app_state, body))]
async fn create_activity(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<CreateActivityPayload>,
) -> Result<(StatusCode, Json<Activity>), ApiError> {
    let activity = app_state
        .activities
        .create(
            user_id,
            &NewActivity {
                name: body.name,
                description: body.description,
                hourly_rate: body.hourly_rate,
                project_id: body.project_id,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(activity)))
}

#[instrument(name = "update_activity", skip(app_state, body))]
async fn update_activity(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(activity_id): Path<ActivityId>,
    Json(body): Json<UpdateActivityPayload>,
) -> Result<Json<Activity>, ApiError> {
    let activity = app_state
        .activities
        .update(
            user_id,
            activity_id,
            &UpdateActivity {
                name: body.name,
                description: body.description,
                hourly_rate: body.hourly_rate,
            },
        )
        .await?;

    Ok(Json(activity))
}

#[instrument(name = "delete_activity", skip(app_state))]
async fn delete_activity(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(activity_id): Path<ActivityId>,
) -> Result<StatusCode, ApiError> {
    app_state.activities.delete(user_id, activity_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
