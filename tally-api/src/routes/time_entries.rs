use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::instrument;

use tally_core::domain::{ActivityId, TimeEntry, TimeEntryId};

use super::ApiError;
use crate::{
    app_state::AppState,
    auth::CurrentUser,
    repositories::{EntryRepository, NewManualEntry, UpdateTimeEntry},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_entries).post(create_entry))
        .route("/:entry_id", put(update_entry).delete(delete_entry))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListFilter {
    activity_id: Option<ActivityId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateEntryPayload {
    activity_id: ActivityId,
    #[serde(with = "time::serde::rfc3339")]
    start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    end_time: OffsetDateTime,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateEntryPayload {
    #[serde(with = "time::serde::rfc3339")]
    start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    end_time: OffsetDateTime,
    description: Option<String>,
}

#[instrument(name = "list_entries", skip(app_state))]
async fn list_entries(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(filter): Query<ListFilter>,
) -> Result<Json<Vec<TimeEntry>>, ApiError> {
    let entries = app_state.entries.list(user_id, filter.activity_id).await?;
    Ok(Json(entries))
}

#[instrument(name = "create_entry", skip(app_state, body))]
async fn create_entry(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<CreateEntryPayload>,
) -> Result<(StatusCode, Json<TimeEntry>), ApiError> {
    if body.end_time < body.start_time {
        return Err(ApiError::bad_request("end time before start time"));
    }

    let entry = app_state
        .entries
        .create_manual(
            user_id,
            &NewManualEntry {
                activity_id: body.activity_id,
                start_time: body.start_time,
                end_time: body.end_time,
                description: body.description,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

#[instrument(name = "update_entry", skip(app_state, body))]
async fn update_entry(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(entry_id): Path<TimeEntryId>,
    Json(body): Json<UpdateEntryPayload>,
) -> Result<Json<TimeEntry>, ApiError> {
    if body.end_time < body.start_time {
        return Err(ApiError::bad_request("end time before start time"));
    }

    let entry = app_state
        .entries
        .update(
            user_id,
            entry_id,
            &UpdateTimeEntry {
                start_time: body.start_time,
                end_time: body.end_time,
                description: body.description,
            },
        )
        .await?;

    Ok(Json(entry))
}

#[instrument(name = "delete_entry", skip(app_state))]
async fn delete_entry(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(entry_id): Path<TimeEntryId>,
) -> Result<StatusCode, ApiError> {
    app_state.entries.delete(user_id, entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
