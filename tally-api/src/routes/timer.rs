use axum::{
    debug_handler,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use tally_core::domain::{ActivityId, TimeEntry};
use tally_core::engine::TimerStatus;

use super::ApiError;
use crate::{app_state::AppState, auth::CurrentUser};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(timer_status).post(start_timer).delete(stop_timer))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimerQuery {
    activity_id: ActivityId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartTimerPayload {
    activity_id: ActivityId,
}

#[instrument(name = "timer_status", skip(app_state))]
async fn timer_status(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<TimerQuery>,
) -> Result<Json<TimerStatus>, ApiError> {
    let engine = app_state.engine(user_id, query.activity_id).await;
    Ok(Json(engine.status().await))
}

#[instrument(name = "start_timer", skip(app_state))]
#[debug_handler]
async fn start_timer(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<StartTimerPayload>,
) -> Result<(StatusCode, Json<TimeEntry>), ApiError> {
    let engine = app_state.engine(user_id, body.activity_id).await;
    let entry = engine.start().await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[instrument(name = "stop_timer", skip(app_state))]
async fn stop_timer(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<TimerQuery>,
) -> Result<Json<TimeEntry>, ApiError> {
    let engine = app_state.engine(user_id, query.activity_id).await;
    let entry = engine.stop().await?;
    drop(engine);
    app_state.release(user_id, query.activity_id).await;
    Ok(Json(entry))
}
