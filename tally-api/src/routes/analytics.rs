use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::instrument;

use tally_core::analytics::{build_report, AnalyticsReport, Metric, TimeRange};

use super::ApiError;
use crate::{app_state::AppState, auth::CurrentUser, repositories::EntryRepository};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(report))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportQuery {
    range: Option<String>,
    metric: Option<String>,
}

#[instrument(name = "analytics_report", skip(app_state))]
async fn report(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> Result<Json<AnalyticsReport>, ApiError> {
    let range = match query.range.as_deref() {
        Some(raw) => raw.parse::<TimeRange>().map_err(ApiError::bad_request)?,
        None => TimeRange::default(),
    };
    let metric = match query.metric.as_deref() {
        Some(raw) => raw.parse::<Metric>().map_err(ApiError::bad_request)?,
        None => Metric::default(),
    };

    let now = OffsetDateTime::now_utc();
    let since = now - time::Duration::days(range.days());
    let facts = app_state.entries.entry_facts(user_id, since).await?;

    Ok(Json(build_report(&facts, range, metric, now)))
}
