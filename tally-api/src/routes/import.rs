use axum::{debug_handler, extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::instrument;

use tally_core::domain::{ActivityId, ProjectId};
use tally_core::import::{build_plan, run_import, ColumnMapping, CsvTable};
use tally_core::store::{EntryStore, ImportOutcome};

use super::ApiError;
use crate::{app_state::AppState, auth::CurrentUser};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(import_entries))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportPayload {
    project_id: ProjectId,
    csv: String,
    mapping: ColumnMapping,
    /// Pins every row to one activity instead of resolving the
    /// activity column.
    activity_id: Option<ActivityId>,
}

#[instrument(name = "import_entries", skip(app_state, body))]
#[debug_handler]
async fn import_entries(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<ImportPayload>,
) -> Result<(StatusCode, Json<ImportOutcome>), ApiError> {
    let table = CsvTable::parse(&body.csv)?;
    let existing = app_state
        .entries
        .list_activities(user_id, body.project_id)
        .await?;

    let plan = build_plan(
        &table,
        &body.mapping,
        &existing,
        body.activity_id,
        OffsetDateTime::now_utc(),
    )?;

    let outcome = run_import(
        app_state.entries.as_ref(),
        user_id,
        body.project_id,
        &plan,
    )
    .await?;

    tracing::info!(
        entries = outcome.entries_created,
        activities = outcome.activities_created,
        "csv import committed"
    );
    Ok((StatusCode::CREATED, Json(outcome)))
}
