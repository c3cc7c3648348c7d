use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue},
    routing::get,
    Router,
};
use tracing::instrument;

use tally_core::domain::{ClientId, ProjectId};
use tally_core::export::{client_csv, project_csv};

use super::ApiError;
use crate::{app_state::AppState, auth::CurrentUser, repositories::EntryRepository};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/clients/:client_id", get(export_client))
        .route("/projects/:project_id", get(export_project))
}

fn csv_headers(filename: &str) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    let disposition = format!("attachment; filename=\"{filename}\"");
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .map_err(|_| ApiError::internal("could not generate export file"))?,
    );
    Ok(headers)
}

fn filename(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    format!("{}-time-entries.csv", safe.to_lowercase())
}

#[instrument(name = "export_client", skip(app_state))]
async fn export_client(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(client_id): Path<ClientId>,
) -> Result<(HeaderMap, String), ApiError> {
    let tree = app_state.entries.client_tree(user_id, client_id).await?;
    let headers = csv_headers(&filename(&tree.client.name))?;
    Ok((headers, client_csv(&tree)))
}

#[instrument(name = "export_project", skip(app_state))]
async fn export_project(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(project_id): Path<ProjectId>,
) -> Result<(HeaderMap, String), ApiError> {
    let (client, tree) = app_state.entries.project_tree(user_id, project_id).await?;
    let headers = csv_headers(&filename(&tree.project.name))?;
    Ok((headers, project_csv(&client, &tree)))
}
