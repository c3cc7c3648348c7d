use axum::{http::Method, routing::get, Router};
use sqlx::PgPool;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::{app_state::AppState, config::Settings, routes};

pub fn create(connection_pool: PgPool, config: &Settings) -> (Router<()>, AppState) {
    let app = Router::new()
        .route("/", get(|| async { "tally-api" }))
        .nest("/clients", routes::clients::router())
        .nest("/projects", routes::projects::router())
        .nest("/activities", routes::activities::router())
        .nest("/time-entries", routes::time_entries::router())
        .nest("/timer", routes::timer::router())
        .nest("/import", routes::import::router())
        .nest("/export", routes::export::router())
        .nest("/analytics", routes::analytics::router());

    let app_state = AppState::new(
        connection_pool,
        Duration::from_secs(config.application.checkpoint_interval_seconds),
    );

    let app_url = config.application.app_url.clone();
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(["content-type".parse().unwrap(), "x-user-id".parse().unwrap()])
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            origin.to_str().unwrap_or_default() == app_url
        }));

    let router = app
        .with_state(app_state.clone())
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()));

    (router, app_state)
}
