mod app_state;
mod auth;
mod config;
mod router;
mod routes;
mod repositories;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config::read_config().expect("Failed to read configuration");

    let connection_pool = PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect_lazy_with(config.database.with_db());
    sqlx::migrate!().run(&connection_pool).await?;

    let (app, app_state) = router::create(connection_pool, &config);

    let address = format!(
        "{}:{}",
        config.application.host, config.application.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Checkpoint running timers before exit; their entries stay
    // running in the store and are reconciled on the next start.
    app_state.detach_all().await;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("shutdown signal received");
}
