mod backend;
mod config;
mod exports;
mod metrics;
mod overlay;
mod resource;
mod routes;
mod session;
mod state;
mod templates;
mod upload;
mod views;

use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reviewguard=info,tower_http=info".into()),
        )
        .init();

    let config = config::Config::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Using detection backend at {}", config.backend_url);

    // Parse templates at startup.
    templates::get_tera();

    let state = Arc::new(state::AppState::new(config)?);
    let app = routes::router(state);

    tracing::info!("ReviewGuard listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
