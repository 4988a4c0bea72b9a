pub mod embed;
pub mod error;
pub mod render;
pub mod routes;
pub mod state;
pub mod sync;

use axum::routing::{get, post};
use axum::Router;
use depboard_core::config::Config;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with all routes and middleware.
/// Used by `serve_on()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes::view::index))
        // Live sync (SSE)
        .route("/events", get(routes::events::sse_events))
        // API
        .route("/api/dashboard", get(routes::dashboard::get_dashboard))
        .route("/api/update", post(routes::update::update_field))
        // Static
        .route("/assets/{*path}", get(embed::asset_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Serve the dashboard on `0.0.0.0:{port}`.
pub async fn serve(config: Config, port: u16, open_browser: bool) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    serve_on(config, listener, open_browser).await
}

/// Serve the dashboard on a pre-bound listener, so the caller can read the
/// actual port first (useful when `port = 0` and the OS picks one).
pub async fn serve_on(
    config: Config,
    listener: tokio::net::TcpListener,
    open_browser: bool,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app_state = AppState::new(config)?;
    app_state.start_sync();
    let app = build_router(app_state);

    tracing::info!("depboard listening on http://localhost:{actual_port}");

    if open_browser {
        let url = format!("http://localhost:{actual_port}");
        if let Err(e) = open::that(&url) {
            tracing::warn!(error = %e, "could not open browser");
        }
    }

    axum::serve(listener, app).await?;
    Ok(())
}
