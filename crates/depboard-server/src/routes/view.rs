use axum::extract::State;
use axum::response::Html;

use crate::error::AppError;
use crate::state::AppState;

/// GET /: the full live page.
pub async fn index(State(app): State<AppState>) -> Result<Html<String>, AppError> {
    let dashboard = app.hub.current();
    let html = app
        .renderer
        .page(&dashboard, &app.config, chrono::Utc::now())?;
    Ok(Html(html))
}
