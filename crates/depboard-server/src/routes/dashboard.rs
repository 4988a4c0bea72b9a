use axum::extract::State;
use axum::Json;
use depboard_core::aggregate::Dashboard;

use crate::state::AppState;

/// GET /api/dashboard: the current dashboard as JSON.
pub async fn get_dashboard(State(app): State<AppState>) -> Json<Dashboard> {
    Json(app.hub.current().as_ref().clone())
}
