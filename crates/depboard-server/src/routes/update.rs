use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use depboard_core::mutation::MutationOutcome;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBody {
    pub issue_number: u64,
    pub field: String,
    pub value: String,
}

/// POST /api/update: write one field, then wake the sync loop so every open
/// page picks the change up on its next refresh.
pub async fn update_field(
    State(app): State<AppState>,
    payload: Result<Json<UpdateBody>, JsonRejection>,
) -> Result<Json<MutationOutcome>, AppError> {
    let Json(body) = payload?;
    app.gateway
        .apply(body.issue_number, &body.field, &body.value)
        .await?;
    app.hub.trigger();
    Ok(Json(MutationOutcome::success()))
}
