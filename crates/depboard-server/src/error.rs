use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use depboard_core::error::DashError;

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses. Bodies are always
/// `{"ok": false, "error": "..."}`.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        if let Some(rejection) = self.0.downcast_ref::<JsonRejection>() {
            return rejection.status();
        }
        match self.0.downcast_ref::<DashError>() {
            Some(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            Some(e) if e.is_upstream() => StatusCode::BAD_GATEWAY,
            Some(DashError::NotInitialized(_)) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self.0, "request failed");
        }
        let body = serde_json::json!({ "ok": false, "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn unknown_value_maps_to_400() {
        let err = AppError(DashError::UnknownValue("P9".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_field_maps_to_400() {
        let err = AppError(DashError::UnknownField("milestone".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn issue_not_in_project_maps_to_400() {
        let err = AppError(DashError::IssueNotInProject(42).into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn tracker_errors_map_to_502() {
        let api = AppError(
            DashError::Api {
                status: 401,
                message: "Bad credentials".into(),
            }
            .into(),
        );
        assert_eq!(api.into_response().status(), StatusCode::BAD_GATEWAY);

        let gql = AppError(DashError::GraphQl(vec!["Could not resolve".into()]).into());
        assert_eq!(gql.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn invalid_config_maps_to_500() {
        let err = AppError(DashError::InvalidConfig("project.id is not set".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn non_dash_error_maps_to_500() {
        let err = AppError(anyhow::anyhow!("something unexpected"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn response_body_is_json() {
        let err = AppError(DashError::UnknownValue("P9".into()).into());
        let response = err.into_response();
        let ct = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .expect("should have content-type");
        assert!(ct.to_str().unwrap().contains("application/json"));
    }
}
