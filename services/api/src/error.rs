use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mlsync_common::error::MlsError;

pub struct ApiError(pub MlsError);

impl From<MlsError> for ApiError {
    fn from(err: MlsError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            MlsError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            MlsError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            other => {
                tracing::error!(error = %other, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
