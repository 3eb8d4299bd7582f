use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;

use crate::resolver::ResolveError;

// Define our custom error type
#[derive(Debug)]
pub enum AppError {
    Internal(anyhow::Error),
    Resolve(ResolveError),
    BadRequest(String),
}

// This implementation allows us to convert our AppError into a valid HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(e) | AppError::Resolve(ResolveError::Internal(e)) => {
                // Log the full error for debugging
                tracing::error!("Internal server error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
            AppError::Resolve(ResolveError::UpstreamUnavailable(detail)) => {
                tracing::warn!("Upstream unavailable: {}", detail);
                (StatusCode::BAD_GATEWAY, "Upstream service error".to_string())
            }
            AppError::Resolve(ResolveError::ExtractionFailed(detail)) => {
                tracing::info!("Extraction failed: {}", detail);
                (
                    StatusCode::BAD_REQUEST,
                    "Unable to fetch video. Check the URL.".to_string(),
                )
            }
            AppError::Resolve(ResolveError::NoDownloadLink) => (
                StatusCode::BAD_REQUEST,
                "No download link available".to_string(),
            ),
            AppError::BadRequest(e) => (StatusCode::BAD_REQUEST, e),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

// This allows us to use the `?` operator to automatically convert
// any error that implements `std::error::Error` into our `AppError::Internal`.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn each_failure_kind_has_its_own_status_class() {
        assert_eq!(status_of(AppError::BadRequest("Invalid URL".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(AppError::Resolve(ResolveError::UpstreamUnavailable("timeout".into()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(AppError::Resolve(ResolveError::ExtractionFailed("code -1".into()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Resolve(ResolveError::NoDownloadLink)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Resolve(ResolveError::Internal(anyhow::anyhow!("boom")))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(anyhow::anyhow!("lock poisoned").into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
