use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing data")]
    MissingData,
    #[error("malformed payload")]
    MalformedPayload,
    #[error("unknown survey")]
    InvalidSurvey,
    #[error("unauthorized")]
    Unauthorized,
    #[error("server error")]
    Storage(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingData | AppError::MalformedPayload | AppError::InvalidSurvey => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Storage(e) = &self {
            error!("Storage failure: {:#}", e);
        }

        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_hide_internals() {
        let err = AppError::from(anyhow::anyhow!("disk I/O error at /var/data/secret.db"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "server error");
    }

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(AppError::InvalidSurvey.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::MissingData.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }
}
