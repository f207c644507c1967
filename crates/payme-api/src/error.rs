//! Error types for payme-api

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use payme_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Invalid form upload: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Multipart(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(CoreError::Validation { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Core(CoreError::AssetNotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{}", self);
        } else {
            log::debug!("{}", self);
        }
        let body = match &self {
            ApiError::Core(e) => serde_json::to_string(&e.to_details()).unwrap_or_default(),
            other => serde_json::json!({ "error": other.to_string() }).to_string(),
        };
        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let e = ApiError::NotFound { resource: "x".to_string() };
        assert_eq!(e.status(), StatusCode::NOT_FOUND);

        let e = ApiError::from(CoreError::Validation {
            field: "bank".to_string(),
            message: "missing".to_string(),
        });
        assert_eq!(e.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let e = ApiError::from(CoreError::AssetIo {
            path: "style.css".to_string(),
            message: "denied".to_string(),
        });
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
