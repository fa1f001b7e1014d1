//! HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use usermeta_core::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    /// A lock on one of the request's resources is held elsewhere
    #[error("Too many requests")]
    Conflict,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Detail is logged, never sent
    #[error("Internal Server Error")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Conflict => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::Conflict => "too_many_requests",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl From<usermeta_core::Error> for ApiError {
    fn from(e: usermeta_core::Error) -> Self {
        match e {
            usermeta_core::Error::Unauthorized(_) => ApiError::Unauthorized,
            usermeta_core::Error::Conflict { .. } => ApiError::Conflict,
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!("Internal error: {}", detail);
        }

        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let unauthorized: ApiError = usermeta_core::Error::unauthorized("token expired").into();
        assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);

        let conflict: ApiError = usermeta_core::Error::Conflict {
            key: "gender:1".to_string(),
        }
        .into();
        assert_eq!(conflict.status(), StatusCode::TOO_MANY_REQUESTS);

        let infra: ApiError =
            usermeta_core::Error::Infrastructure(StoreError::Connection("refused".into())).into();
        assert_eq!(infra.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // Connection details stay out of the response body
        assert_eq!(infra.to_string(), "Internal Server Error");
    }
}
