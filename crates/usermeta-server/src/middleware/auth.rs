//! Bearer token authentication

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

/// Verify the `Authorization` header and attach the caller to the request.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or(ApiError::Unauthorized)?;

    let principal = state.tokens.verify(token).map_err(|e| {
        debug!("Rejected token: {}", e);
        ApiError::Unauthorized
    })?;

    request.extensions_mut().insert(AuthUser { principal });

    Ok(next.run(request).await)
}

/// Token from the `Authorization` header, with or without a `Bearer ` prefix
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}
