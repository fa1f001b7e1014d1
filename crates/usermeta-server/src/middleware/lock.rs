//! Per-request advisory locks
//!
//! The lock dimensions of a request are its query parameter names, so
//! `PUT /metas?gender=male` holds `gender:<principal>` while it runs.

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::AppState;
use axum::{
    extract::{Query, Request, State},
    http::Uri,
    middleware::Next,
    response::Response,
};

/// Run the rest of the stack while holding a lock on each query parameter name.
///
/// Must sit inside `require_auth`.
pub async fn lock_dimensions(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = request
        .extensions()
        .get::<AuthUser>()
        .map(|user| user.principal)
        .ok_or(ApiError::Unauthorized)?;

    let dimensions = query_dimensions(request.uri())?;

    let response = state
        .locks
        .guard(principal, dimensions, || next.run(request))
        .await?;

    Ok(response)
}

/// Query parameter names in the order they appear
pub fn query_dimensions(uri: &Uri) -> Result<Vec<String>, ApiError> {
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map_err(|_| ApiError::bad_request("error in parse request data"))?;

    Ok(pairs.into_iter().map(|(name, _)| name).collect())
}
