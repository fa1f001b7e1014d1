//! User metadata handlers

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use usermeta_core::MetaEntry;

#[derive(Debug, Deserialize)]
pub struct MetaQuery {
    key: Option<String>,
}

fn bad_query(_: QueryRejection) -> ApiError {
    ApiError::bad_request("error in parse request data")
}

/// `PUT /metas?age=..&gender=..`, runs under the per-parameter locks
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<StatusCode, ApiError> {
    let Query(params) = params.map_err(bad_query)?;

    state.metas.update(user.id(), &params).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// `GET /metas?key=..`
pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<MetaQuery>, QueryRejection>,
) -> Result<Json<Vec<MetaEntry>>, ApiError> {
    let Query(query) = query.map_err(bad_query)?;

    let metas = state.metas.get(user.id(), query.key.as_deref()).await?;

    Ok(Json(metas))
}
