//! Signup and login handlers

use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use tracing::{debug, info};
use usermeta_core::{Credentials, TokenResponse};

fn credentials(body: Result<Json<Credentials>, JsonRejection>) -> Result<Credentials, ApiError> {
    body.map(|Json(credentials)| credentials).map_err(|e| {
        debug!("Bad credentials body: {}", e);
        ApiError::bad_request("error in parse request data")
    })
}

pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let req = credentials(body)?;
    info!("Signup attempt for: {}", req.user_name);

    let token = state
        .auth_service
        .signup(&req.user_name, &req.password)
        .await?;

    Ok((StatusCode::CREATED, Json(TokenResponse::success(token))))
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let req = credentials(body)?;

    let token = state
        .auth_service
        .login(&req.user_name, &req.password)
        .await?;

    info!("Login successful for: {}", req.user_name);
    Ok(Json(TokenResponse::success(token)))
}
