//! Auth extractor for protected routes

use crate::error::ApiError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use usermeta_core::Principal;

/// Authenticated caller, attached to the request by the auth middleware
#[derive(Clone, Copy, Debug)]
pub struct AuthUser {
    pub principal: Principal,
}

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.principal.id()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or(ApiError::Unauthorized)
    }
}
