//! Signup and login

use crate::error::ApiError;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use regex::Regex;
use std::sync::Arc;
use tracing::info;
use usermeta_core::{Principal, TokenService, UserStore};

static USER_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]+(?:-[a-zA-Z0-9]+)*$").expect("valid user name pattern"));

const INVALID_CREDENTIALS: &str = "invalid username or password";

pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, tokens: Arc<TokenService>) -> Self {
        Self { users, tokens }
    }

    /// Create a user and return a fresh token for it
    pub async fn signup(&self, user_name: &str, password: &str) -> Result<String, ApiError> {
        validate_user_name(user_name)?;
        if password.is_empty() {
            return Err(ApiError::bad_request("password is required"));
        }

        if self.users.find_user_by_name(user_name).await?.is_some() {
            return Err(ApiError::bad_request("username is already taken"));
        }

        let password_hash = hash_password(password)?;
        let user = self.users.create_user(user_name, &password_hash).await?;
        info!(user_id = user.id, "User signed up");

        Ok(self.tokens.issue(Principal::new(user.id))?)
    }

    /// Check credentials and return a fresh token
    pub async fn login(&self, user_name: &str, password: &str) -> Result<String, ApiError> {
        let user = self
            .users
            .find_user_by_name(user_name)
            .await?
            .ok_or_else(|| ApiError::bad_request(INVALID_CREDENTIALS))?;

        if !verify_password(&user.password_hash, password) {
            return Err(ApiError::bad_request(INVALID_CREDENTIALS));
        }

        Ok(self.tokens.issue(Principal::new(user.id))?)
    }
}

/// 8 to 39 characters, alphanumeric groups joined by single hyphens
pub fn validate_user_name(user_name: &str) -> Result<(), ApiError> {
    let length_ok = user_name.len() > 7 && user_name.len() < 40;
    if !length_ok || !USER_NAME_PATTERN.is_match(user_name) {
        return Err(ApiError::bad_request("username is invalid"));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password_hash: &str, candidate: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(candidate.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryUserStore;
    use std::time::Duration;

    fn service() -> (Arc<TokenService>, AuthService) {
        let tokens = Arc::new(TokenService::new("secret", Duration::from_secs(60)));
        let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
        (tokens.clone(), AuthService::new(users, tokens))
    }

    #[test]
    fn test_user_name_rules() {
        assert!(validate_user_name("someone-1").is_ok());
        assert!(validate_user_name("abcdefgh").is_ok());
        assert!(validate_user_name("short").is_err());
        assert!(validate_user_name("double--hyphen").is_err());
        assert!(validate_user_name("-leading-hyphen").is_err());
        assert!(validate_user_name("has space in").is_err());
        assert!(validate_user_name(&"a".repeat(40)).is_err());
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("Passw0rd!").unwrap();
        assert!(verify_password(&hash, "Passw0rd!"));
        assert!(!verify_password(&hash, "passw0rd!"));
        assert!(!verify_password("not-a-hash", "Passw0rd!"));
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let (tokens, auth) = service();

        let token = auth.signup("someone-1", "Passw0rd!").await.unwrap();
        let principal = tokens.verify(&token).unwrap();

        let again = auth.login("someone-1", "Passw0rd!").await.unwrap();
        assert_eq!(tokens.verify(&again).unwrap(), principal);
    }

    #[tokio::test]
    async fn test_duplicate_signup_rejected() {
        let (_, auth) = service();
        auth.signup("someone-1", "Passw0rd!").await.unwrap();

        let err = auth.signup("someone-1", "Other0ne!").await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "username is already taken"));
    }

    #[tokio::test]
    async fn test_bad_login() {
        let (_, auth) = service();
        auth.signup("someone-1", "Passw0rd!").await.unwrap();

        assert!(matches!(
            auth.login("someone-1", "wrong").await,
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            auth.login("nobody-at-all", "Passw0rd!").await,
            Err(ApiError::BadRequest(_))
        ));
    }
}
