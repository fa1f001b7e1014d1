//! Bearer token issuance and verification
//!
//! Tokens are HS256 JWTs signed with a shared secret. Verification is purely
//! computational: nothing is stored server side, and the only shared state is
//! the read-only key material held by [`TokenService`].

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use usermeta_types::Principal;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // principal
    iat: i64,    // issued at
    exp: i64,    // expiration time
    exp_us: i64, // expiration time, microseconds
    jti: String, // token id
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validity: Duration,
}

impl TokenService {
    pub fn new(secret: &str, validity: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validity,
        }
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Issue a token for `principal`, valid from now for the configured duration.
    pub fn issue(&self, principal: Principal) -> Result<String> {
        self.issue_at(principal, Utc::now())
    }

    pub fn issue_at(&self, principal: Principal, now: DateTime<Utc>) -> Result<String> {
        let validity = chrono::Duration::from_std(self.validity)
            .map_err(|e| Error::Token(format!("invalid token validity: {}", e)))?;

        let expires_at = now
            .checked_add_signed(validity)
            .ok_or_else(|| Error::Token("token validity out of range".to_string()))?;

        let claims = Claims {
            sub: principal.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            exp_us: expires_at.timestamp_micros(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Token(format!("generating token failed: {}", e)))
    }

    /// Verify `token` and return the principal it was issued for.
    pub fn verify(&self, token: &str) -> Result<Principal> {
        self.verify_at(token, Utc::now())
    }

    /// Verify `token` as of `now`.
    ///
    /// A token is accepted while `now` is strictly before its expiry instant,
    /// compared to the microsecond. `exp` is kept in whole seconds for other
    /// JWT readers.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Principal> {
        if token.is_empty() {
            return Err(Error::unauthorized("missing token"));
        }

        // Expiry is checked below against the caller's clock
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| Error::unauthorized(format!("invalid token: {}", e)))?;
        let claims = token_data.claims;

        if claims.exp_us <= now.timestamp_micros() {
            return Err(Error::unauthorized("token expired"));
        }

        claims
            .sub
            .parse::<Principal>()
            .map_err(|e| Error::unauthorized(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn service() -> TokenService {
        TokenService::new("secret", Duration::from_secs(60))
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_round_trip_within_validity() {
        let tokens = service();
        let issued = at(1_700_000_000);
        let token = tokens.issue_at(Principal::new(1), issued).unwrap();

        assert_eq!(tokens.verify_at(&token, issued).unwrap(), Principal::new(1));
        assert_eq!(
            tokens.verify_at(&token, at(1_700_000_059)).unwrap(),
            Principal::new(1)
        );
    }

    #[test]
    fn test_rejected_at_and_after_expiry() {
        let tokens = service();
        let token = tokens.issue_at(Principal::new(1), at(1_700_000_000)).unwrap();

        assert!(matches!(
            tokens.verify_at(&token, at(1_700_000_060)),
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            tokens.verify_at(&token, at(1_700_000_600)),
            Err(Error::Unauthorized(_))
        ));
    }

    #[test]
    fn test_sub_second_issue_keeps_full_validity() {
        let tokens = service();
        let issued = at(1_700_000_000) + chrono::Duration::milliseconds(900);
        let token = tokens.issue_at(Principal::new(1), issued).unwrap();

        let just_before = issued + chrono::Duration::milliseconds(59_999);
        assert_eq!(
            tokens.verify_at(&token, just_before).unwrap(),
            Principal::new(1)
        );

        let expiry = issued + chrono::Duration::seconds(60);
        assert!(matches!(
            tokens.verify_at(&token, expiry),
            Err(Error::Unauthorized(_))
        ));
    }

    #[test]
    fn test_out_of_range_validity_is_an_error() {
        let tokens = TokenService::new("secret", Duration::from_secs(1_000_000_000_000_000));
        assert!(matches!(
            tokens.issue_at(Principal::new(1), at(1_700_000_000)),
            Err(Error::Token(_))
        ));

        let tokens = TokenService::new("secret", Duration::from_secs(u64::MAX));
        assert!(matches!(
            tokens.issue(Principal::new(1)),
            Err(Error::Token(_))
        ));
    }

    #[test]
    fn test_issue_and_verify_with_system_clock() {
        let tokens = service();
        let token = tokens.issue(Principal::new(99)).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), Principal::new(99));
    }

    #[test]
    fn test_tokens_differ_per_issuance() {
        let tokens = service();
        let first = tokens.issue_at(Principal::new(1), at(1_700_000_000)).unwrap();
        let second = tokens.issue_at(Principal::new(1), at(1_700_000_001)).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = service().issue(Principal::new(1)).unwrap();
        let other = TokenService::new("another-secret", Duration::from_secs(60));
        assert!(matches!(other.verify(&token), Err(Error::Unauthorized(_))));
    }

    #[test]
    fn test_garbage_and_empty_rejected() {
        let tokens = service();
        assert!(matches!(tokens.verify(""), Err(Error::Unauthorized(_))));
        assert!(matches!(
            tokens.verify("bevyb4v7346vb74bvycbc6734g674bc"),
            Err(Error::Unauthorized(_))
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let tokens = service();
        let token = tokens.issue(Principal::new(1)).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = service().issue(Principal::new(2)).unwrap();
        let forged_payload = forged.split('.').nth(1).unwrap().to_string();
        parts[1] = &forged_payload;
        let tampered = parts.join(".");

        // Payload swapped between two tokens breaks the first signature
        assert!(matches!(
            tokens.verify(&tampered),
            Err(Error::Unauthorized(_))
        ));
    }

    #[test]
    fn test_non_numeric_subject_rejected() {
        let claims = Claims {
            sub: "admin".to_string(),
            iat: 0,
            exp: i64::MAX / 2,
            exp_us: i64::MAX / 2,
            jti: "x".to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(matches!(
            service().verify(&token),
            Err(Error::Unauthorized(_))
        ));
    }
}
