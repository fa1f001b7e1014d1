//! User and metadata types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub user_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata dimensions a user can set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetaKey {
    Age,
    Gender,
}

impl MetaKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetaKey::Age => "age",
            MetaKey::Gender => "gender",
        }
    }
}

impl fmt::Display for MetaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid key")]
pub struct UnknownMetaKey;

impl FromStr for MetaKey {
    type Err = UnknownMetaKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "age" => Ok(MetaKey::Age),
            "gender" => Ok(MetaKey::Gender),
            _ => Err(UnknownMetaKey),
        }
    }
}

/// Accepted values for the gender dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[serde(rename = "none")]
    Undisclosed,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Undisclosed => "none",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid gender")]
pub struct UnknownGender;

impl FromStr for Gender {
    type Err = UnknownGender;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "none" => Ok(Gender::Undisclosed),
            _ => Err(UnknownGender),
        }
    }
}

/// One stored metadata row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMeta {
    pub user_id: i64,
    pub key: MetaKey,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Signup and login request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub user_name: String,
    pub password: String,
}

/// Signup and login response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub status: String,
    pub token: String,
}

impl TokenResponse {
    pub fn success(token: String) -> Self {
        Self {
            status: "success".to_string(),
            token,
        }
    }
}

/// Metadata entry as returned by the read endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaEntry {
    pub key: String,
    pub value: String,
}

impl From<UserMeta> for MetaEntry {
    fn from(meta: UserMeta) -> Self {
        Self {
            key: meta.key.to_string(),
            value: meta.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_key_parse() {
        assert_eq!("age".parse::<MetaKey>(), Ok(MetaKey::Age));
        assert_eq!("gender".parse::<MetaKey>(), Ok(MetaKey::Gender));
        assert_eq!("height".parse::<MetaKey>(), Err(UnknownMetaKey));
    }

    #[test]
    fn test_gender_parse() {
        assert_eq!("none".parse::<Gender>(), Ok(Gender::Undisclosed));
        assert_eq!(Gender::Undisclosed.as_str(), "none");
        assert!("other".parse::<Gender>().is_err());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let now = Utc::now();
        let user = User {
            id: 1,
            user_name: "someone-1".to_string(),
            password_hash: "secret-hash".to_string(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
