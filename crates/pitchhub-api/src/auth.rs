//! Password hashing, session tokens and the authenticated-user extractor.

use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use pitchhub_models::{UserPublic, UserType};

use crate::config::JwtConfig;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// bcrypt work factor for new password hashes.
pub const BCRYPT_COST: u32 = 10;

/// Session token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub user_type: UserType,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signing and verification keys derived from the shared secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry: Duration,
}

impl JwtKeys {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            expiry: config.expiry,
        }
    }

    /// Sign a session token for `user`.
    pub fn issue(&self, user: &UserPublic) -> ApiResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: user.id,
            email: user.email.clone(),
            user_type: user.user_type,
            iat: now,
            exp: now + self.expiry.as_secs() as i64,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::internal(format!("Failed to sign token: {}", e)))
    }

    /// Verify signature and expiry.
    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Token rejected");
                ApiError::forbidden("Invalid or expired token")
            })
    }
}

/// True if `hash` is in modular-crypt bcrypt form.
pub fn is_bcrypt_hash(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2y$"].iter().any(|p| hash.starts_with(p))
}

/// Hash a password off the async runtime.
pub async fn hash_password(password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|e| ApiError::internal(format!("Hash task failed: {}", e)))?
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored bcrypt hash.
pub async fn verify_password(password: String, hash: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ApiError::internal(format!("Verify task failed: {}", e)))?
        .map_err(|e| ApiError::internal(format!("Failed to verify password: {}", e)))
}

/// Authenticated caller, taken from a `Bearer` token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub user_type: UserType,
}

impl AuthUser {
    /// Id in the string form used by document-store records.
    pub fn id_string(&self) -> String {
        self.id.to_string()
    }

    pub fn is_talent(&self) -> bool {
        self.user_type == UserType::Talent
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.user_id,
            email: claims.email,
            user_type: claims.user_type,
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Access token required"))?;

        let claims = state.jwt.verify(token)?;
        Ok(AuthUser::from(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(secret: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig::new(secret))
    }

    fn user() -> UserPublic {
        UserPublic {
            id: 42,
            name: "Ada".into(),
            email: "ada@example.com".into(),
            user_type: UserType::Talent,
            segment: None,
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = keys("secret");
        let token = keys.issue(&user()).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.user_type, UserType::Talent);
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn test_claims_use_camel_case() {
        let claims = Claims {
            user_id: 1,
            email: "a@b.c".into(),
            user_type: UserType::Recruiter,
            iat: 0,
            exp: 1,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["userId"], 1);
        assert_eq!(json["userType"], "recruiter");
    }

    #[test]
    fn test_wrong_secret_is_forbidden() {
        let token = keys("one").issue(&user()).unwrap();
        let err = keys("two").verify(&token).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn test_expired_token_is_forbidden() {
        let keys = keys("secret");
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: 1,
            email: "a@b.c".into(),
            user_type: UserType::Talent,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert!(matches!(keys.verify(&token), Err(ApiError::Forbidden(_))));
    }

    #[test]
    fn test_is_bcrypt_hash() {
        assert!(is_bcrypt_hash("$2b$10$abcdefghijklmnopqrstuv"));
        assert!(is_bcrypt_hash("$2a$10$abcdefghijklmnopqrstuv"));
        assert!(!is_bcrypt_hash("plaintext"));
        assert!(!is_bcrypt_hash("5f4dcc3b5aa765d61d8327deb882cf99"));
    }

    #[tokio::test]
    async fn test_hash_and_verify_password() {
        let hash = hash_password("hunter2".into()).await.unwrap();
        assert!(is_bcrypt_hash(&hash));
        assert!(verify_password("hunter2".into(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong".into(), hash).await.unwrap());
    }
}
