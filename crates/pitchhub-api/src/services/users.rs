//! Account storage in the relational database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;

use pitchhub_models::{Uploader, UserPublic, UserType};

use crate::error::{ApiError, ApiResult};

/// Row of the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub user_type: String,
    pub segment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Public view of the account. Rows with an unknown type are rejected.
    pub fn to_public(&self) -> ApiResult<UserPublic> {
        let user_type = UserType::parse(&self.user_type).ok_or_else(|| {
            ApiError::internal(format!(
                "user {} has unknown type '{}'",
                self.id, self.user_type
            ))
        })?;

        Ok(UserPublic {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            user_type,
            segment: self.segment.clone(),
        })
    }
}

/// Validated input for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub user_type: UserType,
    pub segment: Option<String>,
}

#[derive(sqlx::FromRow)]
struct UploaderRow {
    id: i64,
    name: String,
    email: String,
}

/// Account persistence used by the handlers.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> ApiResult<Option<UserRecord>>;

    /// Insert an account. A duplicate email yields `Conflict`.
    async fn create(&self, new_user: NewUser) -> ApiResult<UserPublic>;

    /// Uploader details for the given ids. Ids with no row are absent.
    async fn uploaders_by_ids(&self, ids: &[i64]) -> ApiResult<HashMap<i64, Uploader>>;

    /// Round-trip a trivial query.
    async fn ping(&self) -> ApiResult<()>;
}

/// Account queries over a Postgres pool.
#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for UserService {
    async fn find_by_email(&self, email: &str) -> ApiResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT id, name, email, password_hash, user_type, segment, created_at \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> ApiResult<UserPublic> {
        let user = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (name, email, password_hash, user_type, segment) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, name, email, password_hash, user_type, segment, created_at",
        )
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.user_type.as_str())
        .bind(&new_user.segment)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return ApiError::conflict("Email already registered.");
                }
            }
            ApiError::from(e)
        })?;

        info!(user_id = user.id, user_type = %new_user.user_type, "Registered user");
        user.to_public()
    }

    async fn uploaders_by_ids(&self, ids: &[i64]) -> ApiResult<HashMap<i64, Uploader>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, UploaderRow>(
            "SELECT id, name, email FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                (
                    r.id,
                    Uploader {
                        id: r.id.to_string(),
                        name: r.name,
                        email: r.email,
                    },
                )
            })
            .collect())
    }

    async fn ping(&self) -> ApiResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user_type: &str) -> UserRecord {
        UserRecord {
            id: 3,
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$2b$10$x".into(),
            user_type: user_type.into(),
            segment: Some("music".into()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_to_public_hides_hash() {
        let public = record("talent").to_public().unwrap();
        assert_eq!(public.id, 3);
        assert_eq!(public.user_type, UserType::Talent);
        let json = serde_json::to_value(&public).unwrap();
        assert!(json.get("passwordHash").is_none());
    }

    #[test]
    fn test_to_public_rejects_unknown_type() {
        assert!(record("admin").to_public().is_err());
    }
}
