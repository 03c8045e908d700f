//! `UserService` against a live Postgres.
//!
//! Run with `DATABASE_URL` set and `--ignored`; each test gets a fresh
//! database with the crate's migrations applied.

use pitchhub_api::services::NewUser;
use pitchhub_api::{ApiError, UserService, UserStore};
use pitchhub_models::UserType;
use sqlx::PgPool;

fn new_user(email: &str) -> NewUser {
    NewUser {
        name: "Ada".into(),
        email: email.into(),
        password_hash: "$2b$10$abcdefghijklmnopqrstuv".into(),
        user_type: UserType::Talent,
        segment: Some("music".into()),
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_create_then_find(pool: PgPool) {
    let users = UserService::new(pool);

    let created = users.create(new_user("ada@example.com")).await.unwrap();
    assert_eq!(created.user_type, UserType::Talent);
    assert_eq!(created.segment.as_deref(), Some("music"));

    let found = users
        .find_by_email("ada@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, created.id);
    assert_eq!(found.password_hash, "$2b$10$abcdefghijklmnopqrstuv");
    assert!(users.find_by_email("nobody@example.com").await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_duplicate_email_is_conflict(pool: PgPool) {
    let users = UserService::new(pool);

    users.create(new_user("ada@example.com")).await.unwrap();
    let err = users.create(new_user("ada@example.com")).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_uploaders_by_ids(pool: PgPool) {
    let users = UserService::new(pool);

    let ada = users.create(new_user("ada@example.com")).await.unwrap();
    let found = users.uploaders_by_ids(&[ada.id, 999_999]).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[&ada.id].email, "ada@example.com");
    assert!(users.uploaders_by_ids(&[]).await.unwrap().is_empty());

    users.ping().await.unwrap();
}
