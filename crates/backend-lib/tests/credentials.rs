// ==========================
// tests/credentials.rs
// ==========================
use filedrop_lib::auth::{CredentialStore, SqliteCredentials};
use filedrop_lib::db::Db;
use filedrop_lib::error::AppError;
use tempfile::TempDir;

async fn open_store(temp_dir: &TempDir) -> (SqliteCredentials, Db) {
    let db = Db::connect(temp_dir.path().join("users.db")).await.unwrap();
    (SqliteCredentials::new(db.clone()), db)
}

async fn user_rows(db: &Db, username: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(username)
        .fetch_one(db.pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_register_then_authenticate() {
    let temp_dir = TempDir::new().unwrap();
    let (store, _db) = open_store(&temp_dir).await;

    let registered = store.register("alice", "wonderland").await.unwrap();
    assert_eq!(registered.username, "alice");
    assert_ne!(registered.hashed_password, "wonderland");

    let authenticated = store.authenticate("alice", "wonderland").await.unwrap();
    assert_eq!(authenticated, registered);
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_look_the_same() {
    let temp_dir = TempDir::new().unwrap();
    let (store, _db) = open_store(&temp_dir).await;
    store.register("alice", "wonderland").await.unwrap();

    let wrong_password = store.authenticate("alice", "looking-glass").await;
    assert!(matches!(wrong_password, Err(AppError::InvalidCredentials)));

    let unknown_user = store.authenticate("mallory", "wonderland").await;
    assert!(matches!(unknown_user, Err(AppError::InvalidCredentials)));
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let (store, db) = open_store(&temp_dir).await;

    store.register("alice", "first").await.unwrap();
    let second = store.register("alice", "second").await;
    assert!(matches!(second, Err(AppError::DuplicateUsername)));
    assert_eq!(user_rows(&db, "alice").await, 1);

    // the original password still works
    assert!(store.authenticate("alice", "first").await.is_ok());
    assert!(store.authenticate("alice", "second").await.is_err());
}

#[tokio::test]
async fn test_concurrent_duplicate_registration_creates_one_row() {
    let temp_dir = TempDir::new().unwrap();
    let (store, db) = open_store(&temp_dir).await;

    let (a, b) = tokio::join!(store.register("bob", "pw-a"), store.register("bob", "pw-b"));
    let outcomes = [a, b];

    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(AppError::DuplicateUsername))));
    assert_eq!(user_rows(&db, "bob").await, 1);
}

#[tokio::test]
async fn test_usernames_are_case_sensitive_and_distinct() {
    let temp_dir = TempDir::new().unwrap();
    let (store, _db) = open_store(&temp_dir).await;

    let lower = store.register("carol", "pw").await.unwrap();
    let upper = store.register("Carol", "pw").await.unwrap();
    assert_ne!(lower.id, upper.id);
}

#[tokio::test]
async fn test_empty_username_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let (store, _db) = open_store(&temp_dir).await;

    let result = store.register("", "pw").await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));
}

#[tokio::test]
async fn test_whitespace_only_username_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let (store, db) = open_store(&temp_dir).await;

    for username in ["   ", "\t", " \n "] {
        let result = store.register(username, "pw").await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))), "{username:?} should be rejected");
        assert_eq!(user_rows(&db, username).await, 0);
    }
}

#[tokio::test]
async fn test_find_by_username() {
    let temp_dir = TempDir::new().unwrap();
    let (store, _db) = open_store(&temp_dir).await;

    assert!(store.find_by_username("dave").await.unwrap().is_none());
    let dave = store.register("dave", "pw").await.unwrap();
    assert_eq!(store.find_by_username("dave").await.unwrap(), Some(dave));
}
