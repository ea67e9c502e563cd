//! User registration and password authentication.
use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};
use filedrop_common::User;
use crate::db::Db;
use crate::error::AppError;
use super::password::{hash_password, verify_password};

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create a user. Fails with `DuplicateUsername` if the name is taken.
    async fn register(&self, username: &str, password: &str) -> Result<User, AppError>;
    /// Check a password. Unknown users and wrong passwords both fail with
    /// `InvalidCredentials`.
    async fn authenticate(&self, username: &str, password: &str) -> Result<User, AppError>;
    /// Look up a user by exact username
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
}

/// Credential store backed by the `users` table
#[derive(Clone)]
pub struct SqliteCredentials {
    db: Db,
}

impl SqliteCredentials {
    /// Credential store over the `users` table of `db`
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

fn user_from_row(row: &SqliteRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        hashed_password: row.try_get("hashed_password")?,
    })
}

#[async_trait]
impl CredentialStore for SqliteCredentials {
    async fn register(&self, username: &str, password: &str) -> Result<User, AppError> {
        if username.trim().is_empty() {
            return Err(AppError::InvalidInput("username must not be empty".to_string()));
        }
        if self.find_by_username(username).await?.is_some() {
            return Err(AppError::DuplicateUsername);
        }

        // scrypt is CPU-bound, run it off the async workers
        let plain = password.to_string();
        let hashed_password = tokio::task::spawn_blocking(move || hash_password(&plain))
            .await?
            .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?;

        let inserted = sqlx::query("INSERT INTO users (username, hashed_password) VALUES (?, ?)")
            .bind(username)
            .bind(&hashed_password)
            .execute(self.db.pool())
            .await;

        match inserted {
            Ok(done) => {
                tracing::info!(username, "registered user");
                metrics::counter!(crate::telemetry::USER_REGISTERED).increment(1);
                Ok(User {
                    id: done.last_insert_rowid(),
                    username: username.to_string(),
                    hashed_password,
                })
            },
            // lost a race with a concurrent registration of the same name
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::DuplicateUsername)
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<User, AppError> {
        let Some(user) = self.find_by_username(username).await? else {
            tracing::info!(username, "login failed: unknown user");
            metrics::counter!(crate::telemetry::LOGIN_FAILED).increment(1);
            return Err(AppError::InvalidCredentials);
        };

        let hash = user.hashed_password.clone();
        let plain = password.to_string();
        let verified = tokio::task::spawn_blocking(move || verify_password(&hash, &plain)).await?;

        if verified {
            metrics::counter!(crate::telemetry::LOGIN_SUCCEEDED).increment(1);
            Ok(user)
        } else {
            tracing::info!(username, "login failed: wrong password");
            metrics::counter!(crate::telemetry::LOGIN_FAILED).increment(1);
            Err(AppError::InvalidCredentials)
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query("SELECT id, username, hashed_password FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }
}
