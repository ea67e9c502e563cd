// ============================
// filedrop-lib/src/lib.rs
// ============================
//! Core functionality for the `filedrop` authenticated file store.

pub mod config;
pub mod db;
pub mod storage;
pub mod auth;
pub mod files;
pub mod error;
pub mod pages;
pub mod routes;
pub mod telemetry;

use std::sync::Arc;
use crate::auth::{CredentialStore, SqliteCredentials, TokenService};
use crate::config::Settings;
use crate::db::Db;
use crate::files::FileRegistry;
use crate::storage::{BlobStore, FlatFileStorage};

/// Application state shared across all handlers
pub struct AppState<S> {
    /// Registration and password checks
    pub credentials: Arc<dyn CredentialStore>,
    /// Session token signing and verification
    pub tokens: TokenService,
    /// Ownership records and blobs
    pub files: FileRegistry<S>,
    /// Settings the server was started with
    pub settings: Arc<Settings>,
}

impl<S: BlobStore> AppState<S> {
    /// Create a new application state
    pub fn new(db: Db, storage: S, settings: Settings) -> Self {
        let tokens = TokenService::new(&signing_secret(&settings));
        let credentials = Arc::new(SqliteCredentials::new(db.clone()));
        let files = FileRegistry::new(db, storage);

        Self {
            credentials,
            tokens,
            files,
            settings: Arc::new(settings),
        }
    }
}

impl AppState<FlatFileStorage> {
    /// Open the database and blob directory under `settings.data_dir`
    pub async fn open(settings: Settings) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&settings.data_dir).await?;
        let db = Db::connect(settings.database_path()).await?;
        let storage = FlatFileStorage::new(settings.uploads_dir())?;
        Ok(Self::new(db, storage, settings))
    }
}

fn signing_secret(settings: &Settings) -> Vec<u8> {
    match &settings.secret_key {
        Some(key) => key.as_bytes().to_vec(),
        None => {
            tracing::warn!("no secret_key configured; using a random key, sessions end when the process exits");
            rand::random::<[u8; 32]>().to_vec()
        },
    }
}
