//! Test utilities shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use axum::body::Bytes;
use filedrop_lib::{config::Settings, error::AppError, storage::FlatFileStorage, AppState};
use futures_util::{stream, Stream};
use tempfile::TempDir;

pub const TEST_SECRET: &str = "test-secret-test-secret-test-secret";

/// Sets up a test environment rooted in a fresh temporary directory.
///
/// Keep the returned `TempDir` in scope for the duration of the test.
pub async fn setup_test_env() -> (Arc<AppState<FlatFileStorage>>, TempDir) {
    setup_test_env_with(|_| {}).await
}

/// Like [`setup_test_env`], with a hook to adjust settings first
pub async fn setup_test_env_with(
    configure: impl FnOnce(&mut Settings),
) -> (Arc<AppState<FlatFileStorage>>, TempDir) {
    let temp_dir = TempDir::new().unwrap();

    let mut settings = Settings {
        data_dir: temp_dir.path().to_path_buf(),
        secret_key: Some(TEST_SECRET.to_string()),
        ..Settings::default()
    };
    configure(&mut settings);

    let state = Arc::new(
        AppState::open(settings)
            .await
            .expect("Failed to create AppState for test"),
    );

    (state, temp_dir)
}

/// A single-chunk upload body
pub fn body_of(bytes: &[u8]) -> impl Stream<Item = Result<Bytes, AppError>> + Send + 'static {
    stream::iter(vec![Ok(Bytes::copy_from_slice(bytes))])
}

/// Number of entries left in an owner's blob directory, staging files included
pub fn blob_dir_entries(state: &AppState<FlatFileStorage>, owner_id: i64) -> usize {
    match std::fs::read_dir(state.files.blobs().root().join(owner_id.to_string())) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}
