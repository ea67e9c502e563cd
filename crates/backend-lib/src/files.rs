// ============================
// filedrop-lib/src/files.rs
// ============================
//! File registry: ownership records plus their blobs.
//!
//! A user can only see, read or delete records whose `owner_id` is their own
//! id. Lookups are always keyed by `(owner_id, filename)`, so a file owned by
//! someone else is indistinguishable from one that does not exist.
use std::path::{Component, Path};
use axum::body::Bytes;
use futures_util::Stream;
use sqlx::{sqlite::SqliteRow, Row};
use tokio::io::AsyncReadExt;
use filedrop_common::{FileRecord, RecordId, User};
use crate::db::Db;
use crate::error::AppError;
use crate::storage::{BlobReader, BlobStore, StagedBlob};
use crate::telemetry;

/// Longest accepted filename, in bytes
pub const MAX_FILENAME_LEN: usize = 255;

/// Accept only a single, plain path component.
pub fn validate_filename(filename: &str) -> Result<(), AppError> {
    let invalid = || AppError::InvalidFilename(filename.to_string());

    if filename.is_empty() || filename.len() > MAX_FILENAME_LEN {
        return Err(invalid());
    }
    if filename.contains(['/', '\\', '\0']) {
        return Err(invalid());
    }

    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == filename => Ok(()),
        _ => Err(invalid()),
    }
}

fn record_from_row(row: &SqliteRow) -> Result<FileRecord, sqlx::Error> {
    Ok(FileRecord {
        id: row.try_get("id")?,
        filename: row.try_get("filename")?,
        owner_id: row.try_get("owner_id")?,
    })
}

/// File bytes staged for an owner but not yet recorded
#[derive(Debug)]
pub struct PendingUpload {
    filename: String,
    blob: StagedBlob,
}

impl PendingUpload {
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

/// Maps uploaded files to their owners and enforces owner-only access
#[derive(Clone)]
pub struct FileRegistry<S> {
    db: Db,
    blobs: S,
}

impl<S: BlobStore> FileRegistry<S> {
    pub fn new(db: Db, blobs: S) -> Self {
        Self { db, blobs }
    }

    pub fn blobs(&self) -> &S {
        &self.blobs
    }

    /// Validate `filename` and write `content` to staging for `owner`.
    ///
    /// Nothing is visible until the upload goes through [`Self::commit`].
    pub async fn stage<St>(&self, owner: &User, filename: &str, content: St) -> Result<PendingUpload, AppError>
    where
        St: Stream<Item = Result<Bytes, AppError>> + Send,
    {
        validate_filename(filename)?;
        let blob = self.blobs.stage(owner.id, content).await?;
        Ok(PendingUpload {
            filename: filename.to_string(),
            blob,
        })
    }

    /// Record and publish staged uploads in one transaction.
    ///
    /// Uploading a name the owner already has replaces the bytes and keeps the
    /// existing record. On failure no record is written and staged bytes are
    /// discarded.
    pub async fn commit(&self, owner: &User, uploads: Vec<PendingUpload>) -> Result<Vec<FileRecord>, AppError> {
        let recorded = async {
            let mut tx = self.db.pool().begin().await?;
            let mut records = Vec::with_capacity(uploads.len());

            for upload in &uploads {
                let id: RecordId = sqlx::query_scalar(
                    "INSERT INTO files (filename, owner_id) VALUES (?, ?)
                     ON CONFLICT (owner_id, filename) DO UPDATE SET filename = excluded.filename
                     RETURNING id",
                )
                .bind(&upload.filename)
                .bind(owner.id)
                .fetch_one(&mut *tx)
                .await?;

                records.push(FileRecord {
                    id,
                    filename: upload.filename.clone(),
                    owner_id: owner.id,
                });
            }

            for upload in &uploads {
                self.blobs.promote(&upload.blob, owner.id, &upload.filename).await?;
            }
            tx.commit().await?;
            Ok::<_, AppError>(records)
        }
        .await;

        let sizes: Vec<u64> = uploads.iter().map(|u| u.blob.size).collect();
        // no-op for promoted blobs
        self.abandon(uploads).await;

        let records = recorded?;
        for (record, size) in records.iter().zip(sizes) {
            tracing::info!(owner = %owner.username, filename = %record.filename, size, "stored file");
        }
        metrics::counter!(telemetry::FILE_UPLOADED).increment(records.len() as u64);
        Ok(records)
    }

    /// Discard staged uploads that will not be committed
    pub async fn abandon(&self, uploads: Vec<PendingUpload>) {
        for upload in uploads {
            self.blobs.discard(upload.blob).await;
        }
    }

    /// Stage and commit a single file
    pub async fn store<St>(&self, owner: &User, filename: &str, content: St) -> Result<FileRecord, AppError>
    where
        St: Stream<Item = Result<Bytes, AppError>> + Send,
    {
        let upload = self.stage(owner, filename, content).await?;
        self.commit(owner, vec![upload])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("commit returned no record".to_string()))
    }

    async fn find(&self, owner_id: RecordId, filename: &str) -> Result<Option<FileRecord>, AppError> {
        let row = sqlx::query("SELECT id, filename, owner_id FROM files WHERE owner_id = ? AND filename = ?")
            .bind(owner_id)
            .bind(filename)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(record_from_row).transpose()?)
    }

    /// Open one of `owner`'s files for streaming.
    pub async fn open(&self, owner: &User, filename: &str) -> Result<(FileRecord, BlobReader), AppError> {
        let record = self
            .find(owner.id, filename)
            .await?
            .ok_or(AppError::FileNotFoundOrForbidden)?;

        match self.blobs.open(owner.id, filename).await? {
            Some(reader) => Ok((record, reader)),
            None => {
                tracing::error!(
                    owner = %owner.username,
                    file_id = record.id,
                    filename,
                    "file record exists but its stored bytes are missing"
                );
                metrics::counter!(telemetry::FILE_INTEGRITY_FAULT).increment(1);
                Err(AppError::StorageIntegrityFault(filename.to_string()))
            },
        }
    }

    /// Read all bytes of one of `owner`'s files
    pub async fn fetch(&self, owner: &User, filename: &str) -> Result<Vec<u8>, AppError> {
        let (_, mut reader) = self.open(owner, filename).await?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        Ok(bytes)
    }

    /// Delete one of `owner`'s files.
    ///
    /// The record delete and the blob removal share a transaction: if the
    /// commit fails the call fails, even though the bytes are already gone.
    /// A blob that is already missing is only logged.
    pub async fn delete(&self, owner: &User, filename: &str) -> Result<(), AppError> {
        let mut tx = self.db.pool().begin().await?;

        let deleted = sqlx::query("DELETE FROM files WHERE owner_id = ? AND filename = ?")
            .bind(owner.id)
            .bind(filename)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(AppError::FileNotFoundOrForbidden);
        }

        if !self.blobs.remove(owner.id, filename).await? {
            tracing::warn!(owner = %owner.username, filename, "deleted record had no stored bytes");
        }

        tx.commit().await?;
        tracing::info!(owner = %owner.username, filename, "deleted file");
        metrics::counter!(telemetry::FILE_DELETED).increment(1);
        Ok(())
    }

    /// All of `owner`'s files, by name
    pub async fn list(&self, owner: &User) -> Result<Vec<FileRecord>, AppError> {
        let rows = sqlx::query("SELECT id, filename, owner_id FROM files WHERE owner_id = ? ORDER BY filename")
            .bind(owner.id)
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows.iter().map(record_from_row).collect::<Result<_, _>>()?)
    }
}
