// ============================
// filedrop-lib/src/storage.rs
// ============================
//! Blob storage abstraction with flat-file implementation.
//!
//! Blobs live at `<root>/<owner_id>/<filename>`. Writes go to a hidden staging
//! file in the owner's directory first and are renamed into place, so readers
//! never observe a half-written blob.
use std::{fs, io::ErrorKind, path::{Path, PathBuf}, pin::pin};
use async_trait::async_trait;
use axum::body::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::{fs as tokio_fs, io::{AsyncRead, AsyncWriteExt}};
use uuid::Uuid;
use filedrop_common::RecordId;
use crate::error::AppError;

/// Readable handle to a stored blob
pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

/// Bytes written to staging but not yet visible under their final name
#[derive(Debug)]
pub struct StagedBlob {
    path: PathBuf,
    /// Number of bytes written
    pub size: u64,
}

/// Trait for blob storage backends.
///
/// Callers are expected to pass filenames that are a single plain path
/// component; see [`crate::files::validate_filename`].
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write a stream of chunks to staging
    async fn stage<St>(&self, owner_id: RecordId, content: St) -> Result<StagedBlob, AppError>
    where
        St: Stream<Item = Result<Bytes, AppError>> + Send;

    /// Move staged bytes to their final name, replacing any previous blob
    async fn promote(&self, staged: &StagedBlob, owner_id: RecordId, filename: &str) -> Result<(), AppError>;

    /// Drop staged bytes that will not be promoted
    async fn discard(&self, staged: StagedBlob);

    /// Open a blob for reading. `None` if it does not exist.
    async fn open(&self, owner_id: RecordId, filename: &str) -> Result<Option<BlobReader>, AppError>;

    /// Remove a blob. Returns `false` if it was already gone.
    async fn remove(&self, owner_id: RecordId, filename: &str) -> Result<bool, AppError>;
}

/// Flat-file implementation of the BlobStore trait
#[derive(Clone, Debug)]
pub struct FlatFileStorage {
    root: PathBuf,
}

impl FlatFileStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn owner_dir(&self, owner_id: RecordId) -> PathBuf {
        self.root.join(owner_id.to_string())
    }

    /// Final location of a blob
    pub fn blob_path(&self, owner_id: RecordId, filename: &str) -> PathBuf {
        self.owner_dir(owner_id).join(filename)
    }
}

async fn write_chunks<St>(file: &mut tokio_fs::File, content: St) -> Result<u64, AppError>
where
    St: Stream<Item = Result<Bytes, AppError>>,
{
    let mut content = pin!(content);
    let mut size = 0u64;
    while let Some(chunk) = content.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        size += chunk.len() as u64;
    }
    file.sync_all().await?;
    Ok(size)
}

#[async_trait]
impl BlobStore for FlatFileStorage {
    async fn stage<St>(&self, owner_id: RecordId, content: St) -> Result<StagedBlob, AppError>
    where
        St: Stream<Item = Result<Bytes, AppError>> + Send,
    {
        let dir = self.owner_dir(owner_id);
        tokio_fs::create_dir_all(&dir).await?;

        let path = dir.join(format!(".{}.part", Uuid::new_v4()));
        let written = {
            let mut file = tokio_fs::File::create(&path).await?;
            write_chunks(&mut file, content).await
            // file handle closes here on success and on error
        };

        match written {
            Ok(size) => Ok(StagedBlob { path, size }),
            Err(e) => {
                if let Err(cleanup) = tokio_fs::remove_file(&path).await {
                    tracing::warn!(path = %path.display(), error = %cleanup, "failed to remove partial upload");
                }
                Err(e)
            },
        }
    }

    async fn promote(&self, staged: &StagedBlob, owner_id: RecordId, filename: &str) -> Result<(), AppError> {
        tokio_fs::rename(&staged.path, self.blob_path(owner_id, filename)).await?;
        Ok(())
    }

    async fn discard(&self, staged: StagedBlob) {
        match tokio_fs::remove_file(&staged.path).await {
            Ok(()) => {},
            // already promoted or cleaned up
            Err(e) if e.kind() == ErrorKind::NotFound => {},
            Err(e) => {
                tracing::warn!(path = %staged.path.display(), error = %e, "failed to discard staged upload");
            },
        }
    }

    async fn open(&self, owner_id: RecordId, filename: &str) -> Result<Option<BlobReader>, AppError> {
        match tokio_fs::File::open(self.blob_path(owner_id, filename)).await {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, owner_id: RecordId, filename: &str) -> Result<bool, AppError> {
        match tokio_fs::remove_file(self.blob_path(owner_id, filename)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
