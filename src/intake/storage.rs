//! Upload directory and request-scoped temp files.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::multipart::{Field, MultipartError};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::intake::naming::{extension_of, file_name, IdGenerator};
use crate::observability::metrics;

/// Error type for intake operations.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    /// Reading the multipart body failed (malformed, truncated, too large).
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    /// Writing the upload to disk failed.
    #[error("failed to store upload: {0}")]
    Io(#[from] io::Error),
}

/// A file owned by exactly one request.
///
/// Call [`TempFile::cleanup`] once the file is no longer needed. A guard that
/// is dropped without cleanup (request cancelled, handler panicked) removes
/// the file synchronously instead. Release failures are logged and counted,
/// never returned.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
    armed: bool,
}

impl TempFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file from disk.
    pub async fn cleanup(mut self) {
        self.armed = false;
        let result = fs::remove_file(&self.path).await;
        report_removal(&self.path, result);
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.armed {
            let result = std::fs::remove_file(&self.path);
            report_removal(&self.path, result);
        }
    }
}

fn report_removal(path: &Path, result: io::Result<()>) {
    match result {
        Ok(()) => tracing::debug!(path = %path.display(), "Deleted temp file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Temp file already gone");
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to delete temp file");
            metrics::record_cleanup_failure();
        }
    }
}

/// The shared upload directory.
///
/// Requests never share a file: every path handed out comes from the
/// injected [`IdGenerator`] and is opened with `create_new`.
pub struct UploadStore {
    upload_dir: PathBuf,
    ids: Arc<dyn IdGenerator>,
}

impl UploadStore {
    /// Create the store, creating `upload_dir` if it does not exist.
    pub fn new(upload_dir: impl Into<PathBuf>, ids: Arc<dyn IdGenerator>) -> io::Result<Self> {
        let upload_dir = upload_dir.into();
        std::fs::create_dir_all(&upload_dir)?;
        Ok(Self { upload_dir, ids })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// A fresh, unused path in the upload directory.
    pub fn scratch_path(&self, ext: Option<&str>) -> PathBuf {
        self.upload_dir.join(file_name(&self.ids.next_id(), ext))
    }

    /// Stream a multipart field to disk.
    ///
    /// Returns `Ok(None)` when the field carried no bytes; nothing is left on
    /// disk in that case or on error.
    pub async fn store_field(&self, mut field: Field<'_>) -> Result<Option<TempFile>, IntakeError> {
        let ext = extension_of(field.file_name());
        let (temp, mut file) = self.create(ext.as_deref()).await?;

        let result = write_field(&mut field, &mut file).await;
        drop(file);

        match result {
            Ok(0) => {
                temp.cleanup().await;
                Ok(None)
            }
            Ok(written) => {
                tracing::debug!(path = %temp.path().display(), bytes = written, "Stored upload");
                Ok(Some(temp))
            }
            Err(e) => {
                temp.cleanup().await;
                Err(e)
            }
        }
    }

    /// Write an in-memory upload to disk.
    #[cfg(test)]
    pub(crate) async fn store_bytes(
        &self,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<TempFile, IntakeError> {
        let ext = extension_of(original_name);
        let (temp, mut file) = self.create(ext.as_deref()).await?;
        let result = async {
            file.write_all(bytes).await?;
            file.flush().await
        }
        .await;
        drop(file);

        match result {
            Ok(()) => Ok(temp),
            Err(e) => {
                temp.cleanup().await;
                Err(e.into())
            }
        }
    }

    async fn create(&self, ext: Option<&str>) -> Result<(TempFile, File), IntakeError> {
        // The directory may have been removed since startup.
        fs::create_dir_all(&self.upload_dir).await?;
        let path = self.scratch_path(ext);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        Ok((TempFile::new(path), file))
    }
}

async fn write_field(field: &mut Field<'_>, file: &mut File) -> Result<usize, IntakeError> {
    let mut written = 0usize;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        written = written.saturating_add(chunk.len());
    }
    file.flush().await?;
    Ok(written)
}
