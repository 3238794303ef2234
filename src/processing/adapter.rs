//! Processing adapter: stored upload in, base64 PNG out.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::{engine::general_purpose, Engine as _};

use crate::intake::{IdGenerator, TempFile};
use crate::observability::metrics;
use crate::processing::remover::{BackgroundRemover, RemoverError};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Error type for processing.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Remover(#[from] RemoverError),
    #[error("background removal timed out after {0:?}")]
    TimedOut(Duration),
    #[error("background remover returned data that is not a PNG image")]
    NotPng,
}

/// Result of a successful removal.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    /// Standard-alphabet base64 of the PNG bytes.
    pub base64: String,
    /// Where the permanent copy was written, if output persistence is on.
    pub output_path: Option<PathBuf>,
}

impl ProcessedImage {
    pub fn data_url(&self) -> String {
        format!("data:image/png;base64,{}", self.base64)
    }
}

pub fn is_png(bytes: &[u8]) -> bool {
    bytes.starts_with(&PNG_SIGNATURE)
}

/// Delegates to a [`BackgroundRemover`] and owns the input file's release.
pub struct ProcessingAdapter {
    remover: Arc<dyn BackgroundRemover>,
    ids: Arc<dyn IdGenerator>,
    timeout: Option<Duration>,
    output_dir: Option<PathBuf>,
}

impl ProcessingAdapter {
    pub fn new(remover: Arc<dyn BackgroundRemover>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            remover,
            ids,
            timeout: None,
            output_dir: None,
        }
    }

    /// Bound every remover call. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Also keep a permanent `output-<id>.png` copy in `dir`.
    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.output_dir = dir;
        self
    }

    pub fn remover_name(&self) -> &str {
        self.remover.name()
    }

    /// Run the remover on `input`, then delete `input`.
    ///
    /// The input is released only after the remover has returned, failed, or
    /// been abandoned on timeout.
    pub async fn process(&self, input: TempFile) -> Result<ProcessedImage, ProcessingError> {
        let started = Instant::now();
        let result = self.invoke(input.path()).await;
        input.cleanup().await;

        let elapsed = started.elapsed();
        metrics::record_processing(elapsed);

        let bytes = result?;
        if !is_png(&bytes) {
            return Err(ProcessingError::NotPng);
        }

        tracing::debug!(
            remover = %self.remover.name(),
            bytes = bytes.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Background removed"
        );

        let output_path = match &self.output_dir {
            Some(dir) => self.persist(dir, &bytes).await,
            None => None,
        };

        Ok(ProcessedImage {
            base64: general_purpose::STANDARD.encode(&bytes),
            output_path,
        })
    }

    async fn invoke(&self, input: &Path) -> Result<Vec<u8>, ProcessingError> {
        let call = self.remover.remove_background(input);
        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => Ok(result?),
                Err(_) => Err(ProcessingError::TimedOut(limit)),
            },
            None => Ok(call.await?),
        }
    }

    /// Failures are logged; the response just goes out without a path.
    async fn persist(&self, dir: &Path, bytes: &[u8]) -> Option<PathBuf> {
        let path = dir.join(format!("output-{}.png", self.ids.next_id()));
        let result = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, bytes).await
        }
        .await;

        match result {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Saved output image");
                Some(path)
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to save output image");
                None
            }
        }
    }
}
