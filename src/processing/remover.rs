//! The external background removal capability.

use std::io;
use std::path::Path;
use std::process::{ExitStatus, Output, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::{RemoverBackend, RemoverConfig};
use crate::intake::{TempFile, UploadStore};

/// Replaced with the uploaded file's path.
pub const INPUT_PLACEHOLDER: &str = "{input}";
/// Replaced with a scratch path the command writes its result to.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Bytes of stderr kept in error messages.
const STDERR_TAIL: usize = 512;

/// Error type for remover invocations.
#[derive(Debug, thiserror::Error)]
pub enum RemoverError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("failed to read remover input: {0}")]
    ReadInput(#[source] io::Error),
    #[error("failed to read remover output: {0}")]
    ReadOutput(#[source] io::Error),
    #[error("remover produced no output")]
    EmptyOutput,
    #[error("{0}")]
    Message(String),
}

/// Opaque routine that turns an image file into a PNG with the background
/// made transparent. May be slow; callers bound it with their own timeout.
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    async fn remove_background(&self, input: &Path) -> Result<Vec<u8>, RemoverError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Runs an external program per request.
pub struct CommandRemover {
    program: String,
    args: Vec<String>,
    scratch: Arc<UploadStore>,
}

impl CommandRemover {
    /// `scratch` provides output paths when the command writes to a file.
    pub fn new(program: impl Into<String>, args: Vec<String>, scratch: Arc<UploadStore>) -> Self {
        Self {
            program: program.into(),
            args,
            scratch,
        }
    }

    pub fn from_config(config: &RemoverConfig, scratch: Arc<UploadStore>) -> Self {
        Self::new(config.program.clone(), config.args.clone(), scratch)
    }

    fn writes_file(&self) -> bool {
        self.args.iter().any(|arg| arg.contains(OUTPUT_PLACEHOLDER))
    }

    fn render_args(&self, input: &Path, output: Option<&Path>) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.map(|p| p.to_string_lossy());
        self.args
            .iter()
            .map(|arg| {
                let arg = arg.replace(INPUT_PLACEHOLDER, &input);
                match &output {
                    Some(output) => arg.replace(OUTPUT_PLACEHOLDER, output),
                    None => arg,
                }
            })
            .collect()
    }

    async fn collect(
        &self,
        result: io::Result<Output>,
        output_file: Option<&TempFile>,
    ) -> Result<Vec<u8>, RemoverError> {
        let out = result.map_err(|source| RemoverError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !out.status.success() {
            return Err(RemoverError::Failed {
                program: self.program.clone(),
                status: out.status,
                stderr: stderr_tail(&out.stderr),
            });
        }

        let bytes = match output_file {
            Some(file) => tokio::fs::read(file.path())
                .await
                .map_err(RemoverError::ReadOutput)?,
            None => out.stdout,
        };

        if bytes.is_empty() {
            return Err(RemoverError::EmptyOutput);
        }
        Ok(bytes)
    }
}

#[async_trait]
impl BackgroundRemover for CommandRemover {
    async fn remove_background(&self, input: &Path) -> Result<Vec<u8>, RemoverError> {
        let output_file = self
            .writes_file()
            .then(|| TempFile::new(self.scratch.scratch_path(Some("png"))));
        let args = self.render_args(input, output_file.as_ref().map(TempFile::path));

        tracing::debug!(program = %self.program, args = ?args, "Running background remover");

        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        let bytes = self.collect(result, output_file.as_ref()).await;
        if let Some(file) = output_file {
            file.cleanup().await;
        }
        bytes
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// Build the remover selected by `config.backend`.
///
/// `scratch` provides output paths for commands that write to a file.
pub fn build_remover(
    config: &RemoverConfig,
    scratch: Arc<UploadStore>,
) -> Result<Arc<dyn BackgroundRemover>, RemoverError> {
    match config.backend {
        RemoverBackend::Command => Ok(Arc::new(CommandRemover::from_config(config, scratch))),
        #[cfg(feature = "imgly")]
        RemoverBackend::Imgly => Ok(Arc::new(super::imgly::ImglyRemover::from_config(config)?)),
        #[cfg(not(feature = "imgly"))]
        RemoverBackend::Imgly => Err(RemoverError::Message(
            "the imgly backend is not compiled in; rebuild with `--features imgly`".into(),
        )),
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.is_empty() {
        return "no error output".to_string();
    }
    let mut start = text.len().saturating_sub(STDERR_TAIL);
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}
