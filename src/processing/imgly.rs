//! In-process background removal with the imgly segmentation models.

use std::path::Path;

use async_trait::async_trait;
use imgly_bgremove::{ModelSource, ModelSpec, OutputFormat, RemovalConfig};
use tokio::runtime::Handle;

use crate::config::RemoverConfig;
use crate::processing::remover::{BackgroundRemover, RemoverError};

/// Runs ONNX inference on the blocking pool, one image per call.
pub struct ImglyRemover {
    config: RemovalConfig,
    name: String,
}

impl ImglyRemover {
    pub fn from_config(config: &RemoverConfig) -> Result<Self, RemoverError> {
        let spec = model_spec(config);
        let name = format!("imgly ({})", spec.source.display_name());
        let config = RemovalConfig::builder()
            .model_spec(spec)
            .build()
            .map_err(|e| RemoverError::Message(format!("invalid imgly configuration: {e}")))?;
        Ok(Self { config, name })
    }
}

fn model_spec(config: &RemoverConfig) -> ModelSpec {
    let source = match &config.model_path {
        Some(path) => ModelSource::External(path.clone()),
        None => ModelSource::Downloaded(config.model.clone()),
    };
    ModelSpec {
        source,
        variant: None,
    }
}

#[async_trait]
impl BackgroundRemover for ImglyRemover {
    async fn remove_background(&self, input: &Path) -> Result<Vec<u8>, RemoverError> {
        let bytes = tokio::fs::read(input)
            .await
            .map_err(RemoverError::ReadInput)?;
        let config = self.config.clone();
        let handle = Handle::current();

        let png = tokio::task::spawn_blocking(move || {
            let result =
                handle.block_on(imgly_bgremove::remove_background_from_bytes(&bytes, &config))?;
            result.to_bytes(OutputFormat::Png, 100)
        })
        .await
        .map_err(|e| RemoverError::Message(format!("imgly task failed: {e}")))?
        .map_err(|e| RemoverError::Message(e.to_string()))?;

        if png.is_empty() {
            return Err(RemoverError::EmptyOutput);
        }
        Ok(png)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
