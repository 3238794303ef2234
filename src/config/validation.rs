//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the selected remover backend is usable
//! - Validate value ranges (limits and timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::{RemoverBackend, ServiceConfig};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("remover.program must not be empty")]
    EmptyProgram,
    #[error("remover.args must contain an {{input}} placeholder")]
    MissingInputPlaceholder,
    #[error("remover.backend = \"imgly\" requires building with the `imgly` feature")]
    ImglyUnavailable,
    #[error("remover.model must not be empty")]
    EmptyModel,
    #[error("security.max_body_size must be greater than zero")]
    ZeroBodyLimit,
    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,
    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
    #[error("storage.output_dir must differ from storage.upload_dir")]
    OutputDirIsUploadDir,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let remover = &config.remover;
    match remover.backend {
        RemoverBackend::Command => {
            if remover.program.trim().is_empty() {
                errors.push(ValidationError::EmptyProgram);
            }
            if !remover.args.iter().any(|arg| arg.contains("{input}")) {
                errors.push(ValidationError::MissingInputPlaceholder);
            }
        }
        RemoverBackend::Imgly => {
            if !cfg!(feature = "imgly") {
                errors.push(ValidationError::ImglyUnavailable);
            }
            if remover.model_path.is_none() && remover.model.trim().is_empty() {
                errors.push(ValidationError::EmptyModel);
            }
        }
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_socket_addr().is_none()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }
    if config.storage.output_dir.as_ref() == Some(&config.storage.upload_dir) {
        errors.push(ValidationError::OutputDirIsUploadDir);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
