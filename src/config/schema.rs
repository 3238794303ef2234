//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the background removal service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (host, port).
    pub listener: ListenerConfig,

    /// Where uploads (and optional outputs) live on disk.
    pub storage: StorageConfig,

    /// Which [`BackgroundRemover`](crate::processing::BackgroundRemover) serves requests.
    pub remover: RemoverConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request limits and error exposure.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// TCP port. Overridden by the `PORT` environment variable.
    pub port: u16,
}

impl ListenerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// On-disk storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for request-scoped upload files (created if missing).
    pub upload_dir: PathBuf,

    /// When set, every processed image is also written here as
    /// `output-<id>.png`. These files are never cleaned up by the service.
    pub output_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            output_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RemoverBackend {
    /// Spawn `program` once per request.
    #[default]
    Command,
    /// Run the imgly segmentation model in-process. Needs the `imgly` feature.
    Imgly,
}

/// Background removal backend.
///
/// For the command backend, `{input}` in `args` is replaced with the uploaded
/// file path and `{output}` with a scratch path the command must write its
/// PNG to. Without an `{output}` placeholder the PNG is read from the
/// command's stdout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoverConfig {
    pub backend: RemoverBackend,

    /// Program to execute (looked up on `PATH`).
    pub program: String,

    /// Arguments, with placeholders.
    pub args: Vec<String>,

    /// Cached model id for the imgly backend.
    pub model: String,

    /// ONNX model directory for the imgly backend; overrides `model`.
    pub model_path: Option<PathBuf>,

    /// Deadline for a single invocation in seconds (0 = no deadline).
    pub timeout_secs: u64,
}

impl RemoverConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for RemoverConfig {
    fn default() -> Self {
        Self {
            backend: RemoverBackend::Command,
            program: "rembg".to_string(),
            args: vec!["i".into(), "{input}".into(), "{output}".into()],
            model: "imgly--isnet-general-onnx".to_string(),
            model_path: None,
            timeout_secs: 120,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 300 }
    }
}

/// Request limits and error exposure.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,

    /// Return the remover's error message to clients verbatim.
    /// When false, clients get a generic message and details stay in logs.
    pub expose_error_details: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 20 * 1024 * 1024, // 20MB
            expose_error_details: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl ObservabilityConfig {
    pub fn metrics_socket_addr(&self) -> Option<SocketAddr> {
        self.metrics_address.parse().ok()
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
