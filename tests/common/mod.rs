//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bg_remove_api::config::ServiceConfig;
use bg_remove_api::http::HttpServer;
use bg_remove_api::intake::UuidIds;
use bg_remove_api::lifecycle::Shutdown;
use bg_remove_api::processing::{BackgroundRemover, RemoverError};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Returns the PNG signature followed by the input file's bytes, so every
/// response can be traced back to the upload that produced it.
#[derive(Default)]
pub struct EchoRemover {
    pub delay: Duration,
    calls: AtomicUsize,
    seen: Mutex<Vec<PathBuf>>,
}

impl EchoRemover {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<PathBuf> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackgroundRemover for EchoRemover {
    async fn remove_background(&self, input: &Path) -> Result<Vec<u8>, RemoverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(input.to_path_buf());

        let body = tokio::fs::read(input)
            .await
            .map_err(|e| RemoverError::Message(e.to_string()))?;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut out = PNG_SIGNATURE.to_vec();
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// Always fails with the given message.
pub struct FailingRemover {
    pub message: String,
    calls: AtomicUsize,
    seen: Mutex<Vec<PathBuf>>,
}

impl FailingRemover {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<PathBuf> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackgroundRemover for FailingRemover {
    async fn remove_background(&self, input: &Path) -> Result<Vec<u8>, RemoverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(input.to_path_buf());
        Err(RemoverError::Message(self.message.clone()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// A running server on an ephemeral port with its own upload directory.
pub struct TestServer {
    pub addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub dir: TempDir,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Files currently in the upload directory.
    pub fn upload_files(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(&self.upload_dir) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a server backed by `remover`; `configure` may adjust the config.
pub async fn start_server<F>(remover: Arc<dyn BackgroundRemover>, configure: F) -> TestServer
where
    F: FnOnce(&mut ServiceConfig, &Path),
{
    let dir = tempfile::tempdir().unwrap();
    let upload_dir = dir.path().join("uploads");

    let mut config = ServiceConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config.storage.upload_dir = upload_dir.clone();
    configure(&mut config, dir.path());

    let listener = TcpListener::bind(config.listener.bind_address()).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::with_parts(config, remover, Arc::new(UuidIds)).unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestServer {
        addr,
        upload_dir,
        dir,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

pub fn image_form(file_name: &str, bytes: Vec<u8>) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new().part(
        "image",
        reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string()),
    )
}
