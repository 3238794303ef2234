//! Background removal HTTP service.
//!
//! # Architecture Overview
//!
//! ```text
//!     POST /remove-bg (multipart "image")
//!         │
//!         ▼
//!   ┌──────────┐    ┌──────────────┐    ┌────────────────────┐
//!   │  http    │───▶│   intake     │───▶│    processing      │───▶ external remover
//!   │ handlers │    │ UploadStore  │    │ ProcessingAdapter  │     (rembg, imgly, ...)
//!   └──────────┘    └──────────────┘    └─────────┬──────────┘
//!         ▲                                       │ base64 PNG
//!         └───────────── response.rs ◀────────────┘
//!                                     temp file deleted
//! ```
//!
//! Configuration comes from an optional TOML file (`--config`) plus the
//! `PORT` environment variable.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "bg-remove-api", version, about = "HTTP service that strips image backgrounds")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "BG_REMOVE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    bg_remove_api::lifecycle::startup::run(args.config.as_deref()).await
}
