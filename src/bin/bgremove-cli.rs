use std::path::PathBuf;

use base64::{engine::general_purpose, Engine as _};
use bg_remove_api::http::{ErrorResponse, RemovalResponse};
use clap::{Parser, Subcommand};
use reqwest::multipart::{Form, Part};
use serde_json::Value;

const DATA_URL_PREFIX: &str = "data:image/png;base64,";

#[derive(Parser)]
#[command(name = "bgremove-cli")]
#[command(about = "Client for the background removal API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service health
    Health,
    /// Show service info
    Info,
    /// Upload an image and save the background-free PNG
    Remove {
        /// Image to upload
        image: PathBuf,
        /// Where to write the PNG (prints the JSON response when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/health", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Info => {
            let res = client.get(format!("{}/", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Remove { image, out } => {
            let bytes = tokio::fs::read(&image).await?;
            let file_name = image
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            let form = Form::new().part("image", Part::bytes(bytes).file_name(file_name));

            let res = client
                .post(format!("{}/remove-bg", base))
                .multipart(form)
                .send()
                .await?;

            match out {
                Some(out) => save_png(res, out).await?,
                None => print_response(res).await?,
            }
        }
    }

    Ok(())
}

async fn save_png(res: reqwest::Response, out: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        let body: ErrorResponse = res.json().await?;
        eprintln!("Error: service returned status {}: {}", status, body.error);
        std::process::exit(1);
    }

    let body: RemovalResponse = res.json().await?;
    let encoded = body
        .base64
        .strip_prefix(DATA_URL_PREFIX)
        .ok_or("response is not a PNG data URL")?;
    let png = general_purpose::STANDARD.decode(encoded)?;
    tokio::fs::write(&out, &png).await?;

    println!("Wrote {} bytes to {}", png.len(), out.display());
    if let Some(path) = body.output_path {
        println!("Server copy: {}", path);
    }
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
