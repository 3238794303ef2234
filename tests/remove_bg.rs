//! End-to-end tests for the HTTP surface.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use bg_remove_api::http::{ErrorResponse, HealthResponse, IndexResponse, RemovalResponse};
use serde_json::Value;

mod common;

use common::{client, image_form, start_server, EchoRemover, FailingRemover, PNG_SIGNATURE};

const DATA_URL_PREFIX: &str = "data:image/png;base64,";

fn decode_data_url(data_url: &str) -> Vec<u8> {
    let encoded = data_url
        .strip_prefix(DATA_URL_PREFIX)
        .expect("response is not a PNG data URL");
    general_purpose::STANDARD.decode(encoded).unwrap()
}

#[tokio::test]
async fn test_health() {
    let server = start_server(Arc::new(EchoRemover::default()), |_, _| {}).await;

    let res = client().get(server.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));

    let body: HealthResponse = res.json().await.unwrap();
    assert_eq!(body.status, "ok");
    assert!(chrono::DateTime::parse_from_rfc3339(&body.timestamp).is_ok());
}

#[tokio::test]
async fn test_index() {
    let server = start_server(Arc::new(EchoRemover::default()), |_, _| {}).await;

    let res = client().get(server.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let body: IndexResponse = res.json().await.unwrap();
    assert_eq!(body.message, "Background Removal API");
    assert_eq!(body.endpoint, "POST /remove-bg");
    assert_eq!(body.status, "running");
}

#[tokio::test]
async fn test_successful_removal() {
    let remover = Arc::new(EchoRemover::default());
    let server = start_server(remover.clone(), |_, _| {}).await;

    let res = client()
        .post(server.url("/remove-bg"))
        .multipart(image_form("cat.JPG", b"jpeg-bytes".to_vec()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let json: Value = res.json().await.unwrap();
    assert!(json.get("outputPath").is_none());
    let body: RemovalResponse = serde_json::from_value(json).unwrap();
    assert!(body.success);
    assert_eq!(body.message, "Background removed successfully!");

    let png = decode_data_url(&body.base64);
    assert!(png.starts_with(&PNG_SIGNATURE));
    assert_eq!(&png[PNG_SIGNATURE.len()..], b"jpeg-bytes");

    let seen = remover.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].extension().unwrap(), "jpg");
    assert!(seen[0].starts_with(&server.upload_dir));
    assert!(!seen[0].exists());
    assert!(server.upload_files().is_empty());
}

#[tokio::test]
async fn test_missing_image_field() {
    let remover = Arc::new(EchoRemover::default());
    let server = start_server(remover.clone(), |_, _| {}).await;

    let form = reqwest::multipart::Form::new()
        .text("name", "cat")
        .part("file", reqwest::multipart::Part::bytes(b"data".to_vec()).file_name("cat.png"));
    let res = client()
        .post(server.url("/remove-bg"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let json: Value = res.json().await.unwrap();
    assert_eq!(json, serde_json::json!({ "error": "No image file uploaded!" }));
    assert_eq!(remover.calls(), 0);
    assert!(server.upload_files().is_empty());
}

#[tokio::test]
async fn test_text_image_field_is_not_an_upload() {
    let remover = Arc::new(EchoRemover::default());
    let server = start_server(remover.clone(), |_, _| {}).await;

    let form = reqwest::multipart::Form::new().text("image", "just some text");
    let res = client()
        .post(server.url("/remove-bg"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let json: Value = res.json().await.unwrap();
    assert_eq!(json, serde_json::json!({ "error": "No image file uploaded!" }));
    assert_eq!(remover.calls(), 0);
    assert!(server.upload_files().is_empty());
}

#[tokio::test]
async fn test_file_after_text_image_field_is_used() {
    let remover = Arc::new(EchoRemover::default());
    let server = start_server(remover.clone(), |_, _| {}).await;

    let form = reqwest::multipart::Form::new().text("image", "caption").part(
        "image",
        reqwest::multipart::Part::bytes(b"real-image".to_vec()).file_name("cat.png"),
    );
    let res = client()
        .post(server.url("/remove-bg"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let body: RemovalResponse = res.json().await.unwrap();
    assert_eq!(&decode_data_url(&body.base64)[PNG_SIGNATURE.len()..], b"real-image");
    assert_eq!(remover.calls(), 1);
    assert!(server.upload_files().is_empty());
}

#[tokio::test]
async fn test_non_multipart_request() {
    let remover = Arc::new(EchoRemover::default());
    let server = start_server(remover.clone(), |_, _| {}).await;

    let res = client()
        .post(server.url("/remove-bg"))
        .body("not a form")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let body: ErrorResponse = res.json().await.unwrap();
    assert_eq!(body.error, "No image file uploaded!");
    assert!(body.success.is_none());
    assert_eq!(remover.calls(), 0);
}

#[tokio::test]
async fn test_empty_image_field() {
    let remover = Arc::new(EchoRemover::default());
    let server = start_server(remover.clone(), |_, _| {}).await;

    let res = client()
        .post(server.url("/remove-bg"))
        .multipart(image_form("empty.png", Vec::new()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    assert_eq!(remover.calls(), 0);
    assert!(server.upload_files().is_empty());
}

#[tokio::test]
async fn test_remover_failure_is_redacted_and_cleaned_up() {
    let remover = Arc::new(FailingRemover::new("onnx session crashed at /opt/models/u2net"));
    let server = start_server(remover.clone(), |_, _| {}).await;

    let res = client()
        .post(server.url("/remove-bg"))
        .multipart(image_form("cat.png", b"png".to_vec()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);

    let body: ErrorResponse = res.json().await.unwrap();
    assert_eq!(body.success, Some(false));
    assert_eq!(body.error, "Background removal failed");

    assert_eq!(remover.calls(), 1);
    assert!(!remover.seen()[0].exists());
    assert!(server.upload_files().is_empty());
}

#[tokio::test]
async fn test_remover_failure_exposed_when_configured() {
    let remover = Arc::new(FailingRemover::new("unsupported image format"));
    let server = start_server(remover.clone(), |config, _| {
        config.security.expose_error_details = true;
    })
    .await;

    let res = client()
        .post(server.url("/remove-bg"))
        .multipart(image_form("cat.bmp", b"bmp".to_vec()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);

    let body: ErrorResponse = res.json().await.unwrap();
    assert_eq!(body.success, Some(false));
    assert_eq!(body.error, "unsupported image format");
    assert!(server.upload_files().is_empty());
}

#[tokio::test]
async fn test_concurrent_uploads_do_not_mix() {
    let remover = Arc::new(EchoRemover::with_delay(Duration::from_millis(50)));
    let server = start_server(remover.clone(), |_, _| {}).await;
    let client = client();

    let requests = (0..8).map(|i| {
        let client = client.clone();
        let url = server.url("/remove-bg");
        async move {
            let payload = format!("image-payload-{i}").into_bytes();
            let res = client
                .post(url)
                .multipart(image_form("same-name.png", payload.clone()))
                .send()
                .await
                .unwrap();
            assert_eq!(res.status(), 200);
            let body: RemovalResponse = res.json().await.unwrap();
            (payload, decode_data_url(&body.base64))
        }
    });

    let handles: Vec<_> = requests.map(tokio::spawn).collect();
    for handle in handles {
        let (payload, png) = handle.await.unwrap();
        assert_eq!(&png[PNG_SIGNATURE.len()..], payload.as_slice());
    }

    let seen: HashSet<_> = remover.seen().into_iter().collect();
    assert_eq!(seen.len(), 8, "every request gets its own temp file");
    assert!(server.upload_files().is_empty());
}

#[tokio::test]
async fn test_output_copy_persisted_when_configured() {
    let remover = Arc::new(EchoRemover::default());
    let server = start_server(remover, |config, root| {
        config.storage.output_dir = Some(root.join("outputs"));
    })
    .await;

    let res = client()
        .post(server.url("/remove-bg"))
        .multipart(image_form("dog.webp", b"webp".to_vec()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let body: RemovalResponse = res.json().await.unwrap();
    let output_path = std::path::PathBuf::from(body.output_path.expect("outputPath missing"));
    assert!(output_path.starts_with(server.dir.path().join("outputs")));
    let file_name = output_path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(file_name.starts_with("output-") && file_name.ends_with(".png"));
    assert_eq!(std::fs::read(&output_path).unwrap(), decode_data_url(&body.base64));
    assert!(server.upload_files().is_empty());
}

#[tokio::test]
async fn test_oversized_upload_rejected() {
    let remover = Arc::new(EchoRemover::default());
    let server = start_server(remover.clone(), |config, _| {
        config.security.max_body_size = 1024;
    })
    .await;

    let res = client()
        .post(server.url("/remove-bg"))
        .multipart(image_form("big.png", vec![7u8; 8 * 1024]))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 413);
    assert!(res.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("application/json"));

    let body: ErrorResponse = res.json().await.unwrap();
    assert_eq!(body.success, Some(false));
    assert!(!body.error.is_empty());
    assert_eq!(remover.calls(), 0);
    assert!(server.upload_files().is_empty());
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let server = start_server(Arc::new(EchoRemover::default()), |_, _| {}).await;

    let res = client()
        .get(server.url("/health"))
        .header("x-request-id", "trace-me-42")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "trace-me-42");
}
