use super::*;

use std::sync::Arc;

use axum::{
    extract::Multipart,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use shared::domain::ImageKind;
use tokio::{
    net::TcpListener,
    sync::{oneshot, Mutex},
};

fn upload() -> AnalysisUpload {
    AnalysisUpload {
        filename: "parcel.jpg".to_owned(),
        kind: ImageKind::Jpeg,
        bytes: vec![1, 2, 3, 4, 5],
    }
}

#[derive(Debug)]
struct ReceivedUpload {
    field_name: String,
    file_name: String,
    content_type: String,
    size: usize,
}

async fn spawn_capture_server() -> (String, oneshot::Receiver<ReceivedUpload>) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (tx, rx) = oneshot::channel();
    let tx = Arc::new(Mutex::new(Some(tx)));
    let app = Router::new().route(
        "/api/predict",
        post(move |mut multipart: Multipart| {
            let tx = tx.clone();
            async move {
                let field = multipart
                    .next_field()
                    .await
                    .expect("read multipart")
                    .expect("one field");
                let received = ReceivedUpload {
                    field_name: field.name().unwrap_or_default().to_owned(),
                    file_name: field.file_name().unwrap_or_default().to_owned(),
                    content_type: field.content_type().unwrap_or_default().to_owned(),
                    size: field.bytes().await.expect("field bytes").len(),
                };
                if let Some(tx) = tx.lock().await.take() {
                    let _ = tx.send(received);
                }
                Json(json!({
                    "results": [{
                        "confidence": 0.8,
                        "image": "data:image/png;base64,QQ==",
                        "stats": {
                            "total_trees": 12,
                            "individual_trees": 8,
                            "cluster_count": 2,
                            "trees_in_clusters": 4,
                            "density_per_area": 0.2,
                            "green_coverage_area": 33.3
                        }
                    }]
                }))
            }
        }),
    );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), rx)
}

async fn spawn_static_server(status: StatusCode, body: &'static str) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new().route("/api/predict", post(move || async move { (status, body) }));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn predict_posts_one_multipart_image_field() {
    let (server_url, captured) = spawn_capture_server().await;
    let client = HttpInferenceClient::from_base_url(&server_url).expect("client");

    let response = client.predict(&upload()).await.expect("predict");
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].confidence, 0.8);

    let received = captured.await.expect("captured upload");
    assert_eq!(received.field_name, "image");
    assert_eq!(received.file_name, "parcel.jpg");
    assert_eq!(received.content_type, "image/jpeg");
    assert_eq!(received.size, 5);
}

#[tokio::test]
async fn non_success_bodies_are_surfaced_verbatim() {
    let server_url =
        spawn_static_server(StatusCode::INTERNAL_SERVER_ERROR, "model unavailable").await;
    let client = HttpInferenceClient::from_base_url(&server_url).expect("client");

    let err = client.predict(&upload()).await.expect_err("500 response");
    assert_eq!(err.to_string(), "model unavailable");
}

#[tokio::test]
async fn empty_error_bodies_fall_back_to_the_status_line() {
    let server_url = spawn_static_server(StatusCode::SERVICE_UNAVAILABLE, "").await;
    let client = HttpInferenceClient::from_base_url(&server_url).expect("client");

    let err = client.predict(&upload()).await.expect_err("503 response");
    assert_eq!(err.to_string(), "503 Service Unavailable");
}

#[tokio::test]
async fn malformed_success_bodies_are_reported_as_invalid() {
    let server_url = spawn_static_server(StatusCode::OK, "this is not json").await;
    let client = HttpInferenceClient::from_base_url(&server_url).expect("client");

    let err = client.predict(&upload()).await.expect_err("bad body");
    assert!(
        err.to_string().starts_with("invalid inference response:"),
        "{err}"
    );
}

#[tokio::test]
async fn fetch_image_decodes_data_uris_locally() {
    // Port 9 (discard) is never contacted; a data URI resolves offline.
    let client = HttpInferenceClient::from_base_url("http://127.0.0.1:9").expect("client");
    let image = ImageRef::from(format!(
        "data:image/png;base64,{}",
        STANDARD.encode(b"pixels")
    ));

    let bytes = client.fetch_image(&image).await.expect("decode");
    assert_eq!(bytes, b"pixels");
}

#[tokio::test]
async fn fetch_image_rejects_malformed_data_uris() {
    let client = HttpInferenceClient::from_base_url("http://127.0.0.1:9").expect("client");

    let err = client
        .fetch_image(&ImageRef::from("data:image/png;base64,!!!not-base64!!!"))
        .await
        .expect_err("bad payload");
    assert!(err.to_string().contains("invalid base64 payload"), "{err}");
}

#[tokio::test]
async fn fetch_image_resolves_server_relative_urls() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new().route(
        "/annotated/latest.jpg",
        get(|| async { b"jpeg-bytes".as_slice() }),
    );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let client =
        HttpInferenceClient::from_base_url(&format!("http://{addr}")).expect("client");
    let bytes = client
        .fetch_image(&ImageRef::from("annotated/latest.jpg"))
        .await
        .expect("fetch");
    assert_eq!(bytes, b"jpeg-bytes");
}
