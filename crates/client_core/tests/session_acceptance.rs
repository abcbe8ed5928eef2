use std::io::Cursor;

use axum::{extract::Multipart, routing::post, Json, Router};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use tokio::net::TcpListener;

use client_core::{
    intake::{self, FileCandidate},
    orchestrator,
    results::{self, DEFAULT_CONFIDENCE},
    HttpInferenceClient, InferenceBackend, OrchestratorError, Session, ValidationError,
};
use client_core::session::Page;

fn png_bytes() -> Vec<u8> {
    let pixels = image::RgbImage::from_pixel(6, 6, image::Rgb([30, 140, 60]));
    let mut buffer = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(pixels)
        .write_to(&mut buffer, image::ImageFormat::Png)
        .expect("encode test image");
    buffer.into_inner()
}

/// Stand-in inference service speaking the legacy response dialect: stats
/// flattened into each result, camelCase names, densities as strings, and
/// the annotated image echoed back as a data URI.
async fn spawn_inference_stub() -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new().route(
        "/api/predict",
        post(|mut multipart: Multipart| async move {
            let field = multipart
                .next_field()
                .await
                .expect("read multipart")
                .expect("image field");
            assert_eq!(field.name(), Some("image"));
            let bytes = field.bytes().await.expect("field bytes");
            let annotated = format!("data:image/png;base64,{}", STANDARD.encode(&bytes));

            let results: Vec<_> = [0.2_f64, 0.8, 0.95]
                .iter()
                .map(|confidence| {
                    let scale = (confidence * 100.0) as u32;
                    json!({
                        "confidence": confidence,
                        "annotatedImage": annotated,
                        "treeCount": 100 + scale,
                        "individualTrees": 60 + scale,
                        "clusters": 6,
                        "estimatedInClusters": 40,
                        "density": format!("{:.2}", 0.3 + confidence / 10.0),
                        "coverage": format!("{:.1}", 40.0 + confidence),
                    })
                })
                .collect();
            Json(json!({ "results": results, "processingTime": "1.42" }))
        }),
    );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn full_session_lifecycle_against_a_live_stub() {
    let server_url = spawn_inference_stub().await;
    let client = HttpInferenceClient::from_base_url(&server_url).expect("client");

    let mut session = Session::new();

    // A wrong-format candidate bounces without touching the empty session.
    let rejected = intake::select_file(
        &mut session,
        FileCandidate {
            name: "notes.txt".to_owned(),
            mime_type: Some("text/plain".to_owned()),
            bytes: b"not an image".to_vec(),
        },
    )
    .expect_err("text file rejected");
    assert_eq!(rejected, ValidationError::UnsupportedType);
    assert!(session.selection().is_none());

    // A real satellite image goes through intake and analysis.
    let upload = png_bytes();
    intake::select_file(
        &mut session,
        FileCandidate {
            name: "parcel.png".to_owned(),
            mime_type: Some("image/png".to_owned()),
            bytes: upload.clone(),
        },
    )
    .expect("valid selection");
    assert!(session
        .preview_uri()
        .expect("preview")
        .starts_with("data:image/png;base64,"));

    orchestrator::run_analysis(&mut session, &client)
        .await
        .expect("analysis succeeds");

    let store = session.results().expect("results page");
    assert_eq!(store.variant_count(), 3);
    assert_eq!(store.selected_confidence(), DEFAULT_CONFIDENCE);
    assert_eq!(store.processing_time(), Some(1.42));
    assert!(session.selection().is_none());

    // The projection reflects the stub's statistics for the default variant.
    let projection = results::project(store);
    let values: Vec<f64> = projection.stats.iter().map(|stat| stat.value).collect();
    assert_eq!(values, vec![180.0, 140.0, 6.0, 40.0, 0.38, 40.8]);

    // The annotated image round-trips through the data URI to the upload.
    let annotated = client
        .fetch_image(&projection.image)
        .await
        .expect("annotated image");
    assert_eq!(annotated, upload);

    // Switching thresholds re-projects different statistics.
    session
        .results_mut()
        .expect("results page")
        .select(0.2)
        .expect("known threshold");
    let projection = results::project(session.results().expect("results page"));
    assert_eq!(projection.stats[0].value, 120.0);

    // Reset returns to a blank upload page, ready for another run.
    session.reset();
    assert!(matches!(session.page(), Page::Upload(_)));
    assert!(session.results().is_none());
    assert!(session.selection().is_none());
    assert_eq!(
        orchestrator::begin_analysis(&mut session).expect_err("nothing selected after reset"),
        OrchestratorError::NoFileSelected
    );
}
