//! Headless companions to the desktop client: `analyze` drives one full
//! analysis from the shell, `mock-server` stands in for the inference
//! service during demos and manual testing.

use std::{net::SocketAddr, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use axum::{
    extract::Multipart,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use tracing::info;

use client_core::{
    intake::{self, FileCandidate},
    orchestrator,
    results::{self, summary_lines},
    HttpInferenceClient, InferenceBackend, Session,
};
use shared::{
    domain::ImageRef,
    protocol::{ConfidenceResult, PredictResponse, TreeStats},
};

#[derive(Parser, Debug)]
#[command(name = "greenvision-tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit one image for analysis and print the detection report.
    Analyze {
        /// JPEG or PNG satellite image to analyze.
        image: PathBuf,
        #[arg(long, default_value = "http://127.0.0.1:8000")]
        server_url: String,
        /// Threshold to report on; defaults to the store's own selection.
        #[arg(long)]
        confidence: Option<f64>,
        /// Save the annotated image for the reported threshold here.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run a stand-in inference service on `POST /api/predict`.
    MockServer {
        #[arg(long, default_value = "127.0.0.1:8000")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cli = Cli::parse();
    match cli.command {
        Command::Analyze {
            image,
            server_url,
            confidence,
            output,
        } => analyze(image, &server_url, confidence, output).await,
        Command::MockServer { bind } => mock_server(&bind).await,
    }
}

async fn analyze(
    image: PathBuf,
    server_url: &str,
    confidence: Option<f64>,
    output: Option<PathBuf>,
) -> Result<()> {
    let bytes = tokio::fs::read(&image)
        .await
        .with_context(|| format!("failed to read {}", image.display()))?;
    let name = image
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("image path has no file name"))?;

    let mut session = Session::new();
    intake::select_file(
        &mut session,
        FileCandidate {
            name,
            mime_type: None,
            bytes,
        },
    )
    .map_err(|error| anyhow!("{error}"))?;

    let backend = HttpInferenceClient::from_base_url(server_url)?;
    orchestrator::run_analysis(&mut session, &backend)
        .await
        .map_err(|error| anyhow!("analysis failed: {error}"))?;

    let store = session
        .results_mut()
        .ok_or_else(|| anyhow!("analysis finished without results"))?;
    if let Some(confidence) = confidence {
        store
            .select(confidence)
            .map_err(|error| anyhow!("{error}"))?;
    }
    let store = &*store;

    println!(
        "Confidence {:.0}% ({} of {} thresholds)",
        store.selected_confidence() * 100.0,
        store.selected_index() + 1,
        store.variant_count()
    );
    if let Some(seconds) = store.processing_time() {
        println!("Processing completed in {seconds:.2}s");
    }
    println!();
    for stat in results::project(store).stats {
        println!(
            "{:<24} {:>10} {}",
            stat.label,
            stat.display_value(),
            stat.unit
        );
    }
    println!();
    for line in summary_lines(&store.current().stats) {
        println!("{line}");
    }

    if let Some(path) = output {
        let annotated = backend.fetch_image(&store.current().image).await?;
        tokio::fs::write(&path, annotated)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!();
        println!("Saved annotated image to {}", path.display());
    }
    Ok(())
}

async fn mock_server(bind: &str) -> Result<()> {
    let app = Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/predict", post(mock_predict));

    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address {bind}"))?;
    info!(%addr, "mock inference service listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

const MOCK_THRESHOLDS: [f64; 4] = [0.2, 0.5, 0.8, 0.95];

/// Echoes the uploaded image back as the "annotated" visualization and
/// fabricates counts that shrink as the threshold climbs, keyed off the
/// upload size so repeated runs with the same file are stable.
async fn mock_predict(
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, (StatusCode, String)> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| (StatusCode::BAD_REQUEST, error.to_string()))?
    {
        if field.name() == Some("image") {
            let mime = field.content_type().unwrap_or("image/jpeg").to_owned();
            let bytes = field
                .bytes()
                .await
                .map_err(|error| (StatusCode::BAD_REQUEST, error.to_string()))?;
            upload = Some((mime, bytes.to_vec()));
        }
    }
    let Some((mime, bytes)) = upload else {
        return Err((
            StatusCode::BAD_REQUEST,
            "multipart field 'image' is required".to_owned(),
        ));
    };
    if bytes.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "image is empty".to_owned()));
    }

    let image = ImageRef::from(format!("data:{mime};base64,{}", STANDARD.encode(&bytes)));
    let seed = (bytes.len() % 211) as u32 + 40;
    let results = MOCK_THRESHOLDS
        .iter()
        .map(|&confidence| {
            // Higher thresholds keep fewer detections.
            let keep = 1.0 - confidence * 0.6;
            let individual = (f64::from(seed) * keep) as u32;
            let clusters = (individual / 12).max(1);
            let in_clusters = clusters * 9;
            ConfidenceResult {
                confidence,
                image: image.clone(),
                stats: TreeStats {
                    total_trees: individual + in_clusters,
                    individual_trees: individual,
                    cluster_count: clusters,
                    trees_in_clusters: in_clusters,
                    density_per_area: f64::from(individual + in_clusters) / 2800.0,
                    green_coverage_area: (f64::from(seed) * keep * 0.31).min(96.0),
                },
            }
        })
        .collect();

    Ok(Json(PredictResponse {
        results,
        processing_time: Some(1.42),
    }))
}
