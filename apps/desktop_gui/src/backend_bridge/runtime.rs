//! Worker thread that drains the UI command queue and talks to the
//! inference service on a dedicated tokio runtime.

use std::thread;

use crossbeam_channel::{Receiver, Sender};
use url::Url;

use client_core::intake::{self, FileCandidate};
use client_core::orchestrator::AnalysisOutcome;
use client_core::transport::{HttpInferenceClient, InferenceBackend};

use crate::backend_bridge::commands::WorkerCommand;
use crate::controller::events::UiEvent;

pub fn launch(cmd_rx: Receiver<WorkerCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::WorkerFailed(format!(
                    "Analysis worker failed to start: {err}"
                )));
                tracing::error!("failed to build worker runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let http = reqwest::Client::new();
            let _ = ui_tx.try_send(UiEvent::Info("Ready".to_string()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    WorkerCommand::LoadFile { path } => {
                        let name = path
                            .file_name()
                            .map(|name| name.to_string_lossy().into_owned())
                            .unwrap_or_else(|| "image".to_string());
                        match tokio::fs::read(&path).await {
                            Ok(bytes) => deliver_candidate(&ui_tx, name, None, bytes),
                            Err(err) => {
                                tracing::warn!(path = %path.display(), "file read failed: {err}");
                                let _ = ui_tx.try_send(UiEvent::Info(format!(
                                    "Could not read {}: {err}",
                                    path.display()
                                )));
                            }
                        }
                    }
                    WorkerCommand::LoadBytes {
                        name,
                        mime_type,
                        bytes,
                    } => {
                        deliver_candidate(&ui_tx, name, mime_type, bytes);
                    }
                    WorkerCommand::Analyze { server_url, ticket } => {
                        let id = ticket.id;
                        let client = match inference_client(&http, &server_url) {
                            Ok(client) => client,
                            Err(message) => {
                                let _ = ui_tx.try_send(UiEvent::AnalysisFinished {
                                    id,
                                    outcome: AnalysisOutcome::Failure(message),
                                });
                                continue;
                            }
                        };
                        let ui_tx = ui_tx.clone();
                        tokio::spawn(async move {
                            tracing::debug!(%id, "worker: analyze");
                            let outcome =
                                AnalysisOutcome::from_result(client.predict(&ticket.upload).await);
                            let _ = ui_tx.try_send(UiEvent::AnalysisFinished { id, outcome });
                        });
                    }
                    WorkerCommand::FetchAnnotated {
                        server_url,
                        index,
                        image,
                    } => {
                        let client = match inference_client(&http, &server_url) {
                            Ok(client) => client,
                            Err(message) => {
                                let _ =
                                    ui_tx.try_send(UiEvent::AnnotatedFailed { index, message });
                                continue;
                            }
                        };
                        let ui_tx = ui_tx.clone();
                        tokio::spawn(async move {
                            tracing::debug!(index, "worker: fetch annotated image");
                            match client.fetch_image(&image).await {
                                Ok(bytes) => {
                                    let _ =
                                        ui_tx.try_send(UiEvent::AnnotatedReady { index, bytes });
                                }
                                Err(err) => {
                                    let _ = ui_tx.try_send(UiEvent::AnnotatedFailed {
                                        index,
                                        message: err.to_string(),
                                    });
                                }
                            }
                        });
                    }
                }
            }
        });
    });
}

fn inference_client(
    http: &reqwest::Client,
    server_url: &str,
) -> Result<HttpInferenceClient, String> {
    match Url::parse(server_url.trim()) {
        Ok(base_url) => Ok(HttpInferenceClient::new(http.clone(), base_url)),
        Err(err) => Err(format!("invalid server URL {server_url}: {err}")),
    }
}

// Validation and preview rendering run inline on this thread; the network
// futures above are the only work that needs the runtime's workers.
fn deliver_candidate(
    ui_tx: &Sender<UiEvent>,
    name: String,
    mime_type: Option<String>,
    bytes: Vec<u8>,
) {
    let candidate = FileCandidate {
        name,
        mime_type,
        bytes,
    };
    match intake::prepare_selection(candidate) {
        Ok(ready) => {
            let _ = ui_tx.try_send(UiEvent::SelectionPrepared(ready));
        }
        Err(error) => {
            let _ = ui_tx.try_send(UiEvent::SelectionRejected(error));
        }
    }
}
