use anyhow::Result;
use shared::{domain::{AnalysisId, ImageKind}, protocol::PredictResponse};
use tracing::{debug, info, warn};

use crate::{
    error::OrchestratorError,
    results::ResultStore,
    session::{Page, RequestState, Session},
    transport::InferenceBackend,
};

/// Everything the transport needs to issue one inference request, detached
/// from the session so it can cross a thread boundary.
#[derive(Debug, Clone)]
pub struct AnalysisTicket {
    pub id: AnalysisId,
    pub upload: AnalysisUpload,
}

#[derive(Debug, Clone)]
pub struct AnalysisUpload {
    pub filename: String,
    pub kind: ImageKind,
    pub bytes: Vec<u8>,
}

/// What came back for one request: the parsed response, or the message to
/// show the user. Transport and server failures carry their text verbatim.
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    Success(PredictResponse),
    Failure(String),
}

impl AnalysisOutcome {
    pub fn from_result(result: Result<PredictResponse>) -> Self {
        match result {
            Ok(response) => Self::Success(response),
            Err(error) => Self::Failure(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionDisposition {
    /// The outcome was applied to the session.
    Applied,
    /// The outcome belonged to a superseded or abandoned request and was
    /// dropped without touching the session.
    Stale,
}

/// Starts one analysis: checks the preconditions, marks the request pending
/// under a fresh identity, and returns the ticket to hand to the transport.
/// Single-flight: while a request is pending this returns `AlreadyPending`
/// and has no side effects.
pub fn begin_analysis(session: &mut Session) -> Result<AnalysisTicket, OrchestratorError> {
    let Page::Upload(upload) = &mut session.page else {
        return Err(OrchestratorError::NoFileSelected);
    };
    if upload.request.is_pending() {
        debug!("analyze rejected; a request is already in flight");
        return Err(OrchestratorError::AlreadyPending);
    }
    let Some(selection) = upload.selection.as_ref() else {
        return Err(OrchestratorError::NoFileSelected);
    };

    let id = AnalysisId::new();
    let ticket = AnalysisTicket {
        id,
        upload: AnalysisUpload {
            filename: selection.file.name.clone(),
            kind: selection.file.kind,
            bytes: selection.file.bytes.clone(),
        },
    };
    upload.request = RequestState::Pending(id);
    info!(
        %id,
        file = %ticket.upload.filename,
        size_bytes = ticket.upload.bytes.len(),
        "analysis request started"
    );
    Ok(ticket)
}

/// Applies the outcome of the request identified by `id`. The identity guard
/// makes late completions harmless: if the session was reset or a newer
/// request took over, the outcome is dropped as [`CompletionDisposition::Stale`].
///
/// On success the session moves to the results page and the selection is
/// discarded; on failure the session stays on upload with the selection
/// intact and the message recorded for display.
#[must_use]
pub fn complete_analysis(
    session: &mut Session,
    id: AnalysisId,
    outcome: AnalysisOutcome,
) -> CompletionDisposition {
    let Page::Upload(upload) = &mut session.page else {
        debug!(%id, "dropping analysis outcome; session is on the results page");
        return CompletionDisposition::Stale;
    };
    if upload.request != RequestState::Pending(id) {
        debug!(%id, "dropping analysis outcome for a superseded request");
        return CompletionDisposition::Stale;
    }

    match outcome {
        AnalysisOutcome::Success(response) => match ResultStore::from_response(response) {
            Ok(store) => {
                info!(%id, variants = store.variant_count(), "analysis completed");
                session.page = Page::Results(store);
                CompletionDisposition::Applied
            }
            Err(reason) => {
                warn!(%id, %reason, "analysis response rejected");
                upload.request = RequestState::Failed(reason);
                CompletionDisposition::Applied
            }
        },
        AnalysisOutcome::Failure(message) => {
            warn!(%id, %message, "analysis failed");
            upload.request = RequestState::Failed(message);
            CompletionDisposition::Applied
        }
    }
}

/// Begin, await the backend, complete: the whole round trip for callers that
/// own both the session and the transport on one task. Returns the recorded
/// failure message as `RequestFailed` so shell callers can propagate it.
pub async fn run_analysis(
    session: &mut Session,
    backend: &dyn InferenceBackend,
) -> Result<(), OrchestratorError> {
    let ticket = begin_analysis(session)?;
    let outcome = AnalysisOutcome::from_result(backend.predict(&ticket.upload).await);
    // Begin and complete run on the same task here, so the completion can
    // never be stale.
    let _ = complete_analysis(session, ticket.id, outcome);
    match session.failure_message() {
        Some(message) => Err(OrchestratorError::RequestFailed(message.to_owned())),
        None => Ok(()),
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
