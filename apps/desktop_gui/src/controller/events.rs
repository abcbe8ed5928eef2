//! Events flowing from the analysis worker back to the GUI thread.

use client_core::intake::SelectionReady;
use client_core::orchestrator::AnalysisOutcome;
use client_core::ValidationError;
use shared::domain::AnalysisId;

use crate::media;

pub enum UiEvent {
    Info(String),
    WorkerFailed(String),
    SelectionPrepared(SelectionReady),
    SelectionRejected(ValidationError),
    AnalysisFinished {
        id: AnalysisId,
        outcome: AnalysisOutcome,
    },
    AnnotatedReady {
        index: usize,
        bytes: Vec<u8>,
    },
    AnnotatedFailed {
        index: usize,
        message: String,
    },
}

/// Banner text for a refused candidate. The type-check wording matches the
/// hint shown on the upload page.
pub fn selection_rejection_message(error: &ValidationError) -> String {
    match error {
        ValidationError::UnsupportedType => "Please upload a JPG or PNG image".to_string(),
        ValidationError::FileTooLarge {
            size_bytes,
            limit_bytes,
        } => format!(
            "This image is {}; the limit is {}",
            media::human_readable_bytes(*size_bytes),
            media::human_readable_bytes(*limit_bytes)
        ),
    }
}
