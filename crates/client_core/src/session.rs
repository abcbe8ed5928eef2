use shared::domain::{AnalysisId, ImageKind};
use tracing::debug;

use crate::results::ResultStore;

/// A validated file waiting to be analyzed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImage {
    pub name: String,
    pub kind: ImageKind,
    pub bytes: Vec<u8>,
}

impl SelectedImage {
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// A selected file together with the preview URI derived from it. Bundled so
/// the two can only ever be installed and cleared as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub file: SelectedImage,
    pub preview_uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestState {
    #[default]
    Idle,
    Pending(AnalysisId),
    Failed(String),
}

impl RequestState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadState {
    pub selection: Option<Selection>,
    pub request: RequestState,
}

/// The two pages of the workflow. The results page owns the store outright,
/// so a store cannot exist anywhere else and the upload page cannot carry
/// stale results.
#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    Upload(UploadState),
    Results(ResultStore),
}

/// Root aggregate for one user's analysis workflow. Owned by exactly one
/// caller (the GUI thread or a CLI task) and mutated only through the intake,
/// orchestrator, and store operations.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub(crate) page: Page,
}

impl Session {
    pub fn new() -> Self {
        Self {
            page: Page::Upload(UploadState::default()),
        }
    }

    /// Back to a fresh upload page: selection, request state, and any results
    /// are all discarded. A completion for a request begun before the reset
    /// no longer matches any pending identity and will be dropped.
    pub fn reset(&mut self) {
        debug!("session reset to upload page");
        self.page = Page::Upload(UploadState::default());
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn selection(&self) -> Option<&Selection> {
        match &self.page {
            Page::Upload(upload) => upload.selection.as_ref(),
            Page::Results(_) => None,
        }
    }

    pub fn selected_file(&self) -> Option<&SelectedImage> {
        self.selection().map(|selection| &selection.file)
    }

    pub fn preview_uri(&self) -> Option<&str> {
        self.selection().map(|selection| selection.preview_uri.as_str())
    }

    pub fn is_pending(&self) -> bool {
        matches!(&self.page, Page::Upload(upload) if upload.request.is_pending())
    }

    pub fn pending_id(&self) -> Option<AnalysisId> {
        match &self.page {
            Page::Upload(UploadState {
                request: RequestState::Pending(id),
                ..
            }) => Some(*id),
            _ => None,
        }
    }

    pub fn failure_message(&self) -> Option<&str> {
        match &self.page {
            Page::Upload(UploadState {
                request: RequestState::Failed(message),
                ..
            }) => Some(message),
            _ => None,
        }
    }

    pub fn results(&self) -> Option<&ResultStore> {
        match &self.page {
            Page::Results(store) => Some(store),
            Page::Upload(_) => None,
        }
    }

    pub fn results_mut(&mut self) -> Option<&mut ResultStore> {
        match &mut self.page {
            Page::Results(store) => Some(store),
            Page::Upload(_) => None,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
