use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::domain::ImageKind;
use tracing::{debug, warn};

use crate::{
    error::ValidationError,
    session::{Page, SelectedImage, Selection, Session},
};

/// Limit advertised on the upload page.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

const PREVIEW_MAX_EDGE: u32 = 1024;

/// A file as it arrives from the picker or a drop: declared MIME type when
/// the source supplies one, otherwise classified from the file name.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Downscaled RGBA pixels backing the preview, sized for direct texture
/// upload by a GUI caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

/// A candidate that passed validation: the selection to install plus the
/// decoded preview pixels for callers that render them.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionReady {
    pub selection: Selection,
    pub preview: PreviewImage,
}

/// Validates one candidate and renders its preview. Pure with respect to the
/// session, so it can run on a worker thread; on any error the caller's
/// existing selection stays as it was.
pub fn prepare_selection(candidate: FileCandidate) -> Result<SelectionReady, ValidationError> {
    let kind = classify(&candidate)?;
    let size_bytes = candidate.bytes.len() as u64;
    if size_bytes > MAX_UPLOAD_BYTES {
        return Err(ValidationError::FileTooLarge {
            size_bytes,
            limit_bytes: MAX_UPLOAD_BYTES,
        });
    }

    // Decoding proves the bytes really are a supported image; a file with an
    // image extension but arbitrary contents fails here.
    let (preview, preview_uri) = render_preview(&candidate.bytes).ok_or_else(|| {
        warn!(file = %candidate.name, "candidate claims an image type but does not decode");
        ValidationError::UnsupportedType
    })?;

    debug!(
        file = %candidate.name,
        size_bytes,
        preview_width = preview.width,
        preview_height = preview.height,
        "candidate accepted"
    );
    Ok(SelectionReady {
        selection: Selection {
            file: SelectedImage {
                name: candidate.name,
                kind,
                bytes: candidate.bytes,
            },
            preview_uri,
        },
        preview,
    })
}

/// Installs a prepared selection, replacing any previous one. Replacing is
/// allowed even while a request is pending; only clearing is gated. Prepared
/// selections landing after navigation to the results page are dropped.
pub fn apply_selection(session: &mut Session, selection: Selection) {
    match &mut session.page {
        Page::Upload(upload) => {
            upload.selection = Some(selection);
        }
        Page::Results(_) => {
            warn!("dropping prepared selection; session already on results page");
        }
    }
}

/// Picker and drag-drop both funnel through this: validate, render the
/// preview, install. GUI callers split the steps across threads instead.
pub fn select_file(
    session: &mut Session,
    candidate: FileCandidate,
) -> Result<PreviewImage, ValidationError> {
    let SelectionReady { selection, preview } = prepare_selection(candidate)?;
    apply_selection(session, selection);
    Ok(preview)
}

/// Empties the selection and its preview together. Refused (returns `false`)
/// while a request is in flight; also `false` when there was nothing to
/// clear.
pub fn clear_selection(session: &mut Session) -> bool {
    match &mut session.page {
        Page::Upload(upload) => {
            if upload.request.is_pending() {
                debug!("clear refused while a request is pending");
                return false;
            }
            upload.selection.take().is_some()
        }
        Page::Results(_) => false,
    }
}

fn classify(candidate: &FileCandidate) -> Result<ImageKind, ValidationError> {
    if let Some(mime) = candidate.mime_type.as_deref() {
        return ImageKind::from_mime(mime).ok_or(ValidationError::UnsupportedType);
    }
    mime_guess::from_path(&candidate.name)
        .first_raw()
        .and_then(ImageKind::from_mime)
        .ok_or(ValidationError::UnsupportedType)
}

fn render_preview(bytes: &[u8]) -> Option<(PreviewImage, String)> {
    let decoded = image::load_from_memory(bytes).ok()?;
    let resized = decoded.thumbnail(PREVIEW_MAX_EDGE, PREVIEW_MAX_EDGE);

    let mut encoded = Cursor::new(Vec::new());
    resized.write_to(&mut encoded, image::ImageFormat::Png).ok()?;
    let uri = format!(
        "data:image/png;base64,{}",
        STANDARD.encode(encoded.get_ref())
    );

    let rgba = resized.to_rgba8();
    let width = rgba.width() as usize;
    let height = rgba.height() as usize;
    Some((
        PreviewImage {
            width,
            height,
            rgba: rgba.into_raw(),
        },
        uri,
    ))
}

#[cfg(test)]
#[path = "tests/intake_tests.rs"]
mod tests;
