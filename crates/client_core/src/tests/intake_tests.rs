use super::*;

use crate::{
    orchestrator::{self, AnalysisOutcome, CompletionDisposition},
    session::Session,
};

fn encoded_image(format: image::ImageFormat) -> Vec<u8> {
    let pixels = image::RgbImage::from_pixel(4, 4, image::Rgb([20, 120, 40]));
    let mut buffer = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(pixels)
        .write_to(&mut buffer, format)
        .expect("encode test image");
    buffer.into_inner()
}

fn candidate(name: &str, mime: Option<&str>, bytes: Vec<u8>) -> FileCandidate {
    FileCandidate {
        name: name.to_owned(),
        mime_type: mime.map(str::to_owned),
        bytes,
    }
}

#[test]
fn rejects_mime_types_outside_the_whitelist() {
    let mut session = Session::new();
    let png = encoded_image(image::ImageFormat::Png);
    select_file(&mut session, candidate("before.png", Some("image/png"), png))
        .expect("valid selection");
    let previous_preview = session.preview_uri().map(str::to_owned);

    for mime in ["application/pdf", "image/gif", "text/plain", "video/mp4"] {
        let err = select_file(
            &mut session,
            candidate("next.bin", Some(mime), b"irrelevant".to_vec()),
        )
        .expect_err("whitelist must reject");
        assert_eq!(err, ValidationError::UnsupportedType, "mime {mime}");
    }

    assert_eq!(
        session.selected_file().map(|file| file.name.as_str()),
        Some("before.png")
    );
    assert_eq!(session.preview_uri().map(str::to_owned), previous_preview);
}

#[test]
fn valid_selection_installs_preview_and_keeps_the_file_name() {
    let mut session = Session::new();
    let jpeg = encoded_image(image::ImageFormat::Jpeg);

    let preview = select_file(&mut session, candidate("parcel.jpg", Some("image/jpeg"), jpeg))
        .expect("valid jpeg");

    assert!(preview.width > 0 && preview.height > 0);
    assert_eq!(preview.rgba.len(), preview.width * preview.height * 4);
    let file = session.selected_file().expect("file installed");
    assert_eq!(file.name, "parcel.jpg");
    assert_eq!(file.kind, ImageKind::Jpeg);
    let uri = session.preview_uri().expect("preview installed");
    assert!(uri.starts_with("data:image/png;base64,"));
}

#[test]
fn dropped_files_classify_by_extension() {
    let mut session = Session::new();
    let png = encoded_image(image::ImageFormat::Png);

    select_file(&mut session, candidate("field.PNG", None, png)).expect("extension fallback");
    assert_eq!(
        session.selected_file().map(|file| file.kind),
        Some(ImageKind::Png)
    );
}

#[test]
fn bytes_that_do_not_decode_are_unsupported() {
    let mut session = Session::new();
    let err = select_file(
        &mut session,
        candidate(
            "fake.png",
            Some("image/png"),
            b"definitely not a png".to_vec(),
        ),
    )
    .expect_err("garbage bytes");
    assert_eq!(err, ValidationError::UnsupportedType);
    assert!(session.selection().is_none());
}

#[test]
fn oversize_files_are_rejected_before_decoding() {
    let mut session = Session::new();
    let size = (MAX_UPLOAD_BYTES + 1) as usize;
    let err = select_file(
        &mut session,
        candidate("huge.png", Some("image/png"), vec![0u8; size]),
    )
    .expect_err("oversize");
    assert!(matches!(err, ValidationError::FileTooLarge { .. }));
    assert!(session.selection().is_none());
}

#[test]
fn clear_is_refused_while_a_request_is_pending() {
    let mut session = Session::new();
    let png = encoded_image(image::ImageFormat::Png);
    select_file(&mut session, candidate("a.png", Some("image/png"), png)).expect("select");

    let ticket = orchestrator::begin_analysis(&mut session).expect("begin");
    assert!(!clear_selection(&mut session));
    assert!(session.selection().is_some());

    let disposition = orchestrator::complete_analysis(
        &mut session,
        ticket.id,
        AnalysisOutcome::Failure("offline".to_owned()),
    );
    assert_eq!(disposition, CompletionDisposition::Applied);
    assert!(clear_selection(&mut session));
    assert!(session.selection().is_none());
}

#[test]
fn clear_with_no_selection_reports_nothing_to_do() {
    let mut session = Session::new();
    assert!(!clear_selection(&mut session));
}

#[test]
fn replacing_the_selection_while_pending_keeps_the_request() {
    let mut session = Session::new();
    select_file(
        &mut session,
        candidate(
            "first.png",
            Some("image/png"),
            encoded_image(image::ImageFormat::Png),
        ),
    )
    .expect("first selection");
    let ticket = orchestrator::begin_analysis(&mut session).expect("begin");

    select_file(
        &mut session,
        candidate(
            "second.jpg",
            Some("image/jpeg"),
            encoded_image(image::ImageFormat::Jpeg),
        ),
    )
    .expect("replacement selection");

    assert_eq!(session.pending_id(), Some(ticket.id));
    assert_eq!(
        session.selected_file().map(|file| file.name.as_str()),
        Some("second.jpg")
    );
}

#[test]
fn preview_uri_round_trips_through_the_data_uri() {
    let mut session = Session::new();
    let png = encoded_image(image::ImageFormat::Png);
    select_file(&mut session, candidate("roundtrip.png", Some("image/png"), png))
        .expect("select");

    let uri = session.preview_uri().expect("preview");
    let payload = uri
        .strip_prefix("data:image/png;base64,")
        .expect("data uri prefix");
    let decoded = STANDARD.decode(payload).expect("valid base64");
    assert!(image::load_from_memory(&decoded).is_ok());
}
