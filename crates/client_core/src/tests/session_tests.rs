use super::*;

use shared::{
    domain::{AnalysisId, ImageRef},
    protocol::{ConfidenceResult, PredictResponse, TreeStats},
};

fn variant(confidence: f64) -> ConfidenceResult {
    ConfidenceResult {
        confidence,
        image: ImageRef::from("data:image/png;base64,QQ=="),
        stats: TreeStats {
            total_trees: 100,
            individual_trees: 60,
            cluster_count: 5,
            trees_in_clusters: 40,
            density_per_area: 0.4,
            green_coverage_area: 52.5,
        },
    }
}

fn results_session() -> Session {
    let store = ResultStore::from_response(PredictResponse {
        results: vec![variant(0.2), variant(0.8)],
        processing_time: Some(1.5),
    })
    .expect("valid store");
    Session {
        page: Page::Results(store),
    }
}

#[test]
fn new_session_is_an_empty_upload_page() {
    let session = Session::new();
    assert!(matches!(session.page(), Page::Upload(_)));
    assert!(session.selection().is_none());
    assert!(session.preview_uri().is_none());
    assert!(!session.is_pending());
    assert!(session.failure_message().is_none());
    assert!(session.results().is_none());
}

#[test]
fn reset_from_results_restores_the_initial_shape() {
    let mut session = results_session();
    assert!(session.results().is_some());

    session.reset();

    assert_eq!(session, Session::new());
    assert!(session.results().is_none());
    assert!(session.selection().is_none());
    assert!(session.preview_uri().is_none());
}

#[test]
fn reset_discards_a_recorded_failure() {
    let mut session = Session::new();
    match &mut session.page {
        Page::Upload(upload) => upload.request = RequestState::Failed("boom".to_owned()),
        Page::Results(_) => unreachable!(),
    }
    assert_eq!(session.failure_message(), Some("boom"));

    session.reset();
    assert!(session.failure_message().is_none());
}

#[test]
fn request_state_defaults_to_idle() {
    assert_eq!(RequestState::default(), RequestState::Idle);
    assert!(!RequestState::Idle.is_pending());
    assert!(RequestState::Pending(AnalysisId::new()).is_pending());
    assert!(!RequestState::Failed("oops".to_owned()).is_pending());
}

#[test]
fn accessors_only_expose_what_the_page_carries() {
    let session = results_session();
    assert!(session.selection().is_none());
    assert!(session.selected_file().is_none());
    assert!(session.preview_uri().is_none());
    assert!(!session.is_pending());
    assert!(session.pending_id().is_none());
    assert!(session.failure_message().is_none());
    assert_eq!(session.results().map(|store| store.variant_count()), Some(2));
}
