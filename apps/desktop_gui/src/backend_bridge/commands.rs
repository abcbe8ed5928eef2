//! Worker commands queued from UI to the analysis worker.

use client_core::orchestrator::AnalysisTicket;
use shared::domain::ImageRef;
use std::path::PathBuf;

pub enum WorkerCommand {
    LoadFile {
        path: PathBuf,
    },
    LoadBytes {
        name: String,
        mime_type: Option<String>,
        bytes: Vec<u8>,
    },
    Analyze {
        server_url: String,
        ticket: AnalysisTicket,
    },
    FetchAnnotated {
        server_url: String,
        index: usize,
        image: ImageRef,
    },
}
