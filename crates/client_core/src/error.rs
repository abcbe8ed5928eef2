use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported file type; only JPEG and PNG images are accepted")]
    UnsupportedType,
    #[error("file is {size_bytes} bytes; the upload limit is {limit_bytes} bytes")]
    FileTooLarge { size_bytes: u64, limit_bytes: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    #[error("no image selected")]
    NoFileSelected,
    #[error("an analysis request is already in flight")]
    AlreadyPending,
    #[error("{0}")]
    RequestFailed(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("confidence {0} is not one of the available thresholds")]
    UnknownConfidence(f64),
}
