use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} request rejected: {message}")]
    Rejected { kind: &'static str, message: String },
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("{kind} record has no remote id")]
    MissingId { kind: &'static str },
}
