use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("not authenticated")]
    Auth,

    #[error("forbidden")]
    Forbidden,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("payload too large")]
    PayloadTooLarge,

    /// The server could not start a generation. Nothing was streamed.
    #[error("generation never started: {0}")]
    GenerationFailed(String),

    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },
}
