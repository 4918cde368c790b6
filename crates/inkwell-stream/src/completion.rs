use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use thiserror::Error;

use inkwell_types::generation::GenerationRequest;

/// Errors raised by a completion source, either while opening the feed or
/// while it is being read.
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    #[error("request to completion service failed: {0}")]
    Request(String),

    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("completion stream error: {0}")]
    Stream(String),

    #[error("completion service error: {0}")]
    Api(String),

    #[error("completion stream closed before it was done")]
    Truncated,
}

/// Ordered feed of text fragments. Ends cleanly on completion; an `Err` item
/// is terminal.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, CompletionError>> + Send>>;

/// Upstream producer of generated text.
#[async_trait]
pub trait CompletionSource: Send + Sync {
    /// Open a fragment feed for one generation session.
    async fn open(&self, request: &GenerationRequest) -> Result<FragmentStream, CompletionError>;
}
