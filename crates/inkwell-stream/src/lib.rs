//! Streaming generation pipeline.
//!
//! A [`CompletionSource`] produces text fragments, the [`relay`] forwards them
//! as an ordered byte stream, an [`IncrementalConsumer`] accumulates that
//! stream on the reading side, and [`extract`] splits the finished text into a
//! title and body.

pub mod completion;
pub mod consumer;
pub mod decoder;
pub mod extract;
pub mod openai;
pub mod relay;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use completion::{CompletionError, CompletionSource, FragmentStream};
pub use consumer::{Advance, ConsumerStatus, GenerationOutcome, IncrementalConsumer};
pub use decoder::Utf8Decoder;
pub use extract::{ExtractError, ExtractedDraft, extract};
pub use relay::{GenerationSession, RelayError, RelayStream, SessionState};
