use std::fmt::Display;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::decoder::Utf8Decoder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerStatus {
    Streaming,
    Completed,
    /// The stream broke off. The buffer holds whatever arrived before.
    Failed(String),
}

/// Result of one [`IncrementalConsumer::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Appended,
    Finished,
    Failed,
}

/// Terminal result of reading a generation stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Completed(String),
    /// Generation stopped partway. The partial text is kept for display but is
    /// not a finished artifact.
    Interrupted { partial: String, reason: String },
}

impl GenerationOutcome {
    pub fn text(&self) -> &str {
        match self {
            GenerationOutcome::Completed(text) => text,
            GenerationOutcome::Interrupted { partial, .. } => partial,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, GenerationOutcome::Completed(_))
    }
}

/// Reads a generation byte stream in arrival order into a running text buffer.
///
/// Cancelling is dropping the consumer: nothing is reported and nothing
/// further is read.
pub struct IncrementalConsumer<S> {
    stream: S,
    decoder: Utf8Decoder,
    buffer: String,
    chunks: usize,
    status: ConsumerStatus,
}

impl<S, E> IncrementalConsumer<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            decoder: Utf8Decoder::new(),
            buffer: String::new(),
            chunks: 0,
            status: ConsumerStatus::Streaming,
        }
    }

    /// Everything decoded so far.
    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn status(&self) -> &ConsumerStatus {
        &self.status
    }

    /// Read the next chunk and append it to the buffer.
    pub async fn advance(&mut self) -> Advance {
        match self.status {
            ConsumerStatus::Completed => return Advance::Finished,
            ConsumerStatus::Failed(_) => return Advance::Failed,
            ConsumerStatus::Streaming => {}
        }

        match self.stream.next().await {
            Some(Ok(chunk)) => {
                let text = self.decoder.decode(&chunk);
                self.buffer.push_str(&text);
                self.chunks += 1;
                Advance::Appended
            }
            Some(Err(e)) => {
                // A dangling partial character is dropped, not guessed at.
                self.decoder = Utf8Decoder::new();
                warn!(
                    "Generation stream broke off after {} chunks ({} bytes): {}",
                    self.chunks,
                    self.buffer.len(),
                    e
                );
                self.status = ConsumerStatus::Failed(e.to_string());
                Advance::Failed
            }
            None => {
                let tail = self.decoder.finish();
                self.buffer.push_str(&tail);
                self.status = ConsumerStatus::Completed;
                debug!(
                    "Generation stream finished: {} chunks, {} bytes",
                    self.chunks,
                    self.buffer.len()
                );
                Advance::Finished
            }
        }
    }

    /// Read to the end, calling `on_progress` with the whole buffer after
    /// every chunk.
    pub async fn run<F>(mut self, mut on_progress: F) -> GenerationOutcome
    where
        F: FnMut(&str),
    {
        while self.advance().await == Advance::Appended {
            on_progress(&self.buffer);
        }
        self.into_outcome()
    }

    pub fn into_outcome(self) -> GenerationOutcome {
        match self.status {
            ConsumerStatus::Completed => GenerationOutcome::Completed(self.buffer),
            ConsumerStatus::Failed(reason) => GenerationOutcome::Interrupted {
                partial: self.buffer,
                reason,
            },
            ConsumerStatus::Streaming => GenerationOutcome::Interrupted {
                partial: self.buffer,
                reason: "stream not read to the end".into(),
            },
        }
    }
}
