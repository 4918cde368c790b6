//! Stream relay: forwards completion fragments to a single downstream reader.
//!
//! The relay is pull-based. The next upstream fragment is awaited only when the
//! downstream polls for more, so a slow reader applies backpressure all the way
//! to the completion source, and dropping the relay stream drops the upstream
//! feed with it.

use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use inkwell_types::generation::GenerationRequest;

use crate::completion::{CompletionError, CompletionSource, FragmentStream};

#[derive(Debug, Error)]
pub enum RelayError {
    /// Nothing was emitted; the caller can still get a clean failure status.
    #[error("generation failed before any output: {0}")]
    Preflight(#[source] CompletionError),

    /// Output was already emitted; the byte stream is cut short.
    #[error("generation failed after {bytes_sent} bytes: {source}")]
    MidStream {
        bytes_sent: usize,
        #[source]
        source: CompletionError,
    },
}

pub type RelayStream = Pin<Box<dyn Stream<Item = Result<Bytes, RelayError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    InProgress,
    Completed,
    Failed,
}

/// One generation, from acceptance to a terminal state. Owned by the relay.
pub struct GenerationSession {
    id: Uuid,
    feed: FragmentStream,
    buffer: String,
    fragments: usize,
    state: SessionState,
}

impl GenerationSession {
    fn new(feed: FragmentStream) -> Self {
        Self {
            id: Uuid::new_v4(),
            feed,
            buffer: String::new(),
            fragments: 0,
            state: SessionState::InProgress,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Text forwarded so far.
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Next non-empty fragment, skipping empty ones.
    async fn next_fragment(&mut self) -> Option<Result<String, CompletionError>> {
        loop {
            match self.feed.next().await {
                Some(Ok(fragment)) if fragment.is_empty() => continue,
                other => return other,
            }
        }
    }

    fn record(&mut self, fragment: &str) {
        self.buffer.push_str(fragment);
        self.fragments += 1;
    }

    fn complete(&mut self) {
        self.state = SessionState::Completed;
        info!(
            "Session {} completed: {} fragments, {} bytes",
            self.id,
            self.fragments,
            self.buffer.len()
        );
    }

    fn fail(&mut self, err: &CompletionError) {
        self.state = SessionState::Failed;
        error!(
            "Session {} failed after {} bytes: {}",
            self.id,
            self.buffer.len(),
            err
        );
    }
}

impl Drop for GenerationSession {
    fn drop(&mut self) {
        if self.state == SessionState::InProgress {
            warn!(
                "Session {} abandoned by reader after {} bytes, upstream released",
                self.id,
                self.buffer.len()
            );
        }
    }
}

/// Open a relay session for `request`.
///
/// Fails with [`RelayError::Preflight`] if the source cannot be opened or
/// errors before producing any text. Otherwise returns the byte stream: each
/// non-empty fragment in upstream order, ending cleanly on completion or with
/// a single [`RelayError::MidStream`] item on a later upstream failure.
pub async fn open(
    source: &dyn CompletionSource,
    request: &GenerationRequest,
) -> Result<RelayStream, RelayError> {
    let feed = source.open(request).await.map_err(|e| {
        error!("Completion source failed to open for '{}': {}", request.topic, e);
        RelayError::Preflight(e)
    })?;

    let mut session = GenerationSession::new(feed);
    info!(
        "Session {} started: topic='{}' tone={} length={}",
        session.id,
        request.topic,
        request.tone,
        request.length.as_str()
    );

    let first = match session.next_fragment().await {
        Some(Ok(fragment)) => Some(fragment),
        Some(Err(e)) => {
            session.fail(&e);
            return Err(RelayError::Preflight(e));
        }
        None => None,
    };

    Ok(Box::pin(async_stream::stream! {
        let mut session = session;

        let Some(first) = first else {
            session.complete();
            return;
        };
        session.record(&first);
        yield Ok(Bytes::from(first));

        while let Some(item) = session.next_fragment().await {
            match item {
                Ok(fragment) => {
                    session.record(&fragment);
                    yield Ok(Bytes::from(fragment));
                }
                Err(e) => {
                    session.fail(&e);
                    // Return Pending once so the server flushes the bytes
                    // already forwarded before the error aborts the body.
                    tokio::task::yield_now().await;
                    yield Err(RelayError::MidStream {
                        bytes_sent: session.text().len(),
                        source: e,
                    });
                    return;
                }
            }
        }

        session.complete();
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedSource, Step};
    use inkwell_types::models::{Length, Tone};

    fn request() -> GenerationRequest {
        GenerationRequest::new("Cats", Tone::Casual, Length::Short)
    }

    #[tokio::test]
    async fn forwards_non_empty_fragments_in_order() {
        let source = ScriptedSource::fragments(["", "Title", "", "\n\n", "Body", ""]);
        let stream = open(&source, &request()).await.unwrap();
        let chunks: Vec<Bytes> = stream.map(|r| r.unwrap()).collect().await;
        assert_eq!(
            chunks,
            vec![
                Bytes::from("Title"),
                Bytes::from("\n\n"),
                Bytes::from("Body")
            ]
        );
    }

    #[tokio::test]
    async fn open_failure_is_preflight() {
        let source = ScriptedSource::failing_on_open("no key");
        let result = open(&source, &request()).await;
        assert!(matches!(result, Err(RelayError::Preflight(_))));
    }

    #[tokio::test]
    async fn error_before_any_text_is_preflight() {
        let source = ScriptedSource::with_steps(vec![
            Step::Emit(String::new()),
            Step::Fail("overloaded".into()),
        ]);
        let result = open(&source, &request()).await;
        assert!(matches!(result, Err(RelayError::Preflight(_))));
    }

    #[tokio::test]
    async fn error_after_text_cuts_stream_short() {
        let source = ScriptedSource::with_steps(vec![
            Step::Emit("Hello".into()),
            Step::Emit(" there".into()),
            Step::Fail("connection reset".into()),
            Step::Emit("never".into()),
        ]);
        let items: Vec<_> = open(&source, &request()).await.unwrap().collect().await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap(), &Bytes::from("Hello"));
        assert_eq!(items[1].as_ref().unwrap(), &Bytes::from(" there"));
        match &items[2] {
            Err(RelayError::MidStream { bytes_sent, .. }) => assert_eq!(*bytes_sent, 11),
            other => panic!("unexpected item: {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_generation_completes_without_output() {
        let source = ScriptedSource::fragments(["", ""]);
        let items: Vec<_> = open(&source, &request()).await.unwrap().collect().await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn dropping_the_stream_releases_upstream() {
        let source = ScriptedSource::with_steps(vec![Step::Emit("Partial".into()), Step::Hang]);
        let mut stream = open(&source, &request()).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), Bytes::from("Partial"));
        assert!(!source.released());

        drop(stream);
        assert!(source.released());
    }

    #[tokio::test]
    async fn upstream_is_only_pulled_when_polled() {
        let source = ScriptedSource::with_steps(vec![
            Step::Emit("one".into()),
            Step::Emit("two".into()),
            Step::Emit("three".into()),
        ]);
        let mut stream = open(&source, &request()).await.unwrap();
        // Opening primes exactly one fragment.
        assert_eq!(source.pulled(), 1);
        stream.next().await;
        assert_eq!(source.pulled(), 1);
        stream.next().await;
        assert_eq!(source.pulled(), 2);
    }
}
