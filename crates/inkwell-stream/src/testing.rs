//! Scripted completion sources for tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use inkwell_types::generation::GenerationRequest;

use crate::completion::{CompletionError, CompletionSource, FragmentStream};

#[derive(Debug, Clone)]
pub enum Step {
    /// Produce one fragment.
    Emit(String),
    /// Fail the feed.
    Fail(String),
    /// Never produce anything again.
    Hang,
}

/// A [`CompletionSource`] that plays back a fixed script and records how it
/// was used.
#[derive(Default)]
pub struct ScriptedSource {
    steps: Vec<Step>,
    open_error: Option<String>,
    opens: AtomicUsize,
    pulled: Arc<AtomicUsize>,
    released: Arc<AtomicBool>,
}

struct ReleaseGuard(Arc<AtomicBool>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl ScriptedSource {
    pub fn fragments<I, T>(fragments: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::with_steps(fragments.into_iter().map(|f| Step::Emit(f.into())).collect())
    }

    pub fn with_steps(steps: Vec<Step>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    pub fn failing_on_open(message: &str) -> Self {
        Self {
            open_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// How many times a feed was opened.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// How many fragments the feed has produced so far.
    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }

    /// Whether the most recently opened feed has been dropped.
    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionSource for ScriptedSource {
    async fn open(&self, _request: &GenerationRequest) -> Result<FragmentStream, CompletionError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.open_error {
            return Err(CompletionError::Status {
                status: 503,
                body: message.clone(),
            });
        }

        self.released.store(false, Ordering::SeqCst);
        let steps = self.steps.clone();
        let pulled = self.pulled.clone();
        let guard = ReleaseGuard(self.released.clone());

        Ok(Box::pin(async_stream::stream! {
            let _guard = guard;
            for step in steps {
                match step {
                    Step::Emit(fragment) => {
                        pulled.fetch_add(1, Ordering::SeqCst);
                        yield Ok(fragment);
                    }
                    Step::Fail(message) => {
                        yield Err(CompletionError::Stream(message));
                        return;
                    }
                    Step::Hang => futures_util::future::pending::<()>().await,
                }
            }
        }))
    }
}
