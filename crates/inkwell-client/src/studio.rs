use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use inkwell_stream::{Advance, ExtractError, GenerationOutcome, extract};
use inkwell_types::api::CreatePostRequest;
use inkwell_types::generation::GenerationRequest;
use inkwell_types::models::{Post, PostStatus};

use crate::client::InkwellClient;
use crate::error::ClientError;

/// How a finished generation is stored.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    pub status: PostStatus,
    pub cover_image: Option<String>,
}

#[derive(Debug, Clone)]
pub enum SaveOutcome {
    Saved(Post),
    /// The generation completed but produced only whitespace.
    NothingToSave,
    /// The stream broke off. `partial` is for display only.
    Incomplete { partial: String, reason: String },
    Cancelled,
}

/// Drives one generation from request to stored post.
pub struct Studio {
    client: InkwellClient,
}

impl Studio {
    pub fn new(client: InkwellClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &InkwellClient {
        &self.client
    }

    /// Generate, read the stream to its end while reporting progress, then
    /// split out a title and save the post.
    ///
    /// Only a completed, non-empty generation is saved. Cancelling stops the
    /// read immediately and drops the connection.
    pub async fn generate_and_save<F>(
        &self,
        request: &GenerationRequest,
        options: SaveOptions,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<SaveOutcome, ClientError>
    where
        F: FnMut(&str),
    {
        let mut consumer = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(SaveOutcome::Cancelled),
            consumer = self.client.generate(request) => consumer?,
        };

        loop {
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                step = consumer.advance() => Some(step),
            };
            match step {
                Some(Advance::Appended) => on_progress(consumer.text()),
                Some(Advance::Finished | Advance::Failed) => break,
                None => {
                    info!("Generation for '{}' cancelled after {} bytes", request.topic, consumer.text().len());
                    return Ok(SaveOutcome::Cancelled);
                }
            }
        }

        let text = match consumer.into_outcome() {
            GenerationOutcome::Completed(text) => text,
            GenerationOutcome::Interrupted { partial, reason } => {
                warn!("Generation for '{}' incomplete: {}", request.topic, reason);
                return Ok(SaveOutcome::Incomplete { partial, reason });
            }
        };

        let draft = match extract(&text, &request.topic) {
            Ok(draft) => draft,
            Err(ExtractError::EmptyContent) => {
                info!("Generation for '{}' produced no text, nothing saved", request.topic);
                return Ok(SaveOutcome::NothingToSave);
            }
        };

        if cancel.is_cancelled() {
            return Ok(SaveOutcome::Cancelled);
        }

        let post = self
            .client
            .create_post(&CreatePostRequest {
                title: draft.title,
                content: draft.body,
                tone: Some(request.tone),
                cover_image: options.cover_image,
                status: Some(options.status),
            })
            .await?;

        info!("Saved generated post {} ('{}')", post.id, post.slug);
        Ok(SaveOutcome::Saved(post))
    }
}
