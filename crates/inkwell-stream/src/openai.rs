use std::fmt::Display;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace, warn};

use inkwell_types::generation::GenerationRequest;

use crate::completion::{CompletionError, CompletionSource, FragmentStream};

const CHAT_COMPLETION_CHUNK_OBJECT: &str = "chat.completion.chunk";
const DONE_SENTINEL: &str = "[DONE]";

const SYSTEM_PROMPT: &str = "You are an expert blog writer. Write clear, engaging blog posts.";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
        }
    }
}

/// Streams chat completions from an OpenAI-compatible endpoint.
pub struct OpenAiCompletions {
    http: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiCompletions {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChunkData {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// The user prompt: tone, topic, target length and the layout the extraction
/// step relies on (title alone on the first line).
pub fn user_prompt(request: &GenerationRequest) -> String {
    let tone = request.tone.as_str().to_lowercase();
    format!(
        "Write a {tone} blog post about \"{topic}\".\n\
         \n\
         Requirements:\n\
         - Around {words} words\n\
         - Start with a compelling title on the first line (no markdown, just plain title text)\n\
         - Then a blank line\n\
         - Then the full blog post content\n\
         - Use clear paragraphs with line breaks between them\n\
         - Tone must be {tone} throughout\n\
         - No markdown symbols like ** or ##, just plain text with paragraph breaks\n\
         - End with a strong conclusion paragraph",
        tone = tone,
        topic = request.topic,
        words = request.length.target_words(),
    )
}

#[async_trait]
impl CompletionSource for OpenAiCompletions {
    async fn open(&self, request: &GenerationRequest) -> Result<FragmentStream, CompletionError> {
        let body = ChatRequest {
            model: &self.config.model,
            stream: true,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(request),
                },
            ],
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Completion request failed: {}", e);
                CompletionError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Completion service returned {}: {}", status, body);
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Completion stream opened (model {})", self.config.model);
        Ok(Box::pin(sse_fragments(response.bytes_stream())))
    }
}

/// Turn a chat-completions SSE body into text fragments.
///
/// A chunk without content yields an empty fragment. `[DONE]` ends the feed;
/// the body ending without it is reported as [`CompletionError::Truncated`].
pub fn sse_fragments<S, B, E>(body: S) -> impl Stream<Item = Result<String, CompletionError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
{
    async_stream::stream! {
        let mut events = Box::pin(body.eventsource());
        loop {
            let event = match events.next().await {
                Some(Ok(event)) => event,
                Some(Err(e)) => {
                    error!("SSE stream error: {}", e);
                    yield Err(CompletionError::Stream(e.to_string()));
                    return;
                }
                None => {
                    warn!("SSE stream closed before [DONE]");
                    yield Err(CompletionError::Truncated);
                    return;
                }
            };

            trace!("SSE data: {:?}", event.data);
            if event.data == DONE_SENTINEL {
                return;
            }

            match parse_chunk(&event.data) {
                Ok(Some(fragment)) => yield Ok(fragment),
                Ok(None) => continue,
                Err(e) => {
                    error!("{}", e);
                    yield Err(e);
                    return;
                }
            }
        }
    }
}

/// Parse one SSE `data` payload. `Ok(None)` means the event is not a
/// completion chunk and carries no text.
fn parse_chunk(raw: &str) -> Result<Option<String>, CompletionError> {
    let json: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| CompletionError::Stream(format!("unparsable SSE event: {}, data: {}", e, raw)))?;

    if let Some(err) = json.get("error") {
        let message = err
            .get("message")
            .and_then(|m| m.as_str())
            .or_else(|| err.as_str())
            .unwrap_or("an error occurred during streaming");
        return Err(CompletionError::Api(message.to_string()));
    }

    if json.get("object").and_then(|o| o.as_str()) != Some(CHAT_COMPLETION_CHUNK_OBJECT) {
        warn!("Skipping non-chunk SSE event: {}", raw);
        return Ok(None);
    }

    let chunk: ChunkData = serde_json::from_value(json)
        .map_err(|e| CompletionError::Stream(format!("SSE chunk schema error: {}", e)))?;

    Ok(Some(
        chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .unwrap_or_default(),
    ))
}
