use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Length, Tone};

/// A validated generation request. Every field is present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub topic: String,
    pub tone: Tone,
    pub length: Length,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>, tone: Tone, length: Length) -> Self {
        Self {
            topic: topic.into(),
            tone,
            length,
        }
    }
}

/// The generation body as it arrives on the wire, before validation.
#[derive(Debug, Default, Deserialize)]
pub struct GenerationDraft {
    pub topic: Option<String>,
    pub tone: Option<String>,
    pub length: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("unknown tone '{0}'")]
    UnknownTone(String),

    #[error("unknown length '{0}'")]
    UnknownLength(String),
}

impl GenerationDraft {
    pub fn validate(self) -> Result<GenerationRequest, ValidationError> {
        let topic = required(self.topic, "topic")?;
        let tone = required(self.tone, "tone")?;
        let length = required(self.length, "length")?;

        let tone = tone.parse::<Tone>().map_err(ValidationError::UnknownTone)?;
        let length = length
            .parse::<Length>()
            .map_err(ValidationError::UnknownLength)?;

        Ok(GenerationRequest {
            topic: topic.trim().to_string(),
            tone,
            length,
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ValidationError::MissingField(field))
}
