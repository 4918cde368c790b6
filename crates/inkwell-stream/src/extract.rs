use thiserror::Error;

/// Title and body split out of a finished generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDraft {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("nothing to save: generated text is empty")]
    EmptyContent,
}

/// Split finished text on its first line break.
///
/// The first line (trimmed) is the title, falling back to `topic` when blank.
/// Everything after the break, trimmed, is the body.
pub fn extract(text: &str, topic: &str) -> Result<ExtractedDraft, ExtractError> {
    if text.trim().is_empty() {
        return Err(ExtractError::EmptyContent);
    }

    let (first_line, rest) = text.split_once('\n').unwrap_or((text, ""));

    let title = match first_line.trim() {
        "" => topic.trim(),
        title => title,
    };

    Ok(ExtractedDraft {
        title: title.to_string(),
        body: rest.trim().to_string(),
    })
}
