use axum::{
    Extension, Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::header,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use inkwell_stream::relay::{self, RelayError};
use inkwell_types::api::Claims;
use inkwell_types::generation::GenerationDraft;

use crate::error::ApiError;
use crate::state::AppState;

/// POST /generate: stream a generated post back as raw chunked text.
///
/// Validation happens before the completion source is touched. A source
/// failure before any text is a 502; a failure after text has been sent
/// aborts the body, so the reader sees an incomplete transfer rather than a
/// clean end.
pub async fn generate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<GenerationDraft>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(draft) = body?;
    let request = draft.validate().map_err(|e| {
        warn!("Rejected generation request from {}: {}", claims.username, e);
        ApiError::Validation(e.to_string())
    })?;

    info!("Generation requested by {} ({})", claims.username, claims.sub);

    let stream = relay::open(state.completions.as_ref(), &request)
        .await
        .map_err(|e| match e {
            RelayError::Preflight(source) => ApiError::BadGateway(format!("AI generation failed: {}", source)),
            mid @ RelayError::MidStream { .. } => ApiError::BadGateway(mid.to_string()),
        })?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}
