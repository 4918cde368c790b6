use std::path::PathBuf;
use std::sync::Arc;

use tracing::error;

use inkwell_db::Database;
use inkwell_stream::CompletionSource;

use crate::error::ApiError;
use crate::unsplash::ImageSearch;

pub type AppState = Arc<AppStateInner>;

/// Everything a request handler needs. Passed explicitly; handlers never read
/// configuration from the environment.
pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub completions: Arc<dyn CompletionSource>,
    pub images: Arc<dyn ImageSearch>,
    pub upload_dir: PathBuf,
}

/// Run a blocking DB operation off the async runtime.
pub(crate) async fn with_db<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed"))
        })?
        .map_err(ApiError::Internal)
}
