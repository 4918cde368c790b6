pub mod auth;
pub mod error;
pub mod generate;
pub mod images;
pub mod middleware;
pub mod posts;
pub mod routes;
pub mod state;
pub mod unsplash;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner};
