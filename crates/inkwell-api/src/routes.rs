use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::images::{self, MAX_UPLOAD_SIZE};
use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{auth, generate, posts};

// Room for multipart boundaries and part headers around a max-size file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/posts", get(posts::list_published))
        .route("/images/search", get(images::search))
        .route("/health", get(|| async { "ok" }));

    let protected_routes = Router::new()
        .route("/generate", post(generate::generate))
        .route("/posts", post(posts::create_post))
        .route("/posts/mine", get(posts::my_posts))
        .route("/posts/{id}", patch(posts::update_post).delete(posts::delete_post))
        .route(
            "/images/upload",
            post(images::upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE + MULTIPART_OVERHEAD)),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/uploads", ServeDir::new(&state.upload_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
