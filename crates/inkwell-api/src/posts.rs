use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use inkwell_db::Mutation;
use inkwell_db::models::{NewPost, PostPatch, PostRow};
use inkwell_types::api::{Claims, CreatePostRequest, Dashboard, DeleteResponse, PublishedPost, UpdatePostRequest};
use inkwell_types::models::{Post, PostStatus};

use crate::error::ApiError;
use crate::state::{AppState, with_db};

/// GET /posts: public feed of published posts, newest first.
pub async fn list_published(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = with_db(&state, |db| db.list_published()).await?;

    let posts: Vec<PublishedPost> = rows
        .into_iter()
        .map(|row| PublishedPost {
            post: post_from_row(row.post),
            author_username: row.author_username,
        })
        .collect();

    Ok(Json(posts))
}

/// POST /posts
pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::Validation("title must not be empty".into()));
    }

    require_caller(&state, &claims).await?;

    let post_id = Uuid::new_v4().to_string();
    let author_id = claims.sub.to_string();
    let status = req.status.unwrap_or_default();

    let row = with_db(&state, move |db| {
        db.create_post(
            &NewPost {
                id: &post_id,
                title: &title,
                content: &req.content,
                tone: req.tone.as_ref().map(|t| t.as_str()),
                cover_image: req.cover_image.as_deref(),
                status: status.as_str(),
            },
            &author_id,
        )
    })
    .await?;

    info!("Post {} ('{}') created by {} as {}", row.id, row.slug, claims.username, row.status);
    Ok((StatusCode::CREATED, Json(post_from_row(row))))
}

/// GET /posts/mine: the caller's drafts and published posts.
pub async fn my_posts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_caller(&state, &claims).await?;

    let author_id = claims.sub.to_string();
    let rows = with_db(&state, move |db| db.list_posts_by_author(&author_id)).await?;
    let posts: Vec<Post> = rows.into_iter().map(post_from_row).collect();

    let published = posts.iter().filter(|p| p.status == PostStatus::Published).count();
    Ok(Json(Dashboard {
        total: posts.len(),
        published,
        drafts: posts.len() - published,
        posts,
    }))
}

/// PATCH /posts/{id}: author only.
pub async fn update_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::Validation("title must not be empty".into()));
    }

    require_caller(&state, &claims).await?;

    let patch = PostPatch {
        title: req.title.map(|t| t.trim().to_string()),
        content: req.content,
        tone: req.tone.map(|tone| tone.map(|t| t.as_str().to_string())),
        cover_image: req.cover_image,
        status: req.status.map(|s| s.as_str().to_string()),
    };

    let pid = post_id.clone();
    let caller = claims.sub.to_string();
    let outcome = with_db(&state, move |db| db.update_post(&pid, patch, &caller)).await?;

    let row = resolve(outcome, &post_id)?;
    info!("Post {} updated by {}", post_id, claims.username);
    Ok(Json(post_from_row(row)))
}

/// DELETE /posts/{id}: author only.
pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_caller(&state, &claims).await?;

    let pid = post_id.clone();
    let caller = claims.sub.to_string();
    let outcome = with_db(&state, move |db| db.delete_post(&pid, &caller)).await?;

    resolve(outcome, &post_id)?;
    info!("Post {} deleted by {}", post_id, claims.username);
    Ok(Json(DeleteResponse { success: true }))
}

/// The caller's user record must still exist.
async fn require_caller(state: &AppState, claims: &Claims) -> Result<(), ApiError> {
    let uid = claims.sub.to_string();
    with_db(state, move |db| db.get_user_by_id(&uid))
        .await?
        .map(|_| ())
        .ok_or_else(|| ApiError::NotFound("user not found".into()))
}

/// Ids are matched as stored text, so a malformed id is simply not found.
fn resolve<T>(outcome: Mutation<T>, post_id: &str) -> Result<T, ApiError> {
    match outcome {
        Mutation::Done(value) => Ok(value),
        Mutation::Forbidden => Err(ApiError::Forbidden),
        Mutation::NotFound => Err(ApiError::NotFound(format!("post {}", post_id))),
    }
}

pub(crate) fn post_from_row(row: PostRow) -> Post {
    Post {
        id: parse_uuid(&row.id, "id", &row.id),
        author_id: parse_uuid(&row.author_id, "author_id", &row.id),
        tone: row.tone.as_deref().and_then(|t| {
            t.parse()
                .map_err(|_| warn!("Unknown tone '{}' on post '{}'", t, row.id))
                .ok()
        }),
        status: row.status.parse().unwrap_or_else(|e| {
            warn!("{} on post '{}'", e, row.id);
            PostStatus::Draft
        }),
        created_at: parse_timestamp(&row.created_at, &row.id),
        updated_at: parse_timestamp(&row.updated_at, &row.id),
        title: row.title,
        slug: row.slug,
        content: row.content,
        cover_image: row.cover_image,
    }
}

fn parse_uuid(value: &str, column: &str, post_id: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on post '{}': {}", column, value, post_id, e);
        Uuid::default()
    })
}

fn parse_timestamp(value: &str, post_id: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on post '{}': {}", value, post_id, e);
            DateTime::default()
        })
}
