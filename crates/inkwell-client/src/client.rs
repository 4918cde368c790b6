use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use inkwell_stream::IncrementalConsumer;
use inkwell_types::api::{
    CreatePostRequest, Dashboard, DeleteResponse, ErrorBody, ImageResult, LoginRequest, LoginResponse,
    PublishedPost, RegisterRequest, RegisterResponse, UpdatePostRequest, UploadResponse,
};
use inkwell_types::generation::GenerationRequest;
use inkwell_types::models::Post;

use crate::error::ClientError;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Reader over a `/generate` response body.
pub type GenerationConsumer = IncrementalConsumer<ByteStream>;

/// Typed access to the inkwell HTTP API. Holds the bearer token once
/// `register` or `login` succeeds.
#[derive(Clone)]
pub struct InkwellClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl InkwellClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(&self) -> Result<&str, ClientError> {
        self.token.as_deref().ok_or(ClientError::Auth)
    }

    // -- Auth --

    pub async fn register(&mut self, username: &str, password: &str) -> Result<RegisterResponse, ClientError> {
        let resp = self
            .http
            .post(self.url("/auth/register"))
            .json(&RegisterRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        let registered: RegisterResponse = json_body(resp).await?;
        self.token = Some(registered.token.clone());
        Ok(registered)
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let resp = self
            .http
            .post(self.url("/auth/login"))
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        let session: LoginResponse = json_body(resp).await?;
        self.token = Some(session.token.clone());
        Ok(session)
    }

    // -- Generation --

    /// Start a generation. On success the body has not been read yet; the
    /// returned consumer reads it chunk by chunk.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationConsumer, ClientError> {
        let resp = self
            .http
            .post(self.url("/generate"))
            .bearer_auth(self.bearer()?)
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::GenerationFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = error_message(resp).await;
            warn!("Generation rejected ({}): {}", status, message);
            return Err(match status {
                StatusCode::BAD_REQUEST => ClientError::Validation(message),
                StatusCode::UNAUTHORIZED => ClientError::Auth,
                s if s.is_server_error() => ClientError::GenerationFailed(message),
                s => ClientError::Server {
                    status: s.as_u16(),
                    message,
                },
            });
        }

        debug!("Generation stream opened for '{}'", request.topic);
        let stream: ByteStream = resp.bytes_stream().boxed();
        Ok(IncrementalConsumer::new(stream))
    }

    // -- Posts --

    pub async fn list_published(&self) -> Result<Vec<PublishedPost>, ClientError> {
        let resp = self.http.get(self.url("/posts")).send().await?;
        json_body(resp).await
    }

    pub async fn create_post(&self, request: &CreatePostRequest) -> Result<Post, ClientError> {
        let resp = self
            .http
            .post(self.url("/posts"))
            .bearer_auth(self.bearer()?)
            .json(request)
            .send()
            .await?;
        json_body(resp).await
    }

    pub async fn update_post(&self, post_id: Uuid, request: &UpdatePostRequest) -> Result<Post, ClientError> {
        let resp = self
            .http
            .patch(self.url(&format!("/posts/{}", post_id)))
            .bearer_auth(self.bearer()?)
            .json(request)
            .send()
            .await?;
        json_body(resp).await
    }

    pub async fn delete_post(&self, post_id: Uuid) -> Result<(), ClientError> {
        let resp = self
            .http
            .delete(self.url(&format!("/posts/{}", post_id)))
            .bearer_auth(self.bearer()?)
            .send()
            .await?;
        let _: DeleteResponse = json_body(resp).await?;
        Ok(())
    }

    pub async fn my_posts(&self) -> Result<Dashboard, ClientError> {
        let resp = self
            .http
            .get(self.url("/posts/mine"))
            .bearer_auth(self.bearer()?)
            .send()
            .await?;
        json_body(resp).await
    }

    // -- Images --

    pub async fn search_images(&self, query: &str) -> Result<Vec<ImageResult>, ClientError> {
        let resp = self
            .http
            .get(self.url("/images/search"))
            .query(&[("query", query)])
            .send()
            .await?;
        json_body(resp).await
    }

    /// Upload a cover image. Returns the server path it is served from.
    pub async fn upload_image(&self, file_name: &str, data: Vec<u8>) -> Result<String, ClientError> {
        let part = reqwest::multipart::Part::bytes(data).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .http
            .post(self.url("/images/upload"))
            .bearer_auth(self.bearer()?)
            .multipart(form)
            .send()
            .await?;
        let uploaded: UploadResponse = json_body(resp).await?;
        Ok(uploaded.url)
    }
}

async fn json_body<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }

    let message = error_message(resp).await;
    Err(match status {
        StatusCode::BAD_REQUEST => ClientError::Validation(message),
        StatusCode::UNAUTHORIZED => ClientError::Auth,
        StatusCode::FORBIDDEN => ClientError::Forbidden,
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::CONFLICT => ClientError::Conflict(message),
        StatusCode::PAYLOAD_TOO_LARGE => ClientError::PayloadTooLarge,
        s => ClientError::Server {
            status: s.as_u16(),
            message,
        },
    })
}

/// The `{error}` message from a failed response, or the raw body.
async fn error_message(resp: Response) -> String {
    let body = resp.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorBody>(&body)
        .map(|e| e.error)
        .unwrap_or(body)
}
