use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use inkwell_types::api::ImageResult;

/// Cover image search collaborator.
#[async_trait]
pub trait ImageSearch: Send + Sync {
    async fn search(&self, query: &str, count: u32) -> anyhow::Result<Vec<ImageResult>>;
}

pub struct UnsplashClient {
    http: reqwest::Client,
    access_key: String,
    base_url: String,
}

impl UnsplashClient {
    pub fn new(access_key: String) -> Self {
        Self::with_base_url(access_key, "https://api.unsplash.com".into())
    }

    pub fn with_base_url(access_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_key,
            base_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    id: String,
    urls: PhotoUrls,
    user: Photographer,
    links: PhotoLinks,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: String,
    small: String,
}

#[derive(Debug, Deserialize)]
struct Photographer {
    name: String,
    links: PhotographerLinks,
}

#[derive(Debug, Deserialize)]
struct PhotographerLinks {
    html: String,
}

#[derive(Debug, Deserialize)]
struct PhotoLinks {
    download_location: String,
}

impl From<Photo> for ImageResult {
    fn from(photo: Photo) -> Self {
        Self {
            id: photo.id,
            url: photo.urls.regular,
            thumb: photo.urls.small,
            author_name: photo.user.name,
            author_url: photo.user.links.html,
            download_location: photo.links.download_location,
        }
    }
}

#[async_trait]
impl ImageSearch for UnsplashClient {
    async fn search(&self, query: &str, count: u32) -> anyhow::Result<Vec<ImageResult>> {
        let per_page = count.to_string();
        let response = self
            .http
            .get(format!("{}/search/photos", self.base_url.trim_end_matches('/')))
            .header("Authorization", format!("Client-ID {}", self.access_key))
            .query(&[
                ("query", query),
                ("per_page", per_page.as_str()),
                ("orientation", "landscape"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: SearchResponse = response.json().await?;
        debug!("Image search '{}' returned {} results", query, body.results.len());

        Ok(body.results.into_iter().map(ImageResult::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_unsplash_photo_fields() {
        let raw = r#"{
            "results": [{
                "id": "abc",
                "urls": {"regular": "https://img/regular", "small": "https://img/small", "thumb": "x"},
                "user": {"name": "Ada", "links": {"html": "https://unsplash.com/@ada"}},
                "links": {"download_location": "https://api/download"}
            }]
        }"#;
        let body: SearchResponse = serde_json::from_str(raw).unwrap();
        let images: Vec<ImageResult> = body.results.into_iter().map(ImageResult::from).collect();
        assert_eq!(
            images,
            vec![ImageResult {
                id: "abc".into(),
                url: "https://img/regular".into(),
                thumb: "https://img/small".into(),
                author_name: "Ada".into(),
                author_url: "https://unsplash.com/@ada".into(),
                download_location: "https://api/download".into(),
            }]
        );
    }
}
