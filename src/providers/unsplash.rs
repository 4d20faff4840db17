use crate::error::AppError;
use crate::provider::{ImageProvider, ProviderKind};
use crate::providers::{get_json, keep_valid_urls};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// `/photos/random` answers with an array when `count` is given and with a
/// single photo otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RandomResponse {
    Many(Vec<Photo>),
    One(Photo),
}

#[derive(Debug, Deserialize)]
struct Photo {
    #[serde(default)]
    urls: PhotoUrls,
}

#[derive(Debug, Deserialize, Default)]
struct PhotoUrls {
    full: Option<String>,
}

pub struct UnsplashProvider {
    client: Client,
    access_key: String,
    endpoint: String,
    count: u32,
    timeout: Duration,
}

impl UnsplashProvider {
    pub fn new(client: Client, access_key: &str, endpoint: String, count: u32, timeout: Duration) -> Self {
        Self {
            client,
            access_key: access_key.to_string(),
            endpoint,
            count: count.clamp(1, 30),
            timeout,
        }
    }
}

fn extract_urls(response: RandomResponse) -> Vec<String> {
    let photos = match response {
        RandomResponse::Many(photos) => photos,
        RandomResponse::One(photo) => vec![photo],
    };
    let urls = photos.into_iter().filter_map(|photo| photo.urls.full);
    keep_valid_urls(ProviderKind::Unsplash, urls)
}

#[async_trait]
impl ImageProvider for UnsplashProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Unsplash
    }

    async fn fetch_candidates(&self, query: &str) -> Result<Vec<String>, AppError> {
        log::debug!("Requesting {} random Unsplash photos for {:?}", self.count, query);

        let request = self
            .client
            .get(&self.endpoint)
            .header("Authorization", format!("Client-ID {}", self.access_key))
            .header("Accept-Version", "v1")
            .query(&[("query", query.to_string()), ("count", self.count.to_string())])
            .timeout(self.timeout);

        let response: RandomResponse = get_json(self.kind(), request).await?;
        Ok(extract_urls(response))
    }
}
