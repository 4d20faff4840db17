use crate::error::AppError;
use crate::provider::{ImageProvider, ProviderKind};
use crate::providers::{get_json, keep_valid_urls};
use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    src: PhotoSources,
}

#[derive(Debug, Deserialize)]
struct PhotoSources {
    original: Option<String>,
}

pub struct PexelsProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    per_page: u32,
    max_page: u32,
    timeout: Duration,
}

impl PexelsProvider {
    pub fn new(
        client: Client,
        api_key: &str,
        endpoint: String,
        per_page: u32,
        max_page: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            endpoint,
            per_page: per_page.clamp(1, 80),
            max_page: max_page.max(1),
            timeout,
        }
    }
}

fn extract_urls(response: SearchResponse) -> Vec<String> {
    let urls = response.photos.into_iter().filter_map(|photo| photo.src.original);
    keep_valid_urls(ProviderKind::Pexels, urls)
}

#[async_trait]
impl ImageProvider for PexelsProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Pexels
    }

    async fn fetch_candidates(&self, query: &str) -> Result<Vec<String>, AppError> {
        let page = rand::rng().random_range(1..=self.max_page);
        log::debug!("Searching Pexels for {:?} (page {})", query, page);

        let request = self
            .client
            .get(&self.endpoint)
            .header("Authorization", &self.api_key)
            .query(&[
                ("query", query.to_string()),
                ("per_page", self.per_page.to_string()),
                ("page", page.to_string()),
            ])
            .timeout(self.timeout);

        let response: SearchResponse = get_json(self.kind(), request).await?;
        Ok(extract_urls(response))
    }
}
