use crate::error::AppError;
use crate::provider::{ImageProvider, ProviderKind};
use crate::providers::{get_json, keep_valid_urls};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "largeImageURL")]
    large_image_url: Option<String>,
}

pub struct PixabayProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    per_page: u32,
    timeout: Duration,
}

impl PixabayProvider {
    pub fn new(client: Client, api_key: &str, endpoint: String, per_page: u32, timeout: Duration) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            endpoint,
            // Pixabay rejects per_page outside 3..=200.
            per_page: per_page.clamp(3, 200),
            timeout,
        }
    }
}

fn extract_urls(response: SearchResponse) -> Vec<String> {
    let urls = response.hits.into_iter().filter_map(|hit| hit.large_image_url);
    keep_valid_urls(ProviderKind::Pixabay, urls)
}

#[async_trait]
impl ImageProvider for PixabayProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Pixabay
    }

    async fn fetch_candidates(&self, query: &str) -> Result<Vec<String>, AppError> {
        log::debug!("Searching Pixabay for {:?}", query);

        let request = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.clone()),
                ("q", query.to_string()),
                ("image_type", "photo".to_string()),
                ("per_page", self.per_page.to_string()),
            ])
            .timeout(self.timeout);

        let response: SearchResponse = get_json(self.kind(), request).await?;
        let mut urls = extract_urls(response);
        urls.shuffle(&mut rand::rng());
        Ok(urls)
    }
}
