pub mod pexels;
pub mod pixabay;
pub mod unsplash;

use crate::config::{AppConfig, ProviderKeys};
use crate::error::AppError;
use crate::provider::{ImageProvider, ProviderKind};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use url::Url;

use self::{pexels::PexelsProvider, pixabay::PixabayProvider, unsplash::UnsplashProvider};

/// Builds one provider per configured key, in the fixed provider order.
pub fn build_providers(
    config: &AppConfig,
    keys: &ProviderKeys,
    client: &Client,
) -> Vec<Arc<dyn ImageProvider>> {
    let settings = &config.providers;
    let timeout = config.search_timeout();

    keys.iter()
        .map(|(kind, key)| {
            let endpoint = settings.endpoint(kind);
            log::debug!("Enabling provider {} at {}", kind, endpoint);
            let provider: Arc<dyn ImageProvider> = match kind {
                ProviderKind::Pexels => Arc::new(PexelsProvider::new(
                    client.clone(),
                    key,
                    endpoint,
                    settings.per_page,
                    settings.max_page,
                    timeout,
                )),
                ProviderKind::Pixabay => Arc::new(PixabayProvider::new(
                    client.clone(),
                    key,
                    endpoint,
                    settings.per_page,
                    timeout,
                )),
                ProviderKind::Unsplash => Arc::new(UnsplashProvider::new(
                    client.clone(),
                    key,
                    endpoint,
                    settings.per_page,
                    timeout,
                )),
            };
            provider
        })
        .collect()
}

/// Sends a search request and decodes its JSON body. Transport failures,
/// timeouts, non-2xx statuses and malformed bodies all map to
/// `ProviderRequest`.
pub(crate) async fn get_json<T: DeserializeOwned>(
    kind: ProviderKind,
    request: RequestBuilder,
) -> Result<T, AppError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            AppError::provider(kind, "request timed out")
        } else {
            AppError::provider(kind, e)
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::provider(kind, format!("HTTP status {}", status)));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| AppError::provider(kind, format!("malformed response: {}", e)))
}

/// Drops anything that is not an absolute http(s) URL.
pub(crate) fn keep_valid_urls(kind: ProviderKind, urls: impl IntoIterator<Item = String>) -> Vec<String> {
    urls.into_iter()
        .filter(|candidate| match Url::parse(candidate) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => true,
            _ => {
                log::debug!("{} returned an unusable image URL: {:?}", kind, candidate);
                false
            }
        })
        .collect()
}
