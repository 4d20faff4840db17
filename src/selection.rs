use crate::config::SelectionStrategy;
use crate::provider::{ImageProvider, ProviderKind};
use chrono::{Datelike, NaiveDate};
use rand::Rng;
use std::sync::Arc;

impl SelectionStrategy {
    /// Index of the provider to try first among `count` eligible providers.
    pub fn first_index(&self, count: usize, today: NaiveDate) -> usize {
        if count == 0 {
            return 0;
        }
        match self {
            SelectionStrategy::Random => rand::rng().random_range(0..count),
            SelectionStrategy::Rotation => today.day() as usize % count,
        }
    }
}

/// Candidate URLs together with the provider that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidates {
    pub provider: ProviderKind,
    pub urls: Vec<String>,
}

/// Providers in the order they will be tried: the selected one first, then
/// every other eligible provider in configured order.
pub struct FallbackChain {
    providers: Vec<Arc<dyn ImageProvider>>,
}

impl FallbackChain {
    pub fn new(providers: &[Arc<dyn ImageProvider>], first: usize) -> Self {
        let mut ordered = Vec::with_capacity(providers.len());
        if let Some(selected) = providers.get(first) {
            ordered.push(selected.clone());
        }
        ordered.extend(
            providers
                .iter()
                .enumerate()
                .filter(|(position, _)| *position != first)
                .map(|(_, provider)| provider.clone()),
        );
        Self { providers: ordered }
    }

    pub fn order(&self) -> Vec<ProviderKind> {
        self.providers.iter().map(|p| p.kind()).collect()
    }

    /// Asks each provider in turn until one returns a non-empty list.
    pub async fn fetch(&self, query: &str) -> Option<Candidates> {
        for provider in &self.providers {
            let kind = provider.kind();
            log::info!("Fetching candidates for {:?} from {}...", query, kind);
            match provider.fetch_candidates(query).await {
                Ok(urls) if !urls.is_empty() => {
                    log::debug!("{} returned {} candidates", kind, urls.len());
                    return Some(Candidates { provider: kind, urls });
                }
                Ok(_) => log::warn!("No images found from {} for {:?}", kind, query),
                Err(e) => log::warn!("{}", e),
            }
        }
        None
    }
}
