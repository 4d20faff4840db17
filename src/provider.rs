use crate::error::AppError;
use async_trait::async_trait;
use std::fmt;

/// The closed set of stock-photo APIs we know how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Pexels,
    Pixabay,
    Unsplash,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Pexels,
        ProviderKind::Pixabay,
        ProviderKind::Unsplash,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Pexels => "Pexels",
            ProviderKind::Pixabay => "Pixabay",
            ProviderKind::Unsplash => "Unsplash",
        }
    }

    /// Key used for this provider in the `providers.endpoints` config table.
    pub fn config_key(&self) -> &'static str {
        match self {
            ProviderKind::Pexels => "pexels",
            ProviderKind::Pixabay => "pixabay",
            ProviderKind::Unsplash => "unsplash",
        }
    }

    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderKind::Pexels => "PEXELS_KEY",
            ProviderKind::Pixabay => "PIXABAY_KEY",
            ProviderKind::Unsplash => "UNSPLASH_KEY",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::Pexels => "https://api.pexels.com/v1/search",
            ProviderKind::Pixabay => "https://pixabay.com/api/",
            ProviderKind::Unsplash => "https://api.unsplash.com/photos/random",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A search endpoint that turns a query into full-resolution image URLs.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;
    async fn fetch_candidates(&self, query: &str) -> Result<Vec<String>, AppError>;
}
