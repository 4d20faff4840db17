use crate::provider::ProviderKind;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use tokio::task::JoinError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("No API keys found. Please set PEXELS_KEY, PIXABAY_KEY, or UNSPLASH_KEY.")]
    NoProviderKeys,

    #[error("{provider} request failed: {reason}")]
    ProviderRequest {
        provider: ProviderKind,
        reason: String,
    },

    #[error("Failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Failed to decode image from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Failed to read index {path}: {reason}")]
    IndexUnreadable { path: String, reason: String },

    #[error("Failed to persist index to {path}: {reason}")]
    IndexPersistence { path: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] SerdeJsonError),

    #[error("Walkdir error: {0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("Tokio join error: {0}")]
    Join(#[from] JoinError),
}

impl AppError {
    /// Fatal errors abort the run; everything else is logged and skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::NoProviderKeys
                | AppError::IndexUnreadable { .. }
                | AppError::IndexPersistence { .. }
                | AppError::Config(_)
        )
    }

    pub fn provider(provider: ProviderKind, reason: impl ToString) -> Self {
        AppError::ProviderRequest {
            provider,
            reason: reason.to_string(),
        }
    }

    pub fn download(url: &str, reason: impl ToString) -> Self {
        AppError::Download {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
