use crate::config::{AppConfig, CategoryConfig, SelectionStrategy};
use crate::error::AppError;
use crate::index_store::{Index, IndexStore};
use crate::metadata::IndexRecord;
use crate::processor::ImageSink;
use crate::provider::{ImageProvider, ProviderKind};
use crate::selection::FallbackChain;
use crate::walker::index_key;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const NAME_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryReport {
    pub name: String,
    pub provider: Option<ProviderKind>,
    pub saved: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub saved: usize,
    pub total: usize,
    pub categories: Vec<CategoryReport>,
}

pub struct Orchestrator {
    config: AppConfig,
    providers: Vec<Arc<dyn ImageProvider>>,
    sink: Arc<dyn ImageSink>,
    store: IndexStore,
    strategy: SelectionStrategy,
    only: Vec<String>,
}

impl Orchestrator {
    pub fn new(
        config: AppConfig,
        providers: Vec<Arc<dyn ImageProvider>>,
        sink: Arc<dyn ImageSink>,
    ) -> Self {
        let store = IndexStore::new(&config.index_path);
        let strategy = config.selection;
        Self {
            config,
            providers,
            sink,
            store,
            strategy,
            only: Vec::new(),
        }
    }

    pub fn with_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Restricts the run to the named categories. Empty means all.
    pub fn only_categories(mut self, names: Vec<String>) -> Self {
        self.only = names;
        self
    }

    pub async fn run(&self) -> Result<RunSummary, AppError> {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunSummary, AppError> {
        if self.providers.is_empty() {
            return Err(AppError::NoProviderKeys);
        }

        let mut index = Index::from_entries(self.store.load()?);
        log::info!("Found {} existing images in the index.", index.len());

        for name in &self.only {
            if !self.config.categories.iter().any(|c| &c.name == name) {
                log::warn!("Unknown category {:?} ignored.", name);
            }
        }

        let mut reports = Vec::new();
        for category in self.selected_categories() {
            let report = self.fill_category(category, &mut index, now).await;
            reports.push(report);
        }

        self.store.save(index.entries())?;

        let saved = reports.iter().map(|r| r.saved).sum();
        log::info!(
            "Saved {} new images this run; {} images in the index.",
            saved,
            index.len()
        );

        Ok(RunSummary {
            saved,
            total: index.len(),
            categories: reports,
        })
    }

    fn selected_categories(&self) -> impl Iterator<Item = &CategoryConfig> {
        self.config
            .categories
            .iter()
            .filter(|c| self.only.is_empty() || self.only.contains(&c.name))
    }

    async fn fill_category(
        &self,
        category: &CategoryConfig,
        index: &mut Index,
        now: DateTime<Utc>,
    ) -> CategoryReport {
        let today = now.date_naive();
        let day = today.format("%Y-%m-%d").to_string();
        let mut report = CategoryReport {
            name: category.name.clone(),
            provider: None,
            saved: 0,
        };

        let already = index.saved_on(&category.name, &day);
        let remaining = category.daily_cap.saturating_sub(already);
        if remaining == 0 {
            log::info!(
                "Category {} already has {} images for {}, skipping.",
                category.name,
                already,
                day
            );
            return report;
        }

        let first = self.strategy.first_index(self.providers.len(), today);
        let chain = FallbackChain::new(&self.providers, first);
        log::debug!("Provider order for {}: {:?}", category.name, chain.order());

        let candidates = match chain.fetch(&category.query).await {
            Some(candidates) => candidates,
            None => {
                log::warn!("No provider returned images for category {}.", category.name);
                return report;
            }
        };
        report.provider = Some(candidates.provider);

        for url in &candidates.urls {
            if report.saved >= remaining {
                break;
            }

            let destination = match self.destination_for(&category.name, today, index) {
                Some(destination) => destination,
                None => {
                    log::warn!("No free filename for {} in category {}, skipping.", url, category.name);
                    continue;
                }
            };
            let (width, height) = match self
                .sink
                .process_and_store(url, &destination, category.max_width)
                .await
            {
                Ok(size) => size,
                Err(e) => {
                    log::warn!("Skipping image from {}: {}", candidates.provider, e);
                    continue;
                }
            };

            let record = IndexRecord {
                filename: index_key(&destination),
                source_url: url.clone(),
                category: Some(category.name.clone()),
                provider: Some(candidates.provider.name().to_string()),
                width,
                height,
                tags: self.config.tags.clone(),
                date_added: now.to_rfc3339_opts(SecondsFormat::Secs, true),
                ..Default::default()
            };
            let filename = record.filename.clone();
            if index.insert(record) {
                report.saved += 1;
                log::info!("Saved image from {}: {}", candidates.provider, filename);
            } else {
                log::warn!("{} is already indexed, not adding it again.", filename);
            }
        }

        report
    }

    fn destination_for(&self, category: &str, today: NaiveDate, index: &Index) -> Option<PathBuf> {
        let mut rng = rand::rng();
        free_destination(
            Path::new(&self.config.images_directory),
            category,
            today,
            index,
            || rng.random::<u32>(),
        )
    }
}

/// `<images>/<category>/<category>_<YYYYMMDD>_<suffix>.jpg` for the first
/// suffix whose name is not indexed yet, or `None` once the attempts run out.
fn free_destination<F>(
    images_dir: &Path,
    category: &str,
    today: NaiveDate,
    index: &Index,
    mut next_suffix: F,
) -> Option<PathBuf>
where
    F: FnMut() -> u32,
{
    let base = images_dir.join(category);
    (0..NAME_ATTEMPTS)
        .map(|_| {
            base.join(format!(
                "{}_{}_{:06x}.jpg",
                category,
                today.format("%Y%m%d"),
                next_suffix() & 0x00ff_ffff
            ))
        })
        .find(|candidate| !index.contains(&index_key(candidate)))
}
