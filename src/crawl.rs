use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context as _;
use futures_util::StreamExt as _;
use futures_util::stream::FuturesUnordered;

use crate::chapters::ChapterDiscovery;
use crate::config::CrawlConfig;
use crate::formats::{Chapter, Manifest};
use crate::http::{Connector, HttpConnector};
use crate::progress::{self, CrawlEvent, Progress, ProgressSummary};
use crate::queue::WorkerPool;
use crate::site::SiteProfile;
use crate::worker::ChapterWorker;

pub struct Crawler {
    site: Arc<SiteProfile>,
    connector: Arc<dyn Connector>,
    config: CrawlConfig,
}

impl Crawler {
    pub fn new(site: SiteProfile, connector: Arc<dyn Connector>, config: CrawlConfig) -> Self {
        Self {
            site: Arc::new(site),
            connector,
            config,
        }
    }

    pub fn with_http(site: SiteProfile, config: CrawlConfig) -> Self {
        Self::new(site, Arc::new(HttpConnector::new()), config)
    }

    pub async fn discover(&self) -> Vec<Chapter> {
        ChapterDiscovery::new(&self.site, self.connector.as_ref(), self.config.timing)
            .discover()
            .await
    }

    /// Discovers, downloads and records every chapter in the configured slot range.
    ///
    /// Returns `None` without writing a manifest when no chapter could be found.
    pub async fn crawl(&self) -> anyhow::Result<Option<Manifest>> {
        let out_dir = &self.config.output_dir;
        crate::store::ensure_output_dir(out_dir).context("prepare output directory")?;

        let chapters = self.discover().await;
        if chapters.is_empty() {
            tracing::warn!(comic = %self.site.comic_id, "no chapters found; nothing to crawl");
            return Ok(None);
        }

        let chapters = filter_range(chapters, &self.config);
        tracing::info!(
            chapters = chapters.len(),
            workers = self.config.workers,
            "starting chapter downloads"
        );

        let (manifest, summary) = self.download_all(chapters).await?;

        let manifest_path = self.config.manifest_path();
        crate::manifest::write(&manifest_path, &manifest).context("write manifest")?;

        tracing::info!(
            processed = manifest.len(),
            finished = summary.chapters_finished,
            skipped = summary.chapters_skipped,
            failed = summary.chapters_failed,
            images = summary.images_saved,
            images_failed = summary.images_failed,
            manifest = %manifest_path.display(),
            "crawl complete"
        );
        Ok(Some(manifest))
    }

    /// Runs every chapter through the pool and waits for the reporter to drain.
    async fn download_all(
        &self,
        chapters: Vec<Chapter>,
    ) -> anyhow::Result<(Manifest, ProgressSummary)> {
        let (progress, rx) = Progress::channel();
        let reporter = progress::spawn_reporter(rx);
        let manifest = self.run_workers(chapters, progress).await;
        let summary = reporter.await.context("join progress reporter")?;
        Ok((manifest, summary))
    }

    async fn run_workers(&self, chapters: Vec<Chapter>, progress: Progress) -> Manifest {
        let pool = WorkerPool::new(self.config.workers);
        let worker = ChapterWorker::new(
            Arc::clone(&self.site),
            Arc::clone(&self.connector),
            self.config.timing,
            &self.config.output_dir,
            progress.clone(),
        );

        let total = chapters.len();
        let mut pending = FuturesUnordered::new();
        for (index, chapter) in chapters.into_iter().enumerate() {
            let worker = worker.clone();
            let name = chapter.name.clone();
            let handle =
                pool.spawn(async move { worker.process(&chapter, index + 1, total).await });
            pending.push(async move { (index, name, handle.await) });
        }
        drop(worker);

        // Completion order is arbitrary; the index restores submission order.
        let mut results = BTreeMap::new();
        while let Some((index, name, joined)) = pending.next().await {
            let outcome = joined.unwrap_or_else(|err| {
                Err(anyhow::Error::new(err).context("chapter task panicked"))
            });
            match outcome {
                Ok(Some(result)) => {
                    results.insert(index, result);
                }
                Ok(None) => {}
                Err(err) => progress.emit(CrawlEvent::ChapterFailed {
                    name,
                    error: format!("{err:#}"),
                }),
            }
        }

        results.into_values().collect()
    }
}

/// Chapters whose slot lies in the configured inclusive range, order kept.
pub fn filter_range(chapters: Vec<Chapter>, config: &CrawlConfig) -> Vec<Chapter> {
    chapters
        .into_iter()
        .filter(|chapter| config.in_range(chapter.slot))
        .collect()
}
