use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;

use crate::config::Timing;
use crate::formats::{Chapter, ChapterResult};
use crate::http::{Connector, Fetch};
use crate::mirror::MirrorResolver;
use crate::progress::{CrawlEvent, Progress};
use crate::site::SiteProfile;
use crate::store;

/// Downloads one chapter's images, one after another, into its own directory.
#[derive(Clone)]
pub struct ChapterWorker {
    site: Arc<SiteProfile>,
    connector: Arc<dyn Connector>,
    timing: Timing,
    output_dir: PathBuf,
    progress: Progress,
}

impl ChapterWorker {
    pub fn new(
        site: Arc<SiteProfile>,
        connector: Arc<dyn Connector>,
        timing: Timing,
        output_dir: impl Into<PathBuf>,
        progress: Progress,
    ) -> Self {
        Self {
            site,
            connector,
            timing,
            output_dir: output_dir.into(),
            progress,
        }
    }

    /// `Ok(None)` when no mirror has images for the chapter. Image failures are
    /// reported and counted; only local filesystem trouble is an error.
    pub async fn process(
        &self,
        chapter: &Chapter,
        index: usize,
        total: usize,
    ) -> anyhow::Result<Option<ChapterResult>> {
        self.progress.emit(CrawlEvent::ChapterStarted {
            index,
            total,
            slot: chapter.slot,
            name: chapter.name.clone(),
        });

        let images = MirrorResolver::new(&self.site, self.connector.as_ref(), self.timing)
            .resolve_chapter_images(chapter.slot)
            .await;
        if images.is_empty() {
            self.progress.emit(CrawlEvent::ChapterSkipped {
                name: chapter.name.clone(),
                slot: chapter.slot,
            });
            return Ok(None);
        }
        self.progress.emit(CrawlEvent::ImagesFound {
            name: chapter.name.clone(),
            count: images.len(),
        });

        let directory_name = store::chapter_dir_name(chapter.slot, &chapter.name);
        let chapter_dir = self.output_dir.join(&directory_name);
        tokio::fs::create_dir_all(&chapter_dir)
            .await
            .with_context(|| format!("create chapter dir: {}", chapter_dir.display()))?;

        let referer = self
            .site
            .primary()
            .map(|mirror| mirror.referer.as_str())
            .unwrap_or_default();
        let session = self
            .connector
            .connect(referer)
            .context("open download session")?;

        let mut downloaded_count = 0;
        for (position, image) in images.iter().enumerate() {
            let image_index = position + 1;
            let file_name = store::image_file_name(image_index, &image.url);
            let path = chapter_dir.join(&file_name);

            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                downloaded_count += 1;
                continue;
            }

            match self.download(session.as_ref(), &image.url, &path).await {
                Ok(()) => {
                    downloaded_count += 1;
                    self.progress.emit(CrawlEvent::ImageSaved {
                        name: chapter.name.clone(),
                        index: image_index,
                        total: images.len(),
                        file_name,
                    });
                }
                Err(err) => {
                    self.progress.emit(CrawlEvent::ImageFailed {
                        name: chapter.name.clone(),
                        file_name,
                        url: image.url.clone(),
                        error: format!("{err:#}"),
                    });
                }
            }

            if !self.timing.image_delay.is_zero() {
                tokio::time::sleep(self.timing.image_delay).await;
            }
        }

        self.progress.emit(CrawlEvent::ChapterFinished {
            name: chapter.name.clone(),
            downloaded: downloaded_count,
            total: images.len(),
        });

        Ok(Some(ChapterResult {
            slot: chapter.slot,
            name: chapter.name.clone(),
            directory_name,
            downloaded_count,
            total_images: images.len(),
        }))
    }

    /// Streams into a `.part` sibling first so an interrupted download is never
    /// mistaken for a finished one on the next run.
    async fn download(&self, session: &dyn Fetch, url: &str, path: &Path) -> anyhow::Result<()> {
        let partial = store::partial_path(path);
        if let Err(err) = session
            .download(url, &partial, self.timing.content_timeout)
            .await
        {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(err);
        }
        tokio::fs::rename(&partial, path)
            .await
            .with_context(|| format!("move into place: {}", path.display()))?;
        Ok(())
    }
}
