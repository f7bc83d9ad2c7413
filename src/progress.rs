//! Progress events from concurrent workers, written out by a single reporter task.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEvent {
    ChapterStarted {
        index: usize,
        total: usize,
        slot: u32,
        name: String,
    },
    ImagesFound {
        name: String,
        count: usize,
    },
    ChapterSkipped {
        name: String,
        slot: u32,
    },
    ImageSaved {
        name: String,
        index: usize,
        total: usize,
        file_name: String,
    },
    ImageFailed {
        name: String,
        file_name: String,
        url: String,
        error: String,
    },
    ChapterFinished {
        name: String,
        downloaded: usize,
        total: usize,
    },
    ChapterFailed {
        name: String,
        error: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSummary {
    pub chapters_finished: usize,
    pub chapters_skipped: usize,
    pub chapters_failed: usize,
    pub images_saved: usize,
    pub images_failed: usize,
}

/// Cheap handle workers use to report; a disabled handle drops everything.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    tx: Option<mpsc::UnboundedSender<CrawlEvent>>,
}

impl Progress {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CrawlEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: CrawlEvent) {
        if let Some(tx) = &self.tx {
            // The reporter only goes away after every sender is dropped.
            let _ = tx.send(event);
        }
    }
}

/// Drains `rx` until every [`Progress`] handle is dropped.
pub fn spawn_reporter(mut rx: mpsc::UnboundedReceiver<CrawlEvent>) -> JoinHandle<ProgressSummary> {
    tokio::spawn(async move {
        let mut summary = ProgressSummary::default();
        while let Some(event) = rx.recv().await {
            report(&event, &mut summary);
        }
        summary
    })
}

fn report(event: &CrawlEvent, summary: &mut ProgressSummary) {
    match event {
        CrawlEvent::ChapterStarted {
            index,
            total,
            slot,
            name,
        } => {
            tracing::info!(chapter = %name, slot, "[{index}/{total}] processing chapter");
        }
        CrawlEvent::ImagesFound { name, count } => {
            tracing::info!(chapter = %name, count, "found images");
        }
        CrawlEvent::ChapterSkipped { name, slot } => {
            summary.chapters_skipped += 1;
            tracing::warn!(chapter = %name, slot, "no images found; skipping chapter");
        }
        CrawlEvent::ImageSaved {
            name,
            index,
            total,
            file_name,
        } => {
            summary.images_saved += 1;
            tracing::debug!(chapter = %name, file = %file_name, "[{index}/{total}] saved image");
        }
        CrawlEvent::ImageFailed {
            name,
            file_name,
            url,
            error,
        } => {
            summary.images_failed += 1;
            tracing::warn!(chapter = %name, file = %file_name, %url, %error, "image download failed");
        }
        CrawlEvent::ChapterFinished {
            name,
            downloaded,
            total,
        } => {
            summary.chapters_finished += 1;
            tracing::info!(chapter = %name, "finished: {downloaded}/{total} images");
        }
        CrawlEvent::ChapterFailed { name, error } => {
            summary.chapters_failed += 1;
            tracing::error!(chapter = %name, %error, "chapter failed");
        }
    }
}
