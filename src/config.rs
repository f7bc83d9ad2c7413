use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_WORKERS: usize = 5;
pub const MANIFEST_FILE_NAME: &str = "chapters_info.json";

/// Timeouts and politeness delays for every network call the crawler makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// HEAD existence checks during the CDN probe.
    pub probe_timeout: Duration,
    /// Chapter pages fetched while probing for the chapter list.
    pub discovery_timeout: Duration,
    /// Catalog, chapter pages and image downloads.
    pub content_timeout: Duration,
    /// Pause after each incremental discovery probe.
    pub probe_delay: Duration,
    /// Pause after each image download.
    pub image_delay: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(5),
            discovery_timeout: Duration::from_secs(10),
            content_timeout: Duration::from_secs(30),
            probe_delay: Duration::from_millis(500),
            image_delay: Duration::from_millis(200),
        }
    }
}

impl Timing {
    /// No politeness pauses; timeouts unchanged.
    pub fn without_delays(self) -> Self {
        Self {
            probe_delay: Duration::ZERO,
            image_delay: Duration::ZERO,
            ..self
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub output_dir: PathBuf,
    pub workers: usize,
    pub start_slot: u32,
    pub end_slot: Option<u32>,
    pub timing: Timing,
}

impl CrawlConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            workers: DEFAULT_WORKERS,
            start_slot: 0,
            end_slot: None,
            timing: Timing::default(),
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir.join(MANIFEST_FILE_NAME)
    }

    /// Inclusive on both ends; no end means no upper bound.
    pub fn in_range(&self, slot: u32) -> bool {
        slot >= self.start_slot && self.end_slot.is_none_or(|end| slot <= end)
    }
}
