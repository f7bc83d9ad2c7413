use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::{CrawlConfig, Timing};
use crate::site::{DEFAULT_CATALOG_URL, DEFAULT_PRIMARY_BASE, SiteProfile};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download every chapter in range and write `chapters_info.json`.
    Crawl(CrawlArgs),
    /// Print the discovered chapter list as JSON lines.
    Chapters(ChaptersArgs),
    /// Print the ordered image URLs of one chapter.
    Images(ImagesArgs),
}

#[derive(Debug, Args)]
pub struct SiteArgs {
    /// Comic identifier as used in the site's URLs.
    #[arg(long)]
    pub comic_id: String,

    /// Primary site; tried first, followed by the built-in mirrors.
    #[arg(long, default_value = DEFAULT_PRIMARY_BASE)]
    pub base_url: String,

    /// Catalog page URL (`{comic_id}` is substituted).
    #[arg(long, default_value = DEFAULT_CATALOG_URL)]
    pub catalog_url: String,

    /// Comic title as it appears in image alt texts.
    #[arg(long)]
    pub title: Option<String>,
}

impl SiteArgs {
    pub fn profile(&self) -> SiteProfile {
        let profile = SiteProfile::baozi(self.comic_id.clone())
            .with_primary(&self.base_url)
            .with_catalog_url(self.catalog_url.clone());
        match &self.title {
            Some(title) => profile.with_title(title.clone()),
            None => profile,
        }
    }
}

#[derive(Debug, Args)]
pub struct CrawlArgs {
    #[command(flatten)]
    pub site: SiteArgs,

    /// Output directory for chapter folders and the manifest.
    #[arg(long, default_value = "images")]
    pub out: String,

    /// Chapters downloaded in parallel.
    #[arg(long, default_value_t = crate::config::DEFAULT_WORKERS)]
    pub workers: usize,

    /// First chapter slot to download (inclusive).
    #[arg(long, default_value_t = 0)]
    pub start: u32,

    /// Last chapter slot to download (inclusive).
    #[arg(long)]
    pub end: Option<u32>,

    /// Pause after each image download.
    #[arg(long, default_value_t = 200)]
    pub image_delay_ms: u64,

    /// Pause between chapter probes when the catalog is unavailable.
    #[arg(long, default_value_t = 500)]
    pub probe_delay_ms: u64,
}

impl CrawlArgs {
    pub fn config(&self) -> CrawlConfig {
        let mut config = CrawlConfig::new(&self.out);
        config.workers = self.workers;
        config.start_slot = self.start;
        config.end_slot = self.end;
        config.timing = Timing {
            image_delay: Duration::from_millis(self.image_delay_ms),
            probe_delay: Duration::from_millis(self.probe_delay_ms),
            ..Timing::default()
        };
        config
    }
}

#[derive(Debug, Args)]
pub struct ChaptersArgs {
    #[command(flatten)]
    pub site: SiteArgs,

    /// Pause between chapter probes when the catalog is unavailable.
    #[arg(long, default_value_t = 500)]
    pub probe_delay_ms: u64,
}

#[derive(Debug, Args)]
pub struct ImagesArgs {
    #[command(flatten)]
    pub site: SiteArgs,

    /// Chapter slot to resolve.
    #[arg(long)]
    pub slot: u32,
}
