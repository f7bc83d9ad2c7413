//! Chapter list discovery: the catalog page first, slot-by-slot probing as a fallback.

use std::collections::HashSet;
use std::sync::LazyLock;

use anyhow::Context as _;
use regex::Regex;
use scraper::{Html, Selector};

use crate::config::Timing;
use crate::formats::Chapter;
use crate::http::Connector;
use crate::site::SiteProfile;

pub const PROBE_CEILING: u32 = 500;
pub const MAX_CONSECUTIVE_MISSES: u32 = 5;

static CHAPTER_SLOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"chapter_slot=(\d+)").expect("valid chapter slot regex"));
static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("static selector"));

pub struct ChapterDiscovery<'a> {
    site: &'a SiteProfile,
    connector: &'a dyn Connector,
    timing: Timing,
}

impl<'a> ChapterDiscovery<'a> {
    pub fn new(site: &'a SiteProfile, connector: &'a dyn Connector, timing: Timing) -> Self {
        Self {
            site,
            connector,
            timing,
        }
    }

    /// Never fails: an unreachable site yields an empty list.
    pub async fn discover(&self) -> Vec<Chapter> {
        match self.from_catalog().await {
            Ok(chapters) if !chapters.is_empty() => {
                tracing::info!(count = chapters.len(), "found chapters in catalog");
                return chapters;
            }
            Ok(_) => tracing::warn!("catalog lists no chapters; probing slots instead"),
            Err(err) => tracing::warn!(?err, "catalog unavailable; probing slots instead"),
        }

        let chapters = self.by_probing().await;
        tracing::info!(count = chapters.len(), "found chapters by probing");
        chapters
    }

    pub async fn from_catalog(&self) -> anyhow::Result<Vec<Chapter>> {
        let url = self.site.catalog_url();
        let primary = self
            .site
            .primary()
            .ok_or_else(|| anyhow::anyhow!("site has no mirrors"))?;
        let session = self
            .connector
            .connect(&primary.referer)
            .context("open catalog session")?;

        let page = session.get_page(&url, self.timing.content_timeout).await?;
        if !page.is_success() {
            anyhow::bail!("GET {url}: status {}", page.status);
        }
        Ok(parse_catalog(&page.body))
    }

    pub async fn by_probing(&self) -> Vec<Chapter> {
        let Some(primary) = self.site.primary() else {
            return Vec::new();
        };
        let session = match self.connector.connect(&primary.referer) {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(?err, "cannot open probe session");
                return Vec::new();
            }
        };

        let mut chapters = Vec::new();
        let mut cursor = SlotCursor::new(PROBE_CEILING, MAX_CONSECUTIVE_MISSES);
        while let Some(slot) = cursor.next_slot() {
            let url = primary.chapter_url(&self.site.comic_id, slot);
            let title = match session.get_page(&url, self.timing.discovery_timeout).await {
                Ok(page) if page.status == 200 => page_title(&page.body),
                Ok(page) => {
                    tracing::debug!(slot, status = page.status, "probe miss");
                    None
                }
                Err(err) => {
                    tracing::debug!(slot, ?err, "probe failed");
                    None
                }
            };

            cursor.record(title.is_some());
            if let Some(title) = title {
                let name = chapter_name_from_title(&title, slot);
                tracing::info!(slot, chapter = %name, "found chapter");
                chapters.push(Chapter {
                    slot,
                    name,
                    source_url: url,
                });
            }

            if !self.timing.probe_delay.is_zero() {
                tokio::time::sleep(self.timing.probe_delay).await;
            }
        }

        chapters
    }
}

/// Chapters linked from a catalog page, unique by slot, ascending.
pub fn parse_catalog(html: &str) -> Vec<Chapter> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut chapters = Vec::new();

    for link in document.select(&LINK) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some(slot) = CHAPTER_SLOT
            .captures(href)
            .and_then(|caps| caps[1].parse::<u32>().ok())
        else {
            continue;
        };
        if !seen.insert(slot) {
            continue;
        }

        let name = link.text().map(str::trim).collect::<String>();
        chapters.push(Chapter {
            slot,
            name,
            source_url: href.to_owned(),
        });
    }

    chapters.sort_by_key(|chapter| chapter.slot);
    chapters
}

fn page_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&TITLE)
        .next()
        .map(|title| title.text().collect::<String>().trim().to_owned())
}

/// Text before the first `-` of a page title, or `Chapter N` when there is none.
pub fn chapter_name_from_title(title: &str, slot: u32) -> String {
    match title.split_once('-') {
        Some((name, _)) => name.trim().to_owned(),
        None => format!("Chapter {slot}"),
    }
}

/// Walks slots upward from zero and stops at the ceiling or after too many
/// misses in a row.
#[derive(Debug, Clone)]
pub struct SlotCursor {
    next: u32,
    ceiling: u32,
    misses: u32,
    max_misses: u32,
}

impl SlotCursor {
    pub fn new(ceiling: u32, max_misses: u32) -> Self {
        Self {
            next: 0,
            ceiling,
            misses: 0,
            max_misses,
        }
    }

    pub fn next_slot(&mut self) -> Option<u32> {
        if self.misses >= self.max_misses || self.next >= self.ceiling {
            return None;
        }
        let slot = self.next;
        self.next += 1;
        Some(slot)
    }

    pub fn record(&mut self, found: bool) {
        if found {
            self.misses = 0;
        } else {
            self.misses += 1;
        }
    }
}
