//! Heuristic discovery of chapter image URLs in a fetched page.
//!
//! Each strategy appends to a shared [`CandidateSet`], so a URL found by more
//! than one strategy is kept once, with the data of its first discovery.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::formats::ImageCandidate;
use crate::http::Fetch;
use crate::site::SiteProfile;

/// Image attributes in priority order; lazy loaders park the real URL in the `data-*` ones.
const SOURCE_ATTRS: &[&str] = &["src", "data-src", "data-lazy-src", "data-original", "data-url"];

const PROBE_LIMIT: u32 = 50;
const PROBE_GRACE: u32 = 5;

static TEXT_PATTERNS: LazyLock<Vec<(Regex, usize)>> = LazyLock::new(|| {
    [
        (r#"(?i)https?://[^"\s']+scomic[^"\s']+\.(jpg|png|jpeg|webp)"#, 0),
        (r#"(?i)https?://[^"\s']+bzcdn[^"\s']+\.(jpg|png|jpeg|webp)"#, 0),
        (r#"(?i)https?://[^"\s']+static[^"\s']+comic[^"\s']+\.(jpg|png|jpeg|webp)"#, 0),
        (r#"(?i)https?://[^"\s']+cnbzmg[^"\s']+\.(jpg|png|jpeg|webp)"#, 0),
        (r#"(?i)["'](https?://[^"']+\.(jpg|png|jpeg|webp))["']"#, 1),
    ]
    .into_iter()
    .map(|(pattern, group)| (Regex::new(pattern).expect("valid text pattern"), group))
    .collect()
});

static SCRIPT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?is)["'](https?://[^"']+scomic[^"']+\.(jpg|png|jpeg|webp))["']"#,
        r#"(?is)["'](https?://[^"']+bzcdn[^"']+\.(jpg|png|jpeg|webp))["']"#,
        r"(?is)imageUrls?\s*[:=]\s*\[(.*?)\]",
        r"(?is)images?\s*[:=]\s*\[(.*?)\]",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("valid script pattern"))
    .collect()
});

static EMBEDDED_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://[^\s\[\],"']+\.(jpg|png|jpeg|webp)"#).expect("valid url regex")
});

static CDN_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d+)-([a-z0-9]+)/").expect("valid cdn path regex"));

static IMG: LazyLock<Selector> = LazyLock::new(|| selector("img"));
static SCRIPT: LazyLock<Selector> = LazyLock::new(|| selector("script"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// Insertion-ordered, URL-deduplicated candidates for one page scrape.
#[derive(Debug, Default, Clone)]
pub struct CandidateSet {
    seen: HashSet<String>,
    items: Vec<ImageCandidate>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, alt_text: impl Into<String>) -> bool {
        let url = url.into();
        if self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.items.push(ImageCandidate::new(url, alt_text));
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<ImageCandidate> {
        self.items
    }
}

pub struct Page<'a> {
    pub html: &'a str,
    pub document: &'a Html,
}

type Strategy = fn(&Page<'_>, &SiteProfile, &mut CandidateSet);

const STRATEGIES: &[(&str, Strategy)] = &[
    ("tags", scan_tags),
    ("text", scan_text),
    ("scripts", scan_scripts),
];

/// Runs the document strategies in order over one fresh dedup scope.
pub fn extract(page_html: &str, document: &Html, site: &SiteProfile) -> CandidateSet {
    let page = Page {
        html: page_html,
        document,
    };
    let mut found = CandidateSet::new();
    for (name, strategy) in STRATEGIES {
        let before = found.len();
        strategy(&page, site, &mut found);
        tracing::trace!(strategy = name, added = found.len() - before, "extraction strategy");
    }
    found
}

/// Parses `page_html` and runs [`extract`].
pub fn extract_html(page_html: &str, site: &SiteProfile) -> CandidateSet {
    let document = Html::parse_document(page_html);
    extract(page_html, &document, site)
}

pub fn scan_tags(page: &Page<'_>, site: &SiteProfile, found: &mut CandidateSet) {
    for img in page.document.select(&IMG) {
        let Some(src) = image_source(img) else {
            continue;
        };
        let Some(url) = absolute_url(src) else {
            continue;
        };
        let alt = img.value().attr("alt").unwrap_or_default();

        let marked = site.tag_markers.iter().any(|m| url.contains(m.as_str()));
        if marked || alt_names_comic(alt, site) {
            found.insert(url, alt);
        }
    }
}

pub fn scan_text(page: &Page<'_>, site: &SiteProfile, found: &mut CandidateSet) {
    let compact_id = site.compact_id();
    for (pattern, group) in TEXT_PATTERNS.iter() {
        for caps in pattern.captures_iter(page.html) {
            let Some(url) = caps.get(*group).map(|m| m.as_str()) else {
                continue;
            };
            if found.contains(url) {
                continue;
            }

            let lower = url.to_ascii_lowercase();
            let marked = site.text_markers.iter().any(|m| lower.contains(m.as_str()));
            let names_comic =
                !compact_id.is_empty() && url.replace('-', "").contains(&compact_id);
            if marked || names_comic {
                found.insert(url, "");
            }
        }
    }
}

pub fn scan_scripts(page: &Page<'_>, _site: &SiteProfile, found: &mut CandidateSet) {
    for script in page.document.select(&SCRIPT) {
        let body: String = script.text().collect();
        if body.trim().is_empty() {
            continue;
        }

        for pattern in SCRIPT_PATTERNS.iter() {
            for caps in pattern.captures_iter(&body) {
                let Some(content) = caps.get(1) else {
                    continue;
                };
                for url in EMBEDDED_URL.find_iter(content.as_str()) {
                    found.insert(url.as_str(), "");
                }
            }
        }
    }
}

/// The `{section}-{path_id}` pair the CDN uses for a chapter, if the page leaks one.
pub fn cdn_path(page_html: &str) -> Option<(String, String)> {
    let caps = CDN_PATH.captures(page_html)?;
    Some((caps[1].to_owned(), caps[2].to_owned()))
}

/// Last resort: guess `1.jpg`, `2.jpg`, ... under each CDN base and keep what exists.
///
/// A base is abandoned once a probe past the fifth fails before anything was
/// found on it. The first base that yields images ends the search.
pub async fn probe_cdn(
    session: &dyn Fetch,
    site: &SiteProfile,
    page_html: &str,
    timeout: Duration,
    found: &mut CandidateSet,
) -> usize {
    let Some((section, path_id)) = cdn_path(page_html) else {
        return 0;
    };

    let before = found.len();
    for base in site.cdn_bases(&section, &path_id) {
        let mut hits = 0_u32;
        for number in 1..=PROBE_LIMIT {
            let url = format!("{base}/{number}.jpg");
            if session.exists(&url, timeout).await {
                if found.insert(url, format!("image {number}")) {
                    hits += 1;
                }
            } else if hits == 0 && number > PROBE_GRACE {
                break;
            }
        }
        tracing::debug!(base = %base, hits, "cdn probe");
        if !found.is_empty() {
            break;
        }
    }

    found.len() - before
}

fn image_source(img: ElementRef<'_>) -> Option<&str> {
    SOURCE_ATTRS.iter().find_map(|attr| {
        img.value()
            .attr(attr)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    })
}

fn absolute_url(src: &str) -> Option<String> {
    if let Some(rest) = src.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    if src.starts_with("http://") || src.starts_with("https://") {
        return Some(src.to_owned());
    }
    None
}

fn alt_names_comic(alt: &str, site: &SiteProfile) -> bool {
    if alt.is_empty() {
        return false;
    }
    let names_title = site
        .comic_title
        .as_deref()
        .is_some_and(|title| !title.is_empty() && alt.contains(title));
    if names_title {
        return true;
    }
    let compact_id = site.compact_id();
    !compact_id.is_empty() && alt.replace('-', "").contains(&compact_id)
}
