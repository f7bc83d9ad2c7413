//! Static description of the hosting site: mirrors, catalog and CDN layout.

pub const DEFAULT_PRIMARY_BASE: &str = "https://www.twmanga.com";
pub const DEFAULT_CATALOG_URL: &str = "https://www.baozimh.com/comic/{comic_id}";

const DEFAULT_MIRROR_BASES: &[&str] = &[DEFAULT_PRIMARY_BASE, "https://cn.cnbzmg.com"];

const DEFAULT_CDN_BASES: &[&str] = &[
    "https://s1-ogsm1-uspho.bzcdn.net/scomic/{comic_id}/{section}/{section}-{path_id}",
    "https://www.bzcdn.net/scomic/{comic_id}/{section}/{section}-{path_id}",
];

/// Substrings that mark an `<img>` source as comic content.
const TAG_MARKERS: &[&str] = &["scomic", "bzcdn", "cnbzmg", "twmanga"];

/// Substrings accepted by the raw-text scan (matched against the lower-cased URL).
const TEXT_MARKERS: &[&str] = &["scomic", "bzcdn", "comic", "cnbzmg"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mirror {
    pub base_domain: String,
    /// Placeholders: `{comic_id}`, `{slot}`.
    pub chapter_url_template: String,
    pub referer: String,
}

impl Mirror {
    /// Mirror laid out like the baozi family of sites.
    pub fn baozi(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            base_domain: base.to_owned(),
            chapter_url_template: format!("{base}/comic/chapter/{{comic_id}}/0_{{slot}}.html"),
            referer: format!("{base}/"),
        }
    }

    pub fn chapter_url(&self, comic_id: &str, slot: u32) -> String {
        self.chapter_url_template
            .replace("{comic_id}", comic_id)
            .replace("{slot}", &slot.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub comic_id: String,
    pub comic_title: Option<String>,
    /// Placeholder: `{comic_id}`.
    pub catalog_url_template: String,
    /// Priority order; the first entry also drives incremental discovery.
    pub mirrors: Vec<Mirror>,
    /// Placeholders: `{comic_id}`, `{section}`, `{path_id}`.
    pub cdn_base_templates: Vec<String>,
    pub tag_markers: Vec<String>,
    pub text_markers: Vec<String>,
}

impl SiteProfile {
    pub fn baozi(comic_id: impl Into<String>) -> Self {
        Self {
            comic_id: comic_id.into(),
            comic_title: None,
            catalog_url_template: DEFAULT_CATALOG_URL.to_owned(),
            mirrors: DEFAULT_MIRROR_BASES
                .iter()
                .map(|base| Mirror::baozi(base))
                .collect(),
            cdn_base_templates: DEFAULT_CDN_BASES.iter().map(|s| (*s).to_owned()).collect(),
            tag_markers: TAG_MARKERS.iter().map(|s| (*s).to_owned()).collect(),
            text_markers: TEXT_MARKERS.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    /// Puts `base` at the front of the mirror list, dropping any duplicate of it.
    pub fn with_primary(mut self, base: &str) -> Self {
        let primary = Mirror::baozi(base);
        self.mirrors.retain(|m| m.base_domain != primary.base_domain);
        self.mirrors.insert(0, primary);
        self
    }

    pub fn with_catalog_url(mut self, template: impl Into<String>) -> Self {
        self.catalog_url_template = template.into();
        self
    }

    pub fn with_mirrors(mut self, mirrors: Vec<Mirror>) -> Self {
        self.mirrors = mirrors;
        self
    }

    pub fn with_cdn_bases(mut self, templates: Vec<String>) -> Self {
        self.cdn_base_templates = templates;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.comic_title = Some(title.into());
        self
    }

    pub fn catalog_url(&self) -> String {
        self.catalog_url_template.replace("{comic_id}", &self.comic_id)
    }

    pub fn primary(&self) -> Option<&Mirror> {
        self.mirrors.first()
    }

    pub fn cdn_bases(&self, section: &str, path_id: &str) -> Vec<String> {
        self.cdn_base_templates
            .iter()
            .map(|template| {
                template
                    .replace("{comic_id}", &self.comic_id)
                    .replace("{section}", section)
                    .replace("{path_id}", path_id)
            })
            .collect()
    }

    /// Comic identifier with hyphens removed, as it shows up in alt texts and URLs.
    pub fn compact_id(&self) -> String {
        self.comic_id.replace('-', "")
    }
}
