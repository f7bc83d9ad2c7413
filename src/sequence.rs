use std::sync::LazyLock;

use regex::Regex;

use crate::formats::ImageCandidate;

static TRAILING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)/(\d+)\.(jpg|png|jpeg|webp)").expect("valid trailing number regex")
});
static ANY_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid digit run regex"));

/// Key for URLs with no usable number; sorts after everything else.
pub const UNNUMBERED: u64 = u64::MAX;

/// Orders candidates by the page number embedded in their URL. Stable, so
/// equal keys keep discovery order and re-sequencing is a no-op.
pub fn sequence(candidates: &mut [ImageCandidate]) {
    candidates.sort_by_key(|candidate| page_number(&candidate.url));
}

pub fn page_number(url: &str) -> u64 {
    if let Some(caps) = TRAILING_NUMBER.captures(url) {
        return caps[1].parse().unwrap_or(UNNUMBERED);
    }

    let file_name = file_name(url);
    ANY_DIGITS
        .find(&file_name)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(UNNUMBERED)
}

fn file_name(url: &str) -> String {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_owned(),
        Err(_) => url.to_owned(),
    };
    path.rsplit('/').next().unwrap_or_default().to_owned()
}
