use anyhow::Context as _;
use scraper::Html;

use crate::config::Timing;
use crate::extract::{self, CandidateSet};
use crate::formats::ImageCandidate;
use crate::http::Connector;
use crate::sequence;
use crate::site::{Mirror, SiteProfile};

/// Finds a chapter's images by trying each mirror in priority order.
pub struct MirrorResolver<'a> {
    site: &'a SiteProfile,
    connector: &'a dyn Connector,
    timing: Timing,
}

impl<'a> MirrorResolver<'a> {
    pub fn new(site: &'a SiteProfile, connector: &'a dyn Connector, timing: Timing) -> Self {
        Self {
            site,
            connector,
            timing,
        }
    }

    /// Sequenced images from the first mirror that yields any; empty when none does.
    pub async fn resolve_chapter_images(&self, slot: u32) -> Vec<ImageCandidate> {
        for mirror in &self.site.mirrors {
            match self.try_mirror(mirror, slot).await {
                Ok(found) if !found.is_empty() => {
                    let mut images = found.into_vec();
                    sequence::sequence(&mut images);
                    tracing::debug!(
                        mirror = %mirror.base_domain,
                        slot,
                        count = images.len(),
                        "resolved chapter images"
                    );
                    return images;
                }
                Ok(_) => {
                    tracing::debug!(mirror = %mirror.base_domain, slot, "no images on mirror");
                }
                Err(err) => {
                    tracing::debug!(mirror = %mirror.base_domain, slot, ?err, "mirror failed");
                }
            }
        }

        Vec::new()
    }

    async fn try_mirror(&self, mirror: &Mirror, slot: u32) -> anyhow::Result<CandidateSet> {
        let url = mirror.chapter_url(&self.site.comic_id, slot);
        let session = self
            .connector
            .connect(&mirror.referer)
            .context("open mirror session")?;

        let page = session.get_page(&url, self.timing.content_timeout).await?;
        if !page.is_success() {
            anyhow::bail!("GET {url}: status {}", page.status);
        }

        let mut found = {
            let document = Html::parse_document(&page.body);
            extract::extract(&page.body, &document, self.site)
        };
        if found.is_empty() {
            extract::probe_cdn(
                session.as_ref(),
                self.site,
                &page.body,
                self.timing.probe_timeout,
                &mut found,
            )
            .await;
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubConnector;

    fn site() -> SiteProfile {
        SiteProfile::baozi("demo").with_mirrors(vec![
            Mirror::baozi("https://a.example"),
            Mirror::baozi("https://b.example"),
        ])
    }

    fn chapter_page(urls: &[&str]) -> String {
        let imgs: String = urls
            .iter()
            .map(|u| format!(r#"<img src="{u}" alt="">"#))
            .collect();
        format!("<html><body>{imgs}</body></html>")
    }

    #[tokio::test]
    async fn falls_through_to_mirror_with_images() {
        let site = site();
        let stub = StubConnector::new();
        stub.add_page(
            "https://a.example/comic/chapter/demo/0_3.html",
            200,
            "<html><body><p>nothing here</p></body></html>",
        );
        stub.add_page(
            "https://b.example/comic/chapter/demo/0_3.html",
            200,
            chapter_page(&[
                "https://img.bzcdn.net/scomic/demo/0/0-x/5.jpg",
                "https://img.bzcdn.net/scomic/demo/0/0-x/12.jpg",
                "https://img.bzcdn.net/scomic/demo/0/0-x/1.jpg",
            ]),
        );

        let resolver = MirrorResolver::new(&site, &stub, Timing::default());
        let images = resolver.resolve_chapter_images(3).await;

        let urls: Vec<_> = images.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(
            urls,
            [
                "https://img.bzcdn.net/scomic/demo/0/0-x/1.jpg",
                "https://img.bzcdn.net/scomic/demo/0/0-x/5.jpg",
                "https://img.bzcdn.net/scomic/demo/0/0-x/12.jpg",
            ]
        );

        let referers: Vec<_> = stub
            .requests()
            .into_iter()
            .filter(|r| r.method == "GET")
            .map(|r| r.referer)
            .collect();
        assert_eq!(referers, ["https://a.example/", "https://b.example/"]);
    }

    #[tokio::test]
    async fn first_productive_mirror_wins() {
        let site = site();
        let stub = StubConnector::new();
        stub.add_page(
            "https://a.example/comic/chapter/demo/0_0.html",
            200,
            chapter_page(&["https://img.bzcdn.net/scomic/demo/a/1.jpg"]),
        );
        stub.add_page(
            "https://b.example/comic/chapter/demo/0_0.html",
            200,
            chapter_page(&["https://img.bzcdn.net/scomic/demo/b/1.jpg"]),
        );

        let resolver = MirrorResolver::new(&site, &stub, Timing::default());
        let images = resolver.resolve_chapter_images(0).await;

        assert_eq!(images.len(), 1);
        assert_eq!(images[0].url, "https://img.bzcdn.net/scomic/demo/a/1.jpg");
        assert!(
            !stub
                .requested_urls()
                .iter()
                .any(|u| u.starts_with("https://b.example"))
        );
    }

    #[tokio::test]
    async fn failed_and_empty_mirrors_resolve_to_nothing() {
        let site = site();
        let stub = StubConnector::new();
        stub.add_unreachable("https://a.example/comic/chapter/demo/0_7.html");
        stub.add_page(
            "https://b.example/comic/chapter/demo/0_7.html",
            500,
            chapter_page(&["https://img.bzcdn.net/scomic/demo/b/1.jpg"]),
        );

        let resolver = MirrorResolver::new(&site, &stub, Timing::default());
        assert!(resolver.resolve_chapter_images(7).await.is_empty());
    }

    #[tokio::test]
    async fn empty_page_falls_back_to_cdn_probe_on_same_mirror() {
        let site = site().with_cdn_bases(vec![
            "https://cdn.example/scomic/{comic_id}/{section}/{section}-{path_id}".to_owned(),
        ]);
        let stub = StubConnector::new();
        stub.add_page(
            "https://a.example/comic/chapter/demo/0_1.html",
            200,
            r#"<html><body><a href="/comic/demo/0-k2/">next</a></body></html>"#,
        );
        stub.add_existing("https://cdn.example/scomic/demo/0/0-k2/1.jpg");
        stub.add_existing("https://cdn.example/scomic/demo/0/0-k2/2.jpg");

        let resolver = MirrorResolver::new(&site, &stub, Timing::default());
        let images = resolver.resolve_chapter_images(1).await;

        assert_eq!(images.len(), 2);
        assert_eq!(images[1].url, "https://cdn.example/scomic/demo/0/0-k2/2.jpg");
        assert!(
            stub.requests()
                .iter()
                .filter(|r| r.method == "HEAD")
                .all(|r| r.referer == "https://a.example/")
        );
    }
}
