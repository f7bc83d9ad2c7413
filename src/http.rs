use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use tokio::io::AsyncWriteExt as _;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ACCEPT_VALUE: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE_VALUE: &str = "zh-CN,zh;q=0.9,en;q=0.8";

#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One network session: fixed headers, its own cookie jar.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// GET `url` and return the status with the decoded body. Transport errors
    /// and timeouts are errors; HTTP error statuses are not.
    async fn get_page(&self, url: &str, timeout: Duration) -> anyhow::Result<FetchedPage>;

    /// HEAD-style existence check. True only for a 200 response.
    async fn exists(&self, url: &str, timeout: Duration) -> bool;

    /// Stream `url` into `dest`. Fails on transport errors and non-2xx statuses.
    /// `timeout` bounds waiting for the response and each body chunk, not the
    /// whole transfer.
    async fn download(&self, url: &str, dest: &Path, timeout: Duration) -> anyhow::Result<u64>;
}

/// Builds independent sessions; every caller gets its own.
pub trait Connector: Send + Sync {
    fn connect(&self, referer: &str) -> anyhow::Result<Box<dyn Fetch>>;
}

#[derive(Debug, Clone)]
pub struct HttpConnector {
    user_agent: String,
}

impl HttpConnector {
    pub fn new() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_owned(),
        }
    }

}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for HttpConnector {
    fn connect(&self, referer: &str) -> anyhow::Result<Box<dyn Fetch>> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent).context("user agent header")?,
        );
        headers.insert(REFERER, HeaderValue::from_str(referer).context("referer header")?);
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build http session")?;

        Ok(Box::new(HttpSession { client }))
    }
}

pub struct HttpSession {
    client: reqwest::Client,
}

#[async_trait]
impl Fetch for HttpSession {
    async fn get_page(&self, url: &str, timeout: Duration) -> anyhow::Result<FetchedPage> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("read body: {url}"))?;

        // The sites serve UTF-8 regardless of what the headers claim.
        Ok(FetchedPage {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    async fn exists(&self, url: &str, timeout: Duration) -> bool {
        match self.client.head(url).timeout(timeout).send().await {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(err) => {
                tracing::trace!(url, ?err, "existence probe failed");
                false
            }
        }
    }

    async fn download(&self, url: &str, dest: &Path, timeout: Duration) -> anyhow::Result<u64> {
        let mut response = tokio::time::timeout(timeout, self.client.get(url).send())
            .await
            .map_err(|_| anyhow::anyhow!("GET {url}: no response within {timeout:?}"))?
            .with_context(|| format!("GET {url}"))?;
        if !response.status().is_success() {
            anyhow::bail!("GET {url}: status {}", response.status());
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("create file: {}", dest.display()))?;
        let mut written = 0_u64;
        loop {
            let chunk = tokio::time::timeout(timeout, response.chunk())
                .await
                .map_err(|_| anyhow::anyhow!("read body: {url}: stalled for {timeout:?}"))?
                .with_context(|| format!("read body: {url}"))?;
            let Some(chunk) = chunk else {
                break;
            };
            file.write_all(&chunk)
                .await
                .with_context(|| format!("write file: {}", dest.display()))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .with_context(|| format!("flush file: {}", dest.display()))?;

        Ok(written)
    }
}
