//! In-memory [`Connector`] for unit tests.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;

use crate::http::{Connector, FetchedPage, Fetch};

#[derive(Default)]
struct State {
    pages: HashMap<String, (u16, String)>,
    existing: HashSet<String>,
    images: HashMap<String, Vec<u8>>,
    unreachable: HashSet<String>,
    delays: HashMap<String, Duration>,
    requests: Vec<Request>,
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: &'static str,
    pub url: String,
    pub referer: String,
}

#[derive(Clone, Default)]
pub struct StubConnector {
    state: Arc<Mutex<State>>,
}

impl StubConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&self, url: impl Into<String>, status: u16, body: impl Into<String>) {
        self.lock().pages.insert(url.into(), (status, body.into()));
    }

    pub fn add_existing(&self, url: impl Into<String>) {
        self.lock().existing.insert(url.into());
    }

    pub fn add_image(&self, url: impl Into<String>, bytes: &[u8]) {
        self.lock().images.insert(url.into(), bytes.to_vec());
    }

    pub fn add_unreachable(&self, url: impl Into<String>) {
        self.lock().unreachable.insert(url.into());
    }

    pub fn add_delay(&self, url: impl Into<String>, delay: Duration) {
        self.lock().delays.insert(url.into(), delay);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.lock().requests.clone()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.lock().requests.iter().map(|r| r.url.clone()).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("stub state poisoned")
    }
}

impl Connector for StubConnector {
    fn connect(&self, referer: &str) -> anyhow::Result<Box<dyn Fetch>> {
        Ok(Box::new(StubSession {
            state: Arc::clone(&self.state),
            referer: referer.to_owned(),
        }))
    }
}

struct StubSession {
    state: Arc<Mutex<State>>,
    referer: String,
}

impl StubSession {
    async fn record(&self, method: &'static str, url: &str) -> bool {
        let delay = {
            let mut state = self.state.lock().expect("stub state poisoned");
            state.requests.push(Request {
                method,
                url: url.to_owned(),
                referer: self.referer.clone(),
            });
            if state.unreachable.contains(url) {
                return false;
            }
            state.delays.get(url).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        true
    }
}

#[async_trait]
impl Fetch for StubSession {
    async fn get_page(&self, url: &str, _timeout: Duration) -> anyhow::Result<FetchedPage> {
        if !self.record("GET", url).await {
            anyhow::bail!("connection refused: {url}");
        }
        let state = self.state.lock().expect("stub state poisoned");
        let (status, body) = state
            .pages
            .get(url)
            .cloned()
            .unwrap_or((404, "not found".to_owned()));
        Ok(FetchedPage { status, body })
    }

    async fn exists(&self, url: &str, _timeout: Duration) -> bool {
        if !self.record("HEAD", url).await {
            return false;
        }
        let state = self.state.lock().expect("stub state poisoned");
        state.existing.contains(url) || state.images.contains_key(url)
    }

    async fn download(&self, url: &str, dest: &Path, _timeout: Duration) -> anyhow::Result<u64> {
        if !self.record("GET", url).await {
            anyhow::bail!("connection refused: {url}");
        }
        let bytes = {
            let state = self.state.lock().expect("stub state poisoned");
            state.images.get(url).cloned()
        };
        let bytes = bytes.ok_or_else(|| anyhow::anyhow!("GET {url}: status 404"))?;
        std::fs::write(dest, &bytes).with_context(|| format!("write {}", dest.display()))?;
        Ok(bytes.len() as u64)
    }
}
