//! A local stand-in for a comic site: catalog, chapter pages and page images.
//!
//! Slots 1..=3 exist. Every chapter page lists its images out of order; page 2
//! of slot 2 is missing from the CDN.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub const COMIC_ID: &str = "demo-comic";
pub const SLOTS: [u32; 3] = [1, 2, 3];
pub const PAGES: [u32; 3] = [3, 1, 2];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seen {
    pub method: String,
    pub path: String,
    pub referer: Option<String>,
}

pub struct ComicServer {
    pub base_url: String,
    seen: Arc<Mutex<Vec<Seen>>>,
    shutdown: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ComicServer {
    pub fn start() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
        let base_url = format!("http://{}", server.server_addr());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = {
            let base_url = base_url.clone();
            let seen = Arc::clone(&seen);
            thread::spawn(move || {
                loop {
                    if shutdown_rx.try_recv().is_ok() {
                        break;
                    }
                    let request = match server.recv_timeout(Duration::from_millis(50)) {
                        Ok(Some(req)) => req,
                        Ok(None) => continue,
                        Err(_) => break,
                    };

                    let path = request.url().to_string();
                    let referer = request
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv("Referer"))
                        .map(|h| h.value.as_str().to_owned());
                    seen.lock().unwrap().push(Seen {
                        method: request.method().to_string(),
                        path: path.clone(),
                        referer,
                    });

                    let (status, body, content_type) = route(&base_url, &path);
                    let header = tiny_http::Header::from_bytes(
                        &b"Content-Type"[..],
                        content_type.as_bytes(),
                    )
                    .expect("content type header");
                    let _ = request.respond(
                        tiny_http::Response::from_data(body)
                            .with_status_code(status)
                            .with_header(header),
                    );
                }
            })
        };

        Self {
            base_url,
            seen,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn catalog_template(&self) -> String {
        format!("{}/comic/{{comic_id}}", self.base_url)
    }

    pub fn image_url(&self, slot: u32, page: u32) -> String {
        format!("{}/scomic/{COMIC_ID}/0/{slot}/{page}.jpg", self.base_url)
    }

    pub fn requests(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn clear_requests(&self) {
        self.seen.lock().unwrap().clear();
    }
}

impl Drop for ComicServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub fn image_bytes(slot: u32, page: u32) -> Vec<u8> {
    format!("slot {slot} page {page}").into_bytes()
}

fn route(base_url: &str, path: &str) -> (u16, Vec<u8>, &'static str) {
    const HTML: &str = "text/html; charset=utf-8";

    if path == format!("/comic/{COMIC_ID}") {
        let links: String = SLOTS
            .iter()
            .rev()
            .map(|slot| {
                format!(
                    r#"<a href="/user/page_direct?comic_id={COMIC_ID}&amp;section_slot=0&amp;chapter_slot={slot}">第{slot}话</a>"#
                )
            })
            .collect();
        let body = format!("<html><body><div class=\"chapters\">{links}</div></body></html>");
        return (200, body.into_bytes(), HTML);
    }

    if let Some(slot) = path
        .strip_prefix(&format!("/comic/chapter/{COMIC_ID}/0_"))
        .and_then(|rest| rest.strip_suffix(".html"))
        .and_then(|slot| slot.parse::<u32>().ok())
        .filter(|slot| SLOTS.contains(slot))
    {
        let images: String = PAGES
            .iter()
            .map(|page| {
                format!(
                    r#"<img class="comic-contain__item" src="{base_url}/scomic/{COMIC_ID}/0/{slot}/{page}.jpg" alt="{COMIC_ID} page {page}">"#
                )
            })
            .collect();
        let body = format!(
            "<html><head><title>第{slot}话 - Demo Comic</title></head><body>{images}</body></html>"
        );
        return (200, body.into_bytes(), HTML);
    }

    let image = path
        .strip_prefix(&format!("/scomic/{COMIC_ID}/0/"))
        .and_then(|rest| rest.strip_suffix(".jpg"))
        .and_then(|rest| rest.split_once('/'))
        .and_then(|(slot, page)| Some((slot.parse::<u32>().ok()?, page.parse::<u32>().ok()?)));
    match image {
        Some((2, 2)) => (404, b"missing".to_vec(), "text/plain"),
        Some((slot, page)) if SLOTS.contains(&slot) && PAGES.contains(&page) => {
            (200, image_bytes(slot, page), "image/jpeg")
        }
        _ => (404, b"not found".to_vec(), "text/plain"),
    }
}
