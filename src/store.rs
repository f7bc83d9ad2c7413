use std::path::{Path, PathBuf};

use anyhow::Context as _;

const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const DEFAULT_EXTENSION: &str = ".jpg";

pub fn ensure_output_dir(out_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create output dir: {}", out_dir.display()))?;
    if !out_dir.is_dir() {
        anyhow::bail!("output path is not a directory: {}", out_dir.display());
    }
    Ok(())
}

/// Replaces characters that are illegal in file names with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ILLEGAL_CHARS.contains(&ch) { '_' } else { ch })
        .collect::<String>()
        .trim()
        .to_owned()
}

pub fn chapter_dir_name(slot: u32, name: &str) -> String {
    sanitize_file_name(&format!("{slot:04}_{name}"))
}

/// `0001.jpg`, `0002.png`, ... keeping the URL's extension.
pub fn image_file_name(index: usize, url: &str) -> String {
    format!("{index:04}{}", url_extension(url))
}

fn url_extension(url: &str) -> String {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_owned(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_owned(),
    };
    let file_name = path.rsplit('/').next().unwrap_or_default();
    match file_name.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < file_name.len() => file_name[dot..].to_owned(),
        _ => DEFAULT_EXTENSION.to_owned(),
    }
}

/// Where an image is streamed before it is moved into place.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}
