use std::io::Write as _;
use std::path::Path;

use anyhow::Context as _;

use crate::formats::Manifest;

/// Writes the manifest as indented UTF-8 JSON, replacing any previous one atomically.
pub fn write(path: &Path, manifest: &Manifest) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("manifest path has no parent: {}", path.display()))?;
    std::fs::create_dir_all(parent)
        .with_context(|| format!("create manifest dir: {}", parent.display()))?;

    let data = serde_json::to_vec_pretty(manifest).context("serialize manifest")?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("create temp manifest in: {}", parent.display()))?;
    tmp.write_all(&data).context("write manifest")?;
    tmp.write_all(b"\n").context("write manifest newline")?;
    tmp.flush().context("flush manifest")?;
    tmp.persist(path)
        .with_context(|| format!("persist manifest: {}", path.display()))?;
    Ok(())
}

pub fn read(path: &Path) -> anyhow::Result<Manifest> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read manifest: {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse manifest: {}", path.display()))
}
