use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub slot: u32,
    pub name: String,
    pub source_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCandidate {
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alt_text: String,
}

impl ImageCandidate {
    pub fn new(url: impl Into<String>, alt_text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            alt_text: alt_text.into(),
        }
    }
}

/// One manifest entry. Field names on disk follow `chapters_info.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterResult {
    pub slot: u32,
    pub name: String,
    #[serde(rename = "dir")]
    pub directory_name: String,
    #[serde(rename = "image_count")]
    pub downloaded_count: usize,
    pub total_images: usize,
}

pub type Manifest = Vec<ChapterResult>;
