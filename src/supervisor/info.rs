//! Metadata document printed by `--dump-json`

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoInfo {
    pub id: Option<String>,
    pub title: Option<String>,
    pub fulltitle: Option<String>,
    pub upload_date: Option<String>,
    pub display_id: Option<String>,
    pub duration: Option<f64>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub license: Option<String>,
    pub extractor: Option<String>,
    pub extractor_key: Option<String>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub dislike_count: Option<u64>,
    pub repost_count: Option<u64>,
    pub average_rating: Option<f64>,
    pub uploader: Option<String>,
    pub uploader_id: Option<String>,
    pub player_url: Option<String>,
    pub webpage_url: Option<String>,
    pub webpage_url_basename: Option<String>,
    pub resolution: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<String>,
    pub format_id: Option<String>,
    pub ext: Option<String>,
    #[serde(rename = "filesize")]
    pub file_size: Option<u64>,
    #[serde(rename = "filesize_approx")]
    pub file_size_approx: Option<u64>,
    pub http_headers: Option<HashMap<String, String>>,
    pub categories: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub requested_formats: Option<Vec<VideoFormat>>,
    pub formats: Option<Vec<VideoFormat>>,
    pub thumbnails: Option<Vec<VideoThumbnail>>,
    pub manifest_url: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoFormat {
    pub format_id: Option<String>,
    pub format_note: Option<String>,
    pub format: Option<String>,
    pub ext: Option<String>,
    pub asr: Option<f64>,
    pub tbr: Option<f64>,
    pub abr: Option<f64>,
    pub fps: Option<f64>,
    pub preference: Option<i64>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(rename = "filesize")]
    pub file_size: Option<u64>,
    #[serde(rename = "filesize_approx")]
    pub file_size_approx: Option<u64>,
    pub url: Option<String>,
    pub manifest_url: Option<String>,
    pub http_headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoThumbnail {
    pub id: Option<String>,
    pub url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl VideoInfo {
    /// Decode the first JSON document in `stdout`.
    ///
    /// With `--ignore-errors` a playlist prints one document per entry, and a
    /// failing entry may leave the output truncated after the first.
    pub fn from_dump(stdout: &str) -> Result<Self, serde_json::Error> {
        let mut documents = serde_json::Deserializer::from_str(stdout).into_iter::<VideoInfo>();
        match documents.next() {
            Some(first) => first,
            None => serde_json::from_str(stdout),
        }
    }
}
