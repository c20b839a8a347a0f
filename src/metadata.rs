//! Video metadata from the YouTube Data API, for display only.

use std::collections::HashMap;
use std::sync::LazyLock;

use eyre::{Result, bail};
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

const VIDEOS_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/videos";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub channel_title: String,
    pub thumbnail_url: Option<String>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    /// ISO 8601, e.g. `PT4M13S`
    pub duration: String,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: Snippet,
    statistics: Option<Statistics>,
    #[serde(rename = "contentDetails")]
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "channelTitle", default)]
    channel_title: String,
    #[serde(default)]
    thumbnails: HashMap<String, Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct Statistics {
    #[serde(rename = "viewCount")]
    view_count: Option<String>,
    #[serde(rename = "likeCount")]
    like_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: String,
}

impl From<VideoItem> for VideoInfo {
    fn from(item: VideoItem) -> Self {
        let thumbnail_url = ["high", "medium", "default"]
            .iter()
            .find_map(|size| item.snippet.thumbnails.get(*size))
            .map(|t| t.url.clone());
        let (view_count, like_count) = item
            .statistics
            .map(|s| {
                (
                    s.view_count.and_then(|v| v.parse().ok()),
                    s.like_count.and_then(|v| v.parse().ok()),
                )
            })
            .unwrap_or_default();

        VideoInfo {
            id: item.id,
            title: item.snippet.title,
            description: item.snippet.description,
            channel_title: item.snippet.channel_title,
            thumbnail_url,
            view_count,
            like_count,
            duration: item.content_details.map(|c| c.duration).unwrap_or_default(),
        }
    }
}

/// Look up a video. `Ok(None)` when the API knows no such video.
pub async fn fetch_video_info(client: &reqwest::Client, api_key: &str, video_id: &str) -> Result<Option<VideoInfo>> {
    debug!("Fetching video info for {video_id}");

    let resp = client
        .get(VIDEOS_ENDPOINT)
        .query(&[
            ("part", "snippet,statistics,contentDetails"),
            ("id", video_id),
            ("key", api_key),
        ])
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("YouTube Data API returned {status}: {body}");
    }

    let list: VideoListResponse = resp.json().await?;
    Ok(list.items.into_iter().next().map(VideoInfo::from))
}

static ISO_DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").expect("duration pattern is valid")
});

/// `PT1H2M3S` -> `01:02:03`, `PT4M13S` -> `04:13`. Hours appear only when
/// present; minutes and seconds are always two digits.
pub fn format_duration(iso: &str) -> String {
    let Some(caps) = ISO_DURATION_RE.captures(iso) else {
        return "00:00".to_string();
    };
    let part = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or("");

    let mut parts = Vec::with_capacity(3);
    if !part(1).is_empty() {
        parts.push(format!("{:0>2}", part(1)));
    }
    parts.push(format!("{:0>2}", part(2)));
    parts.push(format!("{:0>2}", part(3)));
    parts.join(":")
}

/// Seconds as `h:mm:ss`, or `m:ss` under an hour
pub fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Compact English notation with at most one decimal: `1234` -> `1.2K`
pub fn format_compact_number(n: u64) -> String {
    const UNITS: [(f64, &str); 4] = [(1e3, "K"), (1e6, "M"), (1e9, "B"), (1e12, "T")];

    if n < 1000 {
        return n.to_string();
    }

    let n = n as f64;
    let mut idx = UNITS.iter().rposition(|(scale, _)| n >= *scale).unwrap_or(0);
    let mut value = (n / UNITS[idx].0 * 10.0).round() / 10.0;
    if value >= 1000.0 && idx + 1 < UNITS.len() {
        idx += 1;
        value = (n / UNITS[idx].0 * 10.0).round() / 10.0;
    }

    if value.fract() == 0.0 {
        format!("{value:.0}{}", UNITS[idx].1)
    } else {
        format!("{value:.1}{}", UNITS[idx].1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_info_from_api_item() {
        let json = serde_json::json!({
            "items": [{
                "id": "dQw4w9WgXcQ",
                "snippet": {
                    "title": "Never Gonna Give You Up",
                    "description": "The official video",
                    "channelTitle": "Rick Astley",
                    "thumbnails": {
                        "default": {"url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/default.jpg"},
                        "medium": {"url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/mqdefault.jpg"}
                    }
                },
                "statistics": {"viewCount": "1500000000", "likeCount": "18000000"},
                "contentDetails": {"duration": "PT3M33S"}
            }]
        });
        let list: VideoListResponse = serde_json::from_value(json).unwrap();
        let info = VideoInfo::from(list.items.into_iter().next().unwrap());

        assert_eq!(info.title, "Never Gonna Give You Up");
        assert_eq!(info.channel_title, "Rick Astley");
        assert_eq!(
            info.thumbnail_url.as_deref(),
            Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/mqdefault.jpg")
        );
        assert_eq!(info.view_count, Some(1_500_000_000));
        assert_eq!(info.like_count, Some(18_000_000));
        assert_eq!(info.duration, "PT3M33S");
    }

    #[test]
    fn test_video_info_missing_parts() {
        let json = serde_json::json!({
            "items": [{"id": "abc", "snippet": {"title": "Bare"}}]
        });
        let list: VideoListResponse = serde_json::from_value(json).unwrap();
        let info = VideoInfo::from(list.items.into_iter().next().unwrap());
        assert!(info.thumbnail_url.is_none());
        assert!(info.view_count.is_none());
        assert_eq!(info.duration, "");
    }

    #[test]
    fn test_empty_item_list() {
        let list: VideoListResponse = serde_json::from_str(r#"{"kind": "youtube#videoListResponse"}"#).unwrap();
        assert!(list.items.is_empty());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration("PT1H2M3S"), "01:02:03");
        assert_eq!(format_duration("PT4M13S"), "04:13");
        assert_eq!(format_duration("PT45S"), "00:45");
        assert_eq!(format_duration("PT12H"), "12:00:00");
        assert_eq!(format_duration("P0D"), "00:00");
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.9), "1:05");
        assert_eq!(format_time(3725.0), "1:02:05");
    }

    #[test]
    fn test_format_compact_number() {
        assert_eq!(format_compact_number(999), "999");
        assert_eq!(format_compact_number(1000), "1K");
        assert_eq!(format_compact_number(1234), "1.2K");
        assert_eq!(format_compact_number(15_300), "15.3K");
        assert_eq!(format_compact_number(999_950), "1M");
        assert_eq!(format_compact_number(1_500_000_000), "1.5B");
        assert_eq!(format_compact_number(2_000_000_000_000), "2T");
    }
}
