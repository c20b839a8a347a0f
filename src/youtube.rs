use async_trait::async_trait;
use eyre::{Result, bail};
use log::debug;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;
use serde::Deserialize;

use crate::pipeline::TranscriptFetcher;
use crate::{Segment, Transcript};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[derive(Debug, Deserialize)]
struct InnerTubePlayerResponse {
    #[serde(rename = "playabilityStatus")]
    playability_status: Option<PlayabilityStatus>,
    captions: Option<CaptionsData>,
    #[serde(rename = "videoDetails")]
    video_details: Option<VideoDetails>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoDetails {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<CaptionTrack>>,
}

#[derive(Debug, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
    /// "asr" for auto-generated tracks
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// Reads a video's published caption track through the InnerTube API
pub struct CaptionFetcher {
    client: reqwest::Client,
    lang: String,
}

impl CaptionFetcher {
    pub fn new(client: reqwest::Client, lang: impl Into<String>) -> Self {
        Self {
            client,
            lang: lang.into(),
        }
    }
}

#[async_trait]
impl TranscriptFetcher for CaptionFetcher {
    async fn fetch(&self, video_id: &str) -> Result<Transcript> {
        fetch_captions(&self.client, video_id, &self.lang).await
    }
}

/// Fetch transcript from YouTube's built-in captions via the InnerTube API
pub async fn fetch_captions(client: &reqwest::Client, video_id: &str, lang: &str) -> Result<Transcript> {
    // Step 1: Fetch the watch page to get the InnerTube API key
    let watch_url = format!("https://www.youtube.com/watch?v={video_id}");
    debug!("Fetching watch page: {watch_url}");

    let page_html = client
        .get(&watch_url)
        .header("User-Agent", USER_AGENT)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let api_key = extract_api_key(&page_html)?;
    debug!("Extracted InnerTube API key: {api_key}");

    // Step 2: Call InnerTube player endpoint
    let player_url = format!("https://www.youtube.com/youtubei/v1/player?key={api_key}&prettyPrint=false");

    let body = serde_json::json!({
        "context": {
            "client": {
                "hl": lang,
                "gl": "US",
                "clientName": "WEB",
                "clientVersion": "2.20241126.01.00"
            }
        },
        "videoId": video_id
    });

    let resp: InnerTubePlayerResponse = client
        .post(&player_url)
        .header("User-Agent", USER_AGENT)
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    if let Some(status) = resp.playability_status.as_ref().filter(|s| s.status != "OK") {
        bail!(
            "video {video_id} is not playable ({}): {}",
            status.status,
            status.reason.as_deref().unwrap_or("no reason given")
        );
    }

    let title = resp
        .video_details
        .as_ref()
        .and_then(|vd| vd.title.clone())
        .unwrap_or_default();

    let tracks = resp
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .and_then(|r| r.caption_tracks)
        .unwrap_or_default();

    let Some(track) = select_track(&tracks, lang) else {
        bail!("no captions available for video {video_id}");
    };

    let actual_lang = track.language_code.clone();
    debug!("Using caption track: lang={actual_lang} generated={}", track.is_generated());

    // Step 3: Fetch the caption XML
    let caption_xml = client
        .get(&track.base_url)
        .header("User-Agent", USER_AGENT)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let segments = parse_caption_xml(&caption_xml)?;
    debug!("Parsed {} caption segments", segments.len());

    Ok(Transcript {
        video_id: video_id.to_string(),
        title,
        language: actual_lang,
        segments,
    })
}

fn extract_api_key(html: &str) -> Result<String> {
    let re = Regex::new(r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#)?;
    if let Some(caps) = re.captures(html) {
        return Ok(caps[1].to_string());
    }

    // Fallback: try the newer pattern
    let re2 = Regex::new(r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#)?;
    if let Some(caps) = re2.captures(html) {
        return Ok(caps[1].to_string());
    }

    bail!("could not extract InnerTube API key from watch page");
}

fn primary_subtag(code: &str) -> &str {
    code.split('-').next().unwrap_or(code)
}

/// Prefer a hand-written track in the exact language, then any track in that
/// language, then the same base language ("en-GB" for "en"), then the first.
fn select_track<'a>(tracks: &'a [CaptionTrack], lang: &str) -> Option<&'a CaptionTrack> {
    tracks
        .iter()
        .find(|t| t.language_code == lang && !t.is_generated())
        .or_else(|| tracks.iter().find(|t| t.language_code == lang))
        .or_else(|| {
            tracks
                .iter()
                .find(|t| primary_subtag(&t.language_code).eq_ignore_ascii_case(primary_subtag(lang)))
        })
        .or_else(|| tracks.first())
}

/// Start and duration in seconds for a cue element. Handles the classic
/// `<text start dur>` format (seconds) and format 3 `<p t d>` (milliseconds).
fn cue_timing(e: &BytesStart<'_>) -> Option<(f64, f64)> {
    let (start_key, dur_key, scale) = match e.name().as_ref() {
        b"text" => (&b"start"[..], &b"dur"[..], 1.0),
        b"p" => (&b"t"[..], &b"d"[..], 1000.0),
        _ => return None,
    };

    let mut start = None;
    let mut dur = None;
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
        if attr.key.as_ref() == start_key {
            start = value;
        } else if attr.key.as_ref() == dur_key {
            dur = value;
        }
    }

    Some((start? / scale, dur.unwrap_or(0.0) / scale))
}

fn parse_caption_xml(xml: &str) -> Result<Vec<Segment>> {
    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current: Option<Segment> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if let Some((start, duration)) = cue_timing(e) {
                    current = Some(Segment {
                        text: String::new(),
                        start,
                        duration,
                    });
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(cue) = current.as_mut() {
                    let raw_text = e.unescape().unwrap_or_default();
                    cue.text.push_str(&html_escape::decode_html_entities(&raw_text));
                }
            }
            Ok(Event::End(ref e)) if matches!(e.name().as_ref(), b"text" | b"p") => {
                if let Some(mut cue) = current.take() {
                    cue.text = cue.text.split_whitespace().collect::<Vec<_>>().join(" ");
                    if !cue.text.is_empty() {
                        segments.push(cue);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("error parsing caption XML: {e}"),
            _ => {}
        }
    }

    Ok(segments)
}
