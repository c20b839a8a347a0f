pub mod completion;
pub mod config;
pub mod error;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod prompt;
pub mod sanitize;
pub mod server;
pub mod youtube;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A single captioned segment
#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Complete transcript for a video
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    pub video_id: String,
    pub title: String,
    pub language: String,
    pub segments: Vec<Segment>,
}

impl Transcript {
    /// Segment texts joined by a single space
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Seconds from the start to the end of the last segment
    pub fn duration(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.start + s.duration)
            .fold(0.0, f64::max)
    }
}

/// Structured analysis returned by the language model.
///
/// Field names on the wire are camelCase and double as the schema the prompt
/// asks the model to produce; see [`prompt::build_prompt`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub video_title: String,
    pub bluf: String,
    pub tldr: Vec<String>,
    pub executive_summary: ExecutiveSummary,
    pub key_quotes: Vec<KeyQuote>,
    pub quality_score: QualityScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub overview: String,
    pub sections: Vec<SummarySection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarySection {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyQuote {
    pub quote: String,
    pub context: String,
}

/// Informational and promotional ratings, each on a 1-10 scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub informational: f64,
    pub salesly: f64,
    pub analysis: String,
}

pub const SCORE_MIN: f64 = 1.0;
pub const SCORE_MAX: f64 = 10.0;

static VIDEO_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("video id pattern is valid"));

static PATH_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"youtube\.com/(?:embed|shorts|live|v)/([A-Za-z0-9_-]{11})").expect("path id pattern is valid")
});

/// True when `s` is a well-formed 11-character video ID
pub fn is_video_id(s: &str) -> bool {
    VIDEO_ID_RE.is_match(s)
}

/// Extract a video ID from a short link, a youtube.com link, or a bare ID.
///
/// Short links are checked first, then youtube.com links (the `v` query
/// parameter, or an embed/shorts/live path), then the bare-ID form. Returns
/// `None` for anything else.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let candidate = if let Some((_, rest)) = input.split_once("youtu.be/") {
        rest.split(['/', '?', '#']).next()
    } else if input.contains("youtube.com") {
        query_param(input, "v").or_else(|| PATH_ID_RE.captures(input).and_then(|c| c.get(1)).map(|m| m.as_str()))
    } else {
        Some(input)
    };

    candidate.filter(|id| is_video_id(id)).map(str::to_string)
}

fn query_param<'a>(url: &'a str, key: &str) -> Option<&'a str> {
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or(query);
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "dQw4w9WgXcQ";

    #[test]
    fn test_bare_video_id() {
        assert_eq!(extract_video_id(ID), Some(ID.to_string()));
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some(ID.to_string())
        );
    }

    #[test]
    fn test_watch_url_with_extra_params() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?list=PL123&v=dQw4w9WgXcQ&t=120"),
            Some(ID.to_string())
        );
        assert_eq!(
            extract_video_id("https://m.youtube.com/watch?v=dQw4w9WgXcQ#comments"),
            Some(ID.to_string())
        );
    }

    #[test]
    fn test_short_url() {
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ"), Some(ID.to_string()));
        assert_eq!(extract_video_id("youtu.be/dQw4w9WgXcQ?t=42"), Some(ID.to_string()));
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ#t=1"), Some(ID.to_string()));
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ/"), Some(ID.to_string()));
    }

    #[test]
    fn test_all_forms_agree() {
        let forms = [
            format!("https://youtu.be/{ID}"),
            format!("https://www.youtube.com/watch?v={ID}"),
            ID.to_string(),
        ];
        for form in &forms {
            assert_eq!(extract_video_id(form).as_deref(), Some(ID), "input: {form}");
        }
    }

    #[test]
    fn test_path_forms() {
        for path in ["embed", "shorts", "live"] {
            let url = format!("https://www.youtube.com/{path}/{ID}");
            assert_eq!(extract_video_id(&url).as_deref(), Some(ID), "input: {url}");
        }
    }

    #[test]
    fn test_not_a_youtube_reference() {
        assert_eq!(extract_video_id("hello world"), None);
        assert_eq!(extract_video_id("not-a-valid-id"), None);
        assert_eq!(extract_video_id("https://vimeo.com/123456"), None);
    }

    #[test]
    fn test_malformed_ids_rejected() {
        assert_eq!(extract_video_id("https://youtu.be/short"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=toolongvideoid123"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/feed/trending"), None);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(extract_video_id(""), None);
        assert_eq!(extract_video_id("   "), None);
    }

    #[test]
    fn test_whitespace_trimming() {
        assert_eq!(extract_video_id("  dQw4w9WgXcQ  "), Some(ID.to_string()));
    }

    #[test]
    fn test_transcript_text_joins_segments() {
        let t = Transcript {
            video_id: ID.to_string(),
            title: String::new(),
            language: "en".to_string(),
            segments: vec![
                Segment { text: "Hello world".to_string(), start: 0.0, duration: 1.5 },
                Segment { text: "  ".to_string(), start: 1.5, duration: 0.5 },
                Segment { text: "this is a test".to_string(), start: 2.0, duration: 2.0 },
            ],
        };
        assert_eq!(t.text(), "Hello world this is a test");
        assert_eq!(t.duration(), 4.0);
    }
}
