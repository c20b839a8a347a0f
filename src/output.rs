use std::fmt::Write;

use eyre::Result;

use crate::AnalysisResult;
use crate::metadata::{VideoInfo, format_compact_number, format_duration};

fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{score:.0}/10")
    } else {
        format!("{score:.1}/10")
    }
}

/// Render an analysis for the terminal, one block per section
pub fn render_text(analysis: &AnalysisResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", analysis.video_title);
    let _ = writeln!(out, "{}", "=".repeat(analysis.video_title.chars().count()));

    let _ = writeln!(out, "\nBLUF\n  {}", analysis.bluf);

    let _ = writeln!(out, "\nTL;DR");
    for item in &analysis.tldr {
        let _ = writeln!(out, "  • {item}");
    }

    let summary = &analysis.executive_summary;
    let _ = writeln!(out, "\nVideo Summary\n  {}", summary.overview);
    for section in &summary.sections {
        let _ = writeln!(out, "\n  {}", section.title);
        for line in section.content.lines() {
            let _ = writeln!(out, "    {line}");
        }
    }

    let _ = writeln!(out, "\nKey Quotes");
    for quote in &analysis.key_quotes {
        let _ = writeln!(out, "  \"{}\"\n    ({})", quote.quote, quote.context);
    }

    let score = &analysis.quality_score;
    let _ = writeln!(out, "\nQuality Score");
    let _ = writeln!(out, "  Informational: {}", format_score(score.informational));
    let _ = writeln!(out, "  Salesly:       {}", format_score(score.salesly));
    let _ = write!(out, "  {}", score.analysis);

    out
}

/// Render an analysis as a markdown document
pub fn render_markdown(analysis: &AnalysisResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# {}\n", analysis.video_title);
    let _ = writeln!(out, "## BLUF\n\n{}\n", analysis.bluf);

    let _ = writeln!(out, "## TL;DR\n");
    for item in &analysis.tldr {
        let _ = writeln!(out, "- {item}");
    }

    let summary = &analysis.executive_summary;
    let _ = writeln!(out, "\n## Video Summary\n\n{}", summary.overview);
    for section in &summary.sections {
        let _ = writeln!(out, "\n### {}\n\n{}", section.title, section.content);
    }

    let _ = writeln!(out, "\n## Key Quotes");
    for quote in &analysis.key_quotes {
        let _ = writeln!(out, "\n> {}\n\n*{}*", quote.quote, quote.context);
    }

    let score = &analysis.quality_score;
    let _ = writeln!(out, "\n## Quality Score\n");
    let _ = writeln!(out, "- **Informational:** {}", format_score(score.informational));
    let _ = writeln!(out, "- **Salesly:** {}", format_score(score.salesly));
    let _ = write!(out, "\n{}", score.analysis);

    out
}

/// Render an analysis as pretty-printed camelCase JSON
pub fn render_json(analysis: &AnalysisResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(analysis)?)
}

/// Render video metadata as `key: value` lines
pub fn render_video_info(info: &VideoInfo) -> String {
    let count = |n: Option<u64>| n.map(format_compact_number).unwrap_or_else(|| "-".to_string());

    let mut out = String::new();
    let _ = writeln!(out, "Title:    {}", info.title);
    let _ = writeln!(out, "Channel:  {}", info.channel_title);
    let _ = writeln!(out, "Duration: {}", format_duration(&info.duration));
    let _ = writeln!(out, "Views:    {}", count(info.view_count));
    let _ = write!(out, "Likes:    {}", count(info.like_count));
    if let Some(url) = &info.thumbnail_url {
        let _ = write!(out, "\nThumb:    {url}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExecutiveSummary, KeyQuote, QualityScore, SummarySection};

    fn sample_analysis() -> AnalysisResult {
        AnalysisResult {
            video_title: "Test Video".to_string(),
            bluf: "It works.".to_string(),
            tldr: vec!["First".to_string(), "Second".to_string()],
            executive_summary: ExecutiveSummary {
                overview: "An overview.".to_string(),
                sections: vec![SummarySection {
                    title: "Setup".to_string(),
                    content: "Line one\nLine two".to_string(),
                }],
            },
            key_quotes: vec![KeyQuote {
                quote: "Hello world".to_string(),
                context: "Opening".to_string(),
            }],
            quality_score: QualityScore {
                informational: 7.0,
                salesly: 2.5,
                analysis: "Good for beginners.".to_string(),
            },
        }
    }

    #[test]
    fn test_render_text() {
        let output = render_text(&sample_analysis());
        assert!(output.starts_with("Test Video\n==========\n"));
        assert!(output.contains("\nBLUF\n  It works.\n"));
        assert!(output.contains("  • First\n  • Second\n"));
        assert!(output.contains("\n  Setup\n    Line one\n    Line two\n"));
        assert!(output.contains("  \"Hello world\"\n    (Opening)\n"));
        assert!(output.contains("Informational: 7/10"));
        assert!(output.contains("Salesly:       2.5/10"));
        assert!(output.ends_with("  Good for beginners."));
    }

    #[test]
    fn test_render_text_section_order() {
        let output = render_text(&sample_analysis());
        let positions: Vec<usize> = ["BLUF", "TL;DR", "Video Summary", "Key Quotes", "Quality Score"]
            .iter()
            .map(|h| output.find(h).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_render_markdown() {
        let output = render_markdown(&sample_analysis());
        assert!(output.starts_with("# Test Video\n"));
        assert!(output.contains("- First\n- Second\n"));
        assert!(output.contains("### Setup\n\nLine one\nLine two"));
        assert!(output.contains("> Hello world\n\n*Opening*"));
        assert!(output.contains("- **Salesly:** 2.5/10"));
    }

    #[test]
    fn test_render_json_uses_wire_names() {
        let output = render_json(&sample_analysis()).unwrap();
        assert!(output.contains("\"videoTitle\": \"Test Video\""));
        assert!(output.contains("\"executiveSummary\""));
        assert!(output.contains("\"keyQuotes\""));
        let back: AnalysisResult = serde_json::from_str(&output).unwrap();
        assert_eq!(back, sample_analysis());
    }

    #[test]
    fn test_render_video_info() {
        let info = VideoInfo {
            id: "dQw4w9WgXcQ".to_string(),
            title: "Never Gonna Give You Up".to_string(),
            description: String::new(),
            channel_title: "Rick Astley".to_string(),
            thumbnail_url: None,
            view_count: Some(1_234_567),
            like_count: None,
            duration: "PT3M33S".to_string(),
        };
        let output = render_video_info(&info);
        assert!(output.contains("Duration: 03:33"));
        assert!(output.contains("Views:    1.2M"));
        assert!(output.ends_with("Likes:    -"));
    }
}
