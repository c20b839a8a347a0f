//! Cleanup and parsing of raw model completions.
//!
//! Completions are untrusted: they may arrive wrapped in markdown fences,
//! carry stray control characters, or put literal line breaks inside string
//! values. [`sanitize`] handles the first two mechanically. [`parse_analysis`]
//! parses the sanitized text and, only if that fails, escapes line breaks that
//! sit inside string literals and parses once more.

use std::sync::LazyLock;

use log::{debug, error};
use regex::Regex;

use crate::error::ParseFailure;
use crate::{AnalysisResult, SCORE_MAX, SCORE_MIN};

const FENCE: &str = "```";

static FENCE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[ \t]*(?:json)?[ \t]*").expect("fence pattern is valid"));

static LEADING_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^```[ \t]*(?:json)?[ \t]*").expect("fence pattern is valid"));

static TRAILING_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```$").expect("fence pattern is valid"));

/// Strip code fences and control characters, then trim.
pub fn sanitize(raw: &str) -> String {
    let unfenced = strip_code_fences(raw);
    strip_control_chars(&unfenced).trim().to_string()
}

/// Sanitize `raw` and parse it into a validated [`AnalysisResult`].
///
/// Logs the raw and cleaned text at error level when both parse attempts fail.
pub fn parse_analysis(raw: &str) -> Result<AnalysisResult, ParseFailure> {
    let cleaned = sanitize(raw);

    let first_err = match decode(&cleaned) {
        Ok(analysis) => return Ok(analysis),
        Err(e) => e,
    };

    let escaped = escape_string_newlines(&cleaned);
    let result = if escaped == cleaned {
        Err(first_err)
    } else {
        debug!("Initial parse failed ({first_err}), retrying with escaped newlines");
        decode(&escaped)
    };

    result.inspect_err(|e| {
        for line in failure_report(raw, &cleaned, e) {
            error!("{line}");
        }
    })
}

/// Diagnostic lines logged when a completion cannot be parsed
fn failure_report(raw: &str, cleaned: &str, err: &ParseFailure) -> [String; 3] {
    [
        format!("Raw response: {raw}"),
        format!("Cleaned response: {cleaned}"),
        format!("JSON parsing error: {err}"),
    ]
}

fn decode(text: &str) -> Result<AnalysisResult, ParseFailure> {
    let analysis: AnalysisResult = serde_json::from_str(text)?;
    check_score("informational", analysis.quality_score.informational)?;
    check_score("salesly", analysis.quality_score.salesly)?;
    Ok(analysis)
}

fn check_score(field: &'static str, value: f64) -> Result<(), ParseFailure> {
    if (SCORE_MIN..=SCORE_MAX).contains(&value) {
        Ok(())
    } else {
        Err(ParseFailure::ScoreOutOfRange { field, value })
    }
}

/// Unwrap the span between the first and the last fence marker, so markers
/// inside string values stay part of the payload.
fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.contains(FENCE) || (trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return trimmed.to_string();
    }

    let (open, close) = (trimmed.find(FENCE), trimmed.rfind(FENCE));
    if let (Some(open), Some(close)) = (open, close) {
        if open < close {
            let inner = &trimmed[open + FENCE.len()..close];
            return FENCE_TAG_RE.replace(inner, "").trim().to_string();
        }
    }

    // Unbalanced: a lone opening or closing marker
    let text = LEADING_FENCE_RE.replace(trimmed, "");
    TRAILING_FENCE_RE.replace(text.trim_end(), "").trim().to_string()
}

/// Drop C0 and C1 control characters other than JSON whitespace.
fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

/// Rewrite raw tab, line feed and carriage return characters found inside
/// string literals as escape sequences. Whitespace between tokens is kept.
fn escape_string_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if !in_string {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
            continue;
        }

        if escaped {
            escaped = false;
            // A backslash directly before a raw break still needs a letter
            match c {
                '\n' => out.push('n'),
                '\r' => out.push('r'),
                '\t' => out.push('t'),
                _ => out.push(c),
            }
            continue;
        }

        match c {
            '\\' => {
                escaped = true;
                out.push(c);
            }
            '"' => {
                in_string = false;
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }

    out
}
