//! The analysis request pipeline.
//!
//! One request moves through these stages, in order, on a single task:
//!
//! ```text
//! Start -> FetchingTranscript -> { NoTranscript | Completing }
//! Completing -> { ProviderError | Sanitizing }
//! Sanitizing -> Parsing -> { ParseFailure | Done }
//! ```
//!
//! Every failure is terminal for the request and nothing is retried.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};

use crate::error::AnalysisError;
use crate::metadata::format_time;
use crate::{AnalysisResult, Transcript, prompt, sanitize};

/// Source of transcripts for a video ID
#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    async fn fetch(&self, video_id: &str) -> eyre::Result<Transcript>;
}

/// Language-model endpoint that turns a prompt into free text
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> eyre::Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    FetchingTranscript,
    NoTranscript,
    Completing,
    ProviderError,
    Sanitizing,
    Parsing,
    ParseFailure,
    Done,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Stage::NoTranscript | Stage::ProviderError | Stage::ParseFailure | Stage::Done
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "START",
            Stage::FetchingTranscript => "FETCHING_TRANSCRIPT",
            Stage::NoTranscript => "NO_TRANSCRIPT",
            Stage::Completing => "COMPLETING",
            Stage::ProviderError => "PROVIDER_ERROR",
            Stage::Sanitizing => "SANITIZING",
            Stage::Parsing => "PARSING",
            Stage::ParseFailure => "PARSE_FAILURE",
            Stage::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Runs the fetch, prompt, complete, parse sequence for one video
#[derive(Clone)]
pub struct Analyzer {
    fetcher: Arc<dyn TranscriptFetcher>,
    provider: Arc<dyn CompletionProvider>,
}

impl Analyzer {
    pub fn new(fetcher: Arc<dyn TranscriptFetcher>, provider: Arc<dyn CompletionProvider>) -> Self {
        Self { fetcher, provider }
    }

    /// Analyze the video with the given ID
    pub async fn analyze(&self, video_id: &str) -> Result<AnalysisResult, AnalysisError> {
        let mut stage = Stage::Start;
        let result = self.run(video_id, &mut stage).await;
        info!("Analysis of {video_id} finished: {stage}");
        result
    }

    /// Drive one request, leaving the last stage reached in `stage`
    async fn run(&self, video_id: &str, stage: &mut Stage) -> Result<AnalysisResult, AnalysisError> {
        let mut advance = |next: Stage| {
            debug!("[{video_id}] {stage} -> {next}");
            *stage = next;
        };

        advance(Stage::FetchingTranscript);
        let transcript = match self.fetcher.fetch(video_id).await {
            Ok(t) => {
                debug!("Transcript for {video_id} spans {}", format_time(t.duration()));
                t.text()
            }
            Err(e) => {
                warn!("Failed to fetch transcript for {video_id}: {e:#}");
                String::new()
            }
        };
        if transcript.is_empty() {
            advance(Stage::NoTranscript);
            return Err(AnalysisError::NoTranscript {
                video_id: video_id.to_string(),
            });
        }
        debug!("Transcript for {video_id}: {} chars", transcript.len());

        advance(Stage::Completing);
        let prompt = prompt::build_prompt(&transcript);
        let raw = match self.provider.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                advance(Stage::ProviderError);
                warn!("Completion request for {video_id} failed: {e:#}");
                return Err(AnalysisError::Provider(format!("{e:#}")));
            }
        };

        advance(Stage::Sanitizing);
        advance(Stage::Parsing);
        match sanitize::parse_analysis(&raw) {
            Ok(analysis) => {
                advance(Stage::Done);
                Ok(analysis)
            }
            Err(e) => {
                advance(Stage::ParseFailure);
                Err(e.into())
            }
        }
    }
}
