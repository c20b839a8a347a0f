use thiserror::Error;

/// Why a completion could not be turned into an [`AnalysisResult`](crate::AnalysisResult)
#[derive(Debug, Error)]
pub enum ParseFailure {
    #[error("invalid analysis JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{field} score {value} is outside 1-10")]
    ScoreOutOfRange { field: &'static str, value: f64 },
}

/// Terminal outcome of a failed analysis request
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("could not resolve a YouTube video ID from {0:?}")]
    InvalidInput(String),

    #[error("no transcript available for video {video_id}")]
    NoTranscript { video_id: String },

    #[error("completion provider failed: {0}")]
    Provider(String),

    #[error(transparent)]
    ParseFailure(#[from] ParseFailure),
}

impl AnalysisError {
    /// Message safe to show an end user; details stay in the log
    pub fn public_message(&self) -> &'static str {
        match self {
            AnalysisError::InvalidInput(_) => "Invalid YouTube URL",
            AnalysisError::NoTranscript { .. } => "No transcript available for this video",
            AnalysisError::Provider(_) => "Failed to generate analysis",
            AnalysisError::ParseFailure(_) => "Failed to parse analysis results",
        }
    }
}
