use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error(transparent)]
    WebDriver(#[from] thirtyfour::error::WebDriverError),
    #[error("{0}")]
    Backend(String),
}

/// Failures the news pipeline knows how to contain.
///
/// Only `KeyPoolEmpty` and `EmptySessionPool` stop a run; everything else is
/// caught where it happens and turned into a sentinel on the affected item.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("browser session unavailable: {0}")]
    SessionUnavailable(#[source] BrowserError),

    #[error("search result shape mismatch: {0}")]
    ExtractionShapeMismatch(String),

    #[error("browser operation failed: {0}")]
    Browser(#[from] BrowserError),

    #[error("invalid search url: {0}")]
    SearchUrl(#[from] url::ParseError),

    #[error("failed to fetch article {link}: {source}")]
    FetchFailure {
        link: String,
        #[source]
        source: BrowserError,
    },

    #[error("analysis endpoint unavailable: {0}")]
    AnalysisUnavailable(String),

    #[error("malformed analysis reply ({reason}): {reply}")]
    AnalysisParseError { reason: &'static str, reply: String },

    #[error("no usable api key configured")]
    KeyPoolEmpty,

    #[error("browser session pool must hold at least one session")]
    EmptySessionPool,
}

impl PipelineError {
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::KeyPoolEmpty | PipelineError::EmptySessionPool
        )
    }
}
