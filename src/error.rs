use thiserror::Error;

/// Errors returned by the analysis core.
///
/// The dataflow itself is total over valid frames (see each component's
/// module docs); these two variants cover only construction-time
/// configuration validation and per-tick frame validation.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum AnalysisError {
    #[error("invalid config field `{field}` – {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },
    #[error("invalid frame – {0}")]
    InvalidFrame(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
