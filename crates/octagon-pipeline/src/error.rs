//! Error type for `octagon-pipeline`.

use thiserror::Error;

/// Source failures never appear here: they are logged and treated as "no
/// data" at the call site.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("event not found: {0}")]
  EventNotFound(String),

  #[error("analysis unavailable: {0}")]
  AnalysisUnavailable(String),
}

impl From<octagon_core::Error> for PipelineError {
  fn from(e: octagon_core::Error) -> Self { Self::AnalysisUnavailable(e.to_string()) }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

pub(crate) fn store_err<E>(e: E) -> PipelineError
where
  E: std::error::Error + Send + Sync + 'static,
{
  PipelineError::Store(Box::new(e))
}
