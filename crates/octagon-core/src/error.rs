//! Error types for `octagon-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown source discriminant: {0:?}")]
  UnknownSource(String),

  #[error("malformed analysis: {0}")]
  MalformedAnalysis(String),

  #[error("no prediction for {fighter_a} vs {fighter_b}")]
  MissingPrediction {
    fighter_a: String,
    fighter_b: String,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure of a single external source call.
///
/// The pipeline never propagates these to callers of a fighter or event
/// lookup; they are logged and treated as "no data from this source".
#[derive(Debug, Clone, Error)]
pub enum SourceError {
  #[error("{0} is not configured")]
  NotConfigured(&'static str),

  #[error("http error: {0}")]
  Http(String),

  #[error("upstream returned {status}: {body}")]
  Status { status: u16, body: String },

  #[error("unexpected response shape: {0}")]
  Parse(String),
}

impl SourceError {
  /// Whether a retry could plausibly succeed (network failures, throttling
  /// and upstream 5xx).
  pub fn is_transient(&self) -> bool {
    match self {
      Self::Http(_) => true,
      Self::Status { status, .. } => *status == 429 || *status >= 500,
      Self::NotConfigured(_) | Self::Parse(_) => false,
    }
  }
}
