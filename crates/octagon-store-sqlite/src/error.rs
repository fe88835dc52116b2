//! Error type for `octagon-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] octagon_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("fighter not found: {0}")]
  FighterNotFound(uuid::Uuid),

  #[error("event not found: {0}")]
  EventNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
