//! Startup errors for the server.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("configuration error: {0}")]
  Config(#[from] config::ConfigError),

  #[error("store error: {0}")]
  Store(#[from] octagon_store_sqlite::Error),

  #[error("source setup failed: {0}")]
  Sources(#[from] octagon_sources::SourceError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
