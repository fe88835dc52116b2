//! Octagon server: layered configuration, wiring of the store, sources and
//! pipeline, and the top-level HTTP app.

pub mod error;

pub use error::{Error, Result};

use std::path::{Path, PathBuf};

use axum::Router;
use config::{Config, Environment, File};
use octagon_core::{source::Sources, store::FightStore};
use octagon_pipeline::{Pipeline, PipelineSettings};
use octagon_sources::{LiveSources, LlmConfig, OddsConfig, ScrapeConfig, SourcesConfig};
use octagon_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime configuration: an optional TOML file under `OCTAGON_*`
/// environment variables, nested keys split on `__`
/// (e.g. `OCTAGON_LLM__API_KEY`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  pub cache:      CacheConfig,
  pub llm:        LlmConfig,
  pub odds:       OddsConfig,
  pub scraping:   ScrapeConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Age after which a cached source payload is refetched. Unset keeps
  /// payloads until a forced refresh.
  pub ttl_hours:         Option<u64>,
  pub third_batch_size:  usize,
  pub card_window_hours: u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".into(),
      port:       8000,
      store_path: PathBuf::from("octagon.db"),
      cache:      CacheConfig::default(),
      llm:        LlmConfig::default(),
      odds:       OddsConfig::default(),
      scraping:   ScrapeConfig::default(),
    }
  }
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self { ttl_hours: None, third_batch_size: 20, card_window_hours: 12 }
  }
}

impl ServerConfig {
  /// Read `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> Result<Self> {
    let settings = Config::builder()
      .add_source(File::from(path).required(false))
      .add_source(
        Environment::with_prefix("OCTAGON")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?;
    let mut config: Self = settings.try_deserialize()?;
    config.apply_key_fallbacks(|key| std::env::var(key).ok());
    Ok(config)
  }

  /// Fill unset API keys from `OPENAI_API_KEY` and `ODDS_API_KEY`.
  pub fn apply_key_fallbacks(&mut self, lookup: impl Fn(&str) -> Option<String>) {
    let present = |key: &Option<String>| key.as_deref().is_some_and(|k| !k.trim().is_empty());
    if !present(&self.llm.api_key) {
      self.llm.api_key = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());
    }
    if !present(&self.odds.api_key) {
      self.odds.api_key = lookup("ODDS_API_KEY").filter(|k| !k.trim().is_empty());
    }
  }

  pub fn sources(&self) -> SourcesConfig {
    SourcesConfig {
      llm:      self.llm.clone(),
      odds:     self.odds.clone(),
      scraping: self.scraping.clone(),
    }
  }

  pub fn pipeline_settings(&self) -> PipelineSettings {
    // Clamped to a century; chrono panics on out-of-range durations.
    let hours = |h: u64| chrono::Duration::hours(h.min(876_000) as i64);
    PipelineSettings {
      cache_ttl:        self.cache.ttl_hours.map(hours),
      third_batch_size: self.cache.third_batch_size.max(1),
      card_window:      hours(self.cache.card_window_hours),
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Wiring ───────────────────────────────────────────────────────────────────

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

/// Open the store and build the live sources. Fails without a language-model
/// key.
pub async fn open_pipeline(config: &ServerConfig) -> Result<Pipeline<SqliteStore, LiveSources>> {
  let sources = LiveSources::new(&config.sources())?;
  let store_path = expand_tilde(&config.store_path);
  let store = SqliteStore::open(&store_path).await?;
  tracing::info!(path = %store_path.display(), "opened store");
  Ok(Pipeline::new(store, sources, config.pipeline_settings()))
}

/// The API router with request tracing and permissive CORS.
pub fn app<S, X>(pipeline: Pipeline<S, X>) -> Router
where
  S: FightStore + 'static,
  X: Sources,
{
  octagon_api::api_router(pipeline)
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive())
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use config::FileFormat;
  use octagon_pipeline::fakes::FakeSources;
  use tower::ServiceExt as _;

  use super::*;

  fn from_toml(toml: &str) -> ServerConfig {
    Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn defaults_fill_missing_sections() {
    let config = from_toml("port = 9100\n[cache]\nttl_hours = 24\n");
    assert_eq!(config.port, 9100);
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.llm.model, "gpt-4o-mini");
    assert_eq!(config.odds.sport, "mma_mixed_martial_arts");

    let settings = config.pipeline_settings();
    assert_eq!(settings.cache_ttl, Some(chrono::Duration::hours(24)));
    assert_eq!(settings.third_batch_size, 20);
    assert_eq!(settings.card_window, chrono::Duration::hours(12));
  }

  #[test]
  fn no_ttl_caches_forever() {
    let config = from_toml("");
    assert!(config.pipeline_settings().cache_ttl.is_none());
  }

  #[test]
  fn conventional_key_variables_are_fallbacks() {
    let env = HashMap::from([
      ("OPENAI_API_KEY", "sk-env"),
      ("ODDS_API_KEY", "odds-env"),
    ]);
    let lookup = |k: &str| env.get(k).map(|v| (*v).to_owned());

    let mut config = from_toml("[llm]\napi_key = \"sk-file\"\n");
    config.apply_key_fallbacks(lookup);
    assert_eq!(config.llm.api_key.as_deref(), Some("sk-file"));
    assert_eq!(config.odds.api_key.as_deref(), Some("odds-env"));

    let mut config = from_toml("[llm]\napi_key = \"\"\n");
    config.apply_key_fallbacks(lookup);
    assert_eq!(config.llm.api_key.as_deref(), Some("sk-env"));
  }

  #[tokio::test]
  async fn app_serves_the_api_with_cors() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let pipeline = Pipeline::new(store, FakeSources::default(), PipelineSettings::default());

    let req = Request::builder()
      .uri("/health")
      .header(header::ORIGIN, "http://localhost:3000")
      .body(Body::empty())
      .unwrap();
    let resp = app(pipeline).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
      resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
      "*"
    );
  }
}
