//! Deserialisable settings for each client.
//!
//! Every field has a default so a partial `[llm]`, `[odds]` or `[scraping]`
//! table in the server config is enough.

use std::time::Duration;

use serde::Deserialize;

use crate::RetryPolicy;

/// Settings for the OpenAI-compatible chat-completion API.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
  pub api_key:            Option<String>,
  pub base_url:           String,
  pub model:              String,
  pub temperature:        f32,
  pub timeout_secs:       u64,
  pub retry_attempts:     u32,
  pub initial_backoff_ms: u64,
  pub backoff_factor:     u32,
}

impl Default for LlmConfig {
  fn default() -> Self {
    Self {
      api_key:            None,
      base_url:           "https://api.openai.com/v1".into(),
      model:              "gpt-4o-mini".into(),
      temperature:        0.4,
      timeout_secs:       60,
      retry_attempts:     5,
      initial_backoff_ms: 1000,
      backoff_factor:     2,
    }
  }
}

impl LlmConfig {
  pub fn is_configured(&self) -> bool {
    self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
  }

  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy {
      attempts: self.retry_attempts.max(1),
      initial:  Duration::from_millis(self.initial_backoff_ms),
      factor:   self.backoff_factor.max(1),
    }
  }
}

/// Settings for The Odds API.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OddsConfig {
  pub api_key:      Option<String>,
  pub base_url:     String,
  pub sport:        String,
  pub regions:      String,
  pub timeout_secs: u64,
}

impl Default for OddsConfig {
  fn default() -> Self {
    Self {
      api_key:      None,
      base_url:     "https://api.the-odds-api.com/v4".into(),
      sport:        "mma_mixed_martial_arts".into(),
      regions:      "us".into(),
      timeout_secs: 10,
    }
  }
}

/// Settings shared by the HTML scrapers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
  pub stats_base_url: String,
  pub bio_base_url:   String,
  pub user_agent:     String,
  pub timeout_secs:   u64,
}

impl Default for ScrapeConfig {
  fn default() -> Self {
    Self {
      stats_base_url: "http://ufcstats.com".into(),
      bio_base_url:   "https://www.sherdog.com".into(),
      user_agent:     concat!("octagon/", env!("CARGO_PKG_VERSION")).into(),
      timeout_secs:   10,
    }
  }
}

/// Everything needed to build a [`crate::LiveSources`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
  pub llm:      LlmConfig,
  pub odds:     OddsConfig,
  pub scraping: ScrapeConfig,
}
