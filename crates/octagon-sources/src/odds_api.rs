//! Client for The Odds API v4.

use octagon_core::{SourceError, odds::OddsEvent, source::OddsFeed};
use reqwest::Client;

use crate::{
  OddsConfig,
  http::{build_client, check_status, transport},
};

#[derive(Clone)]
pub struct OddsApiClient {
  http:   Client,
  config: OddsConfig,
}

impl std::fmt::Debug for OddsApiClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OddsApiClient")
      .field("base_url", &self.config.base_url)
      .field("sport", &self.config.sport)
      .field("configured", &self.is_configured())
      .finish()
  }
}

impl OddsApiClient {
  /// A client without an API key is valid; every call then fails with
  /// [`SourceError::NotConfigured`].
  pub fn new(config: OddsConfig) -> Result<Self, SourceError> {
    let http = build_client(config.timeout_secs, concat!("octagon/", env!("CARGO_PKG_VERSION")))?;
    Ok(Self { http, config })
  }

  pub fn is_configured(&self) -> bool {
    self.config.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
  }
}

impl OddsFeed for OddsApiClient {
  async fn upcoming(&self) -> Result<Vec<OddsEvent>, SourceError> {
    let Some(key) = self.config.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
      return Err(SourceError::NotConfigured("odds API key"));
    };

    let url = format!(
      "{}/sports/{}/odds",
      self.config.base_url.trim_end_matches('/'),
      self.config.sport
    );
    let resp = self
      .http
      .get(url)
      .query(&[
        ("apiKey", key),
        ("regions", self.config.regions.as_str()),
        ("markets", "h2h"),
        ("oddsFormat", "american"),
        ("dateFormat", "iso"),
      ])
      .send()
      .await
      .map_err(transport)?;

    let events: Vec<OddsEvent> = check_status(resp)
      .await?
      .json()
      .await
      .map_err(|e| SourceError::Parse(format!("odds payload: {e}")))?;
    tracing::debug!(count = events.len(), "fetched upcoming odds events");
    Ok(events)
  }
}
