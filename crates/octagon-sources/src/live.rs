//! The production [`Sources`] bundle.

use octagon_core::{SourceError, source::Sources};

use crate::{
  SourcesConfig,
  odds_api::OddsApiClient,
  openai::OpenAiClient,
  sherdog::BioSiteClient,
  style::StyleSource,
  ufcstats::StatsSiteClient,
};

/// Live HTTP clients built from configuration. The stats-site client serves
/// both as the `stats` fighter source and as the event scraper.
#[derive(Debug, Clone)]
pub struct LiveSources {
  stats: StatsSiteClient,
  bio:   BioSiteClient,
  third: StyleSource<OpenAiClient>,
  odds:  OddsApiClient,
  model: OpenAiClient,
}

impl LiveSources {
  /// Fails if the language-model key is missing; an absent odds key only
  /// disables the odds tier.
  pub fn new(config: &SourcesConfig) -> Result<Self, SourceError> {
    let model = OpenAiClient::new(config.llm.clone())?;
    let odds = OddsApiClient::new(config.odds.clone())?;
    if !odds.is_configured() {
      tracing::warn!("no odds API key configured; odds lookups will be skipped");
    }
    Ok(Self {
      stats: StatsSiteClient::new(&config.scraping)?,
      bio: BioSiteClient::new(&config.scraping)?,
      third: StyleSource::new(model.clone()),
      odds,
      model,
    })
  }
}

impl Sources for LiveSources {
  type Bio = BioSiteClient;
  type Model = OpenAiClient;
  type Odds = OddsApiClient;
  type Scraper = StatsSiteClient;
  type Stats = StatsSiteClient;
  type Third = StyleSource<OpenAiClient>;

  fn stats(&self) -> &Self::Stats { &self.stats }

  fn bio(&self) -> &Self::Bio { &self.bio }

  fn third(&self) -> &Self::Third { &self.third }

  fn scraper(&self) -> &Self::Scraper { &self.stats }

  fn odds(&self) -> &Self::Odds { &self.odds }

  fn model(&self) -> &Self::Model { &self.model }
}
