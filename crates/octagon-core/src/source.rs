//! Traits for the external data sources.
//!
//! Implemented by the HTTP clients in `octagon-sources` and by in-process
//! fakes in tests. The pipeline only ever talks to these traits, through a
//! [`Sources`] bundle of explicitly constructed handles.

use std::{collections::HashMap, future::Future};

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::{
  SourceError,
  event::NewEvent,
  fighter::{Source, normalize_name},
  odds::OddsEvent,
};

/// A stream of text chunks from a streaming model reply.
pub type TextStream = BoxStream<'static, Result<String, SourceError>>;

// ─── Chat ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  System,
  User,
  Assistant,
}

/// One role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub role:    Role,
  pub content: String,
}

impl ChatMessage {
  pub fn system(content: impl Into<String>) -> Self {
    Self { role: Role::System, content: content.into() }
  }

  pub fn user(content: impl Into<String>) -> Self {
    Self { role: Role::User, content: content.into() }
  }
}

/// What shape of reply a call site expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyFormat {
  Text,
  /// Ask the model for a single JSON object.
  Json,
}

/// A chat-completion language model.
pub trait ChatModel: Send + Sync {
  /// Run a non-streaming completion and return the reply text.
  fn complete<'a>(
    &'a self,
    messages: &'a [ChatMessage],
    format: ReplyFormat,
  ) -> impl Future<Output = Result<String, SourceError>> + Send + 'a;

  /// Start a streaming completion.
  fn stream<'a>(
    &'a self,
    messages: &'a [ChatMessage],
  ) -> impl Future<Output = Result<TextStream, SourceError>> + Send + 'a;
}

// ─── Fighter sources ─────────────────────────────────────────────────────────

/// A provider of raw per-fighter payloads.
pub trait FighterSource: Send + Sync {
  /// Which slot of the fighter record this source fills.
  fn source(&self) -> Source;

  /// Fetch the raw payload for one fighter. `Ok(None)` means the source had
  /// nothing for this name.
  fn fetch_profile<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<serde_json::Value>, SourceError>> + Send + 'a;

  /// Fetch payloads for several fighters, keyed by the normalised requested
  /// name. The default fetches one at a time and skips failures.
  fn fetch_batch<'a>(
    &'a self,
    names: &'a [String],
  ) -> impl Future<Output = Result<HashMap<String, serde_json::Value>, SourceError>> + Send + 'a
  {
    async move {
      let mut found = HashMap::new();
      for name in names {
        match self.fetch_profile(name).await {
          Ok(Some(payload)) => {
            found.insert(normalize_name(name), payload);
          }
          Ok(None) => {}
          Err(e) => {
            tracing::warn!(source = %self.source(), fighter = %name, error = %e, "batch fetch failed");
          }
        }
      }
      Ok(found)
    }
  }
}

// ─── Events and odds ─────────────────────────────────────────────────────────

/// Scrapes the next scheduled event from a listing site.
pub trait EventScraper: Send + Sync {
  fn next_event(
    &self,
  ) -> impl Future<Output = Result<Option<NewEvent>, SourceError>> + Send + '_;
}

/// The odds-market API.
pub trait OddsFeed: Send + Sync {
  /// Every upcoming event in the configured sport, with bookmaker markets.
  fn upcoming(
    &self,
  ) -> impl Future<Output = Result<Vec<OddsEvent>, SourceError>> + Send + '_;
}

// ─── Bundle ──────────────────────────────────────────────────────────────────

/// The set of source handles one pipeline runs against.
pub trait Sources: Send + Sync + 'static {
  type Stats: FighterSource;
  type Bio: FighterSource;
  type Third: FighterSource;
  type Scraper: EventScraper;
  type Odds: OddsFeed;
  type Model: ChatModel;

  fn stats(&self) -> &Self::Stats;
  fn bio(&self) -> &Self::Bio;
  fn third(&self) -> &Self::Third;
  fn scraper(&self) -> &Self::Scraper;
  fn odds(&self) -> &Self::Odds;
  fn model(&self) -> &Self::Model;
}
