//! Orchestration for Octagon: the fighter loader and merge, the event
//! fallback chain, odds attachment and the analysis runs.
//!
//! [`Pipeline`] is generic over a [`FightStore`] and a [`Sources`] bundle so
//! that tests can run it against an in-memory store and in-process fakes.

use std::sync::Arc;

use octagon_core::{source::Sources, store::FightStore};

mod analysis;
mod events;
mod fighters;
mod odds;

pub mod error;
#[cfg(any(test, feature = "fakes"))]
pub mod fakes;

pub use analysis::{event_prompt, fight_prompt};
pub use error::{PipelineError, Result};
pub use events::{accept_scraped, parse_model_event, select_odds_card};
pub use fighters::Refresh;
pub use odds::match_odds;

/// Tunables for a [`Pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
  /// How long a cached source payload stays fresh. `None` keeps it forever.
  pub cache_ttl:        Option<chrono::Duration>,
  /// Names per third-source batch request.
  pub third_batch_size: usize,
  /// Bouts starting this long after the nearest one share its card.
  pub card_window:      chrono::Duration,
}

impl Default for PipelineSettings {
  fn default() -> Self {
    Self {
      cache_ttl:        None,
      third_batch_size: 20,
      card_window:      chrono::Duration::hours(12),
    }
  }
}

/// Shared handle over the store and the external sources. Cheap to clone.
pub struct Pipeline<S, X> {
  store:    Arc<S>,
  sources:  Arc<X>,
  settings: PipelineSettings,
}

impl<S, X> Clone for Pipeline<S, X> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      sources:  Arc::clone(&self.sources),
      settings: self.settings.clone(),
    }
  }
}

impl<S: FightStore, X: Sources> Pipeline<S, X> {
  pub fn new(store: S, sources: X, settings: PipelineSettings) -> Self {
    Self { store: Arc::new(store), sources: Arc::new(sources), settings }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn sources(&self) -> &X { &self.sources }

  pub fn settings(&self) -> &PipelineSettings { &self.settings }
}
