//! The `FightStore` trait and the stored prediction row.
//!
//! The trait is implemented by storage backends (e.g. `octagon-store-sqlite`).
//! The pipeline and HTTP layers depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  event::{EventRecord, NewEvent},
  fighter::{FighterRecord, Source},
};

/// One persisted analysis run. `payload` is the raw model reply as JSON,
/// stored only after it passed validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
  pub prediction_id: Uuid,
  pub event_id:      Uuid,
  pub payload:       serde_json::Value,
  pub created_at:    DateTime<Utc>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the fighter/event cache.
///
/// Fighters and events are unique by case-insensitive name. Writes are
/// upserts keyed on that name, so concurrent loads of the same fighter or
/// event converge on one row.
///
/// All methods return `Send` futures so the trait can be used from axum
/// handlers on a multi-threaded runtime.
pub trait FightStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Fighters ──────────────────────────────────────────────────────────

  /// Return the fighter with this name, creating an empty record first if
  /// none exists. `name` must already be normalised.
  fn get_or_create_fighter<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<FighterRecord, Self::Error>> + Send + 'a;

  /// Look a fighter up by case-insensitive name.
  fn find_fighter<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<FighterRecord>, Self::Error>> + Send + 'a;

  /// Every cached fighter, ordered by name.
  fn list_fighters(
    &self,
  ) -> impl Future<Output = Result<Vec<FighterRecord>, Self::Error>> + Send + '_;

  /// Replace the stored payload for one source, stamp its fetch time and,
  /// when given, record the source's external identifier.
  fn store_source_payload(
    &self,
    fighter_id: Uuid,
    source: Source,
    payload: serde_json::Value,
    external_id: Option<String>,
  ) -> impl Future<Output = Result<FighterRecord, Self::Error>> + Send + '_;

  /// Replace a fighter's out-of-band metadata. Returns `None` if the fighter
  /// does not exist.
  fn set_fighter_metadata(
    &self,
    fighter_id: Uuid,
    metadata: serde_json::Value,
  ) -> impl Future<Output = Result<Option<FighterRecord>, Self::Error>> + Send + '_;

  // ── Events ────────────────────────────────────────────────────────────

  /// Insert the event, or overwrite date, location and card of the existing
  /// event with the same name.
  fn upsert_event(
    &self,
    event: NewEvent,
  ) -> impl Future<Output = Result<EventRecord, Self::Error>> + Send + '_;

  fn get_event(
    &self,
    event_id: Uuid,
  ) -> impl Future<Output = Result<Option<EventRecord>, Self::Error>> + Send + '_;

  /// Look an event up by case-insensitive name.
  fn find_event<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<EventRecord>, Self::Error>> + Send + 'a;

  /// The most recently updated event, if any.
  fn latest_event(
    &self,
  ) -> impl Future<Output = Result<Option<EventRecord>, Self::Error>> + Send + '_;

  /// Every cached event, most recently updated first.
  fn list_events(
    &self,
  ) -> impl Future<Output = Result<Vec<EventRecord>, Self::Error>> + Send + '_;

  // ── Predictions ───────────────────────────────────────────────────────

  /// Append an analysis run for an event.
  fn record_prediction(
    &self,
    event_id: Uuid,
    payload: serde_json::Value,
  ) -> impl Future<Output = Result<PredictionRecord, Self::Error>> + Send + '_;

  /// Every analysis run for an event, newest first.
  fn list_predictions(
    &self,
    event_id: Uuid,
  ) -> impl Future<Output = Result<Vec<PredictionRecord>, Self::Error>> + Send + '_;
}
