//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings, UUIDs as hyphenated
//! lowercase strings, and payloads, metadata and fight cards as compact JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use octagon_core::{
  event::{EventRecord, FightPair},
  fighter::{ExternalIds, FighterRecord, Source, SourcePayload},
  store::PredictionRecord,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

/// Fixed width so the text sorts chronologically.
pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_card(card: &[FightPair]) -> Result<String> {
  Ok(serde_json::to_string(card)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read from a `fighters` row.
pub struct RawFighter {
  pub fighter_id: String,
  pub name:       String,
  pub stats_id:   Option<String>,
  pub bio_url:    Option<String>,
  pub third_slug: Option<String>,
  pub metadata:   Option<String>,
  pub created_at: String,
  pub updated_at: String,
}

pub const FIGHTER_COLUMNS: &str = "fighter_id, name, stats_id, bio_url, third_slug, \
                                   metadata, created_at, updated_at";

impl RawFighter {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      fighter_id: row.get(0)?,
      name:       row.get(1)?,
      stats_id:   row.get(2)?,
      bio_url:    row.get(3)?,
      third_slug: row.get(4)?,
      metadata:   row.get(5)?,
      created_at: row.get(6)?,
      updated_at: row.get(7)?,
    })
  }
}

/// Raw strings read from a `fighter_sources` row.
pub struct RawSourceRow {
  pub source:     String,
  pub payload:    String,
  pub fetched_at: String,
}

/// A fighter row together with all of its source rows, read in one
/// transaction.
pub struct RawFighterWithSources {
  pub fighter: RawFighter,
  pub sources: Vec<RawSourceRow>,
}

impl RawFighterWithSources {
  pub fn into_record(self) -> Result<FighterRecord> {
    let f = self.fighter;

    let mut sources = BTreeMap::new();
    for row in self.sources {
      sources.insert(Source::parse(&row.source)?, SourcePayload {
        data:       serde_json::from_str(&row.payload)?,
        fetched_at: decode_dt(&row.fetched_at)?,
      });
    }

    let metadata = f
      .metadata
      .as_deref()
      .map(serde_json::from_str)
      .transpose()?;

    Ok(FighterRecord {
      fighter_id: decode_uuid(&f.fighter_id)?,
      name: f.name,
      external_ids: ExternalIds {
        stats_id:   f.stats_id,
        bio_url:    f.bio_url,
        third_slug: f.third_slug,
      },
      sources,
      metadata,
      created_at: decode_dt(&f.created_at)?,
      updated_at: decode_dt(&f.updated_at)?,
    })
  }
}

/// Raw strings read from an `events` row.
pub struct RawEvent {
  pub event_id:   String,
  pub name:       String,
  pub date:       Option<String>,
  pub location:   Option<String>,
  pub fight_card: String,
  pub created_at: String,
  pub updated_at: String,
}

pub const EVENT_COLUMNS: &str =
  "event_id, name, date, location, fight_card, created_at, updated_at";

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:   row.get(0)?,
      name:       row.get(1)?,
      date:       row.get(2)?,
      location:   row.get(3)?,
      fight_card: row.get(4)?,
      created_at: row.get(5)?,
      updated_at: row.get(6)?,
    })
  }

  pub fn into_event(self) -> Result<EventRecord> {
    Ok(EventRecord {
      event_id:   decode_uuid(&self.event_id)?,
      name:       self.name,
      date:       self.date,
      location:   self.location,
      fight_card: serde_json::from_str(&self.fight_card)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read from a `predictions` row.
pub struct RawPrediction {
  pub prediction_id: String,
  pub event_id:      String,
  pub payload:       String,
  pub created_at:    String,
}

impl RawPrediction {
  pub fn into_prediction(self) -> Result<PredictionRecord> {
    Ok(PredictionRecord {
      prediction_id: decode_uuid(&self.prediction_id)?,
      event_id:      decode_uuid(&self.event_id)?,
      payload:       serde_json::from_str(&self.payload)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}
