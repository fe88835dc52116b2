//! Fighter records and the merged profile view.
//!
//! A [`FighterRecord`] is the cache row: the latest raw payload fetched from
//! each source, plus resolved external identifiers. A [`MergedProfile`] is the
//! read model derived from it by [`crate::merge::merge_profile`]; it is never
//! stored.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Source ──────────────────────────────────────────────────────────────────

/// An external provider of per-fighter data.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Source {
  /// The primary stats site.
  Stats,
  /// The secondary bio site.
  Bio,
  /// The tertiary style/history source.
  Third,
}

impl Source {
  /// Every source, in fetch order.
  pub const ALL: [Source; 3] = [Source::Stats, Source::Bio, Source::Third];

  /// The discriminant stored in the `source` column.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Stats => "stats",
      Self::Bio => "bio",
      Self::Third => "third",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "stats" => Ok(Self::Stats),
      "bio" => Ok(Self::Bio),
      "third" => Ok(Self::Third),
      other => Err(Error::UnknownSource(other.to_owned())),
    }
  }

  /// Extract this source's external identifier from a freshly fetched payload.
  ///
  /// - stats: last path segment of `url`
  /// - bio: `url` verbatim
  /// - third: `slug`
  pub fn external_id(self, payload: &serde_json::Value) -> Option<String> {
    match self {
      Self::Stats => payload
        .get("url")
        .and_then(|v| v.as_str())
        .and_then(|url| url.trim_end_matches('/').rsplit('/').next())
        .filter(|s| !s.is_empty())
        .map(str::to_owned),
      Self::Bio => payload
        .get("url")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_owned),
      Self::Third => payload
        .get("slug")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_owned),
    }
  }
}

impl std::fmt::Display for Source {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// The last successfully fetched raw payload for one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePayload {
  pub data:       serde_json::Value,
  pub fetched_at: DateTime<Utc>,
}

/// Identifiers resolved from each source, when known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIds {
  pub stats_id:   Option<String>,
  pub bio_url:    Option<String>,
  pub third_slug: Option<String>,
}

impl ExternalIds {
  pub fn get(&self, source: Source) -> Option<&str> {
    match source {
      Source::Stats => self.stats_id.as_deref(),
      Source::Bio => self.bio_url.as_deref(),
      Source::Third => self.third_slug.as_deref(),
    }
  }

  pub fn set(&mut self, source: Source, id: String) {
    match source {
      Source::Stats => self.stats_id = Some(id),
      Source::Bio => self.bio_url = Some(id),
      Source::Third => self.third_slug = Some(id),
    }
  }
}

/// One cached fighter. Unique by case-insensitive `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FighterRecord {
  pub fighter_id:   Uuid,
  pub name:         String,
  pub external_ids: ExternalIds,
  /// Latest raw payload per source; a missing key means never fetched
  /// successfully.
  pub sources:      BTreeMap<Source, SourcePayload>,
  /// Generic metadata supplied out of band; the third merge tier for
  /// identity fields.
  pub metadata:     Option<serde_json::Value>,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

impl FighterRecord {
  pub fn payload(&self, source: Source) -> Option<&serde_json::Value> {
    self.sources.get(&source).map(|p| &p.data)
  }
}

/// Trim a fighter or event name and collapse inner whitespace runs
/// (including non-breaking spaces) to a single space.
pub fn normalize_name(name: &str) -> String {
  name
    .split(char::is_whitespace)
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

// ─── Merged view ─────────────────────────────────────────────────────────────

/// Fight histories kept side by side, one slot per source. These are never
/// merged by priority because they are not mutually exclusive facts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FightHistory {
  pub stats: serde_json::Value,
  pub bio:   serde_json::Value,
  pub third: serde_json::Value,
}

/// Profile URLs per source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLinks {
  pub stats: Option<String>,
  pub bio:   Option<String>,
  pub third: Option<String>,
}

/// The unified fighter view assembled by field-priority selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedProfile {
  pub name:          String,
  pub nickname:      Option<String>,
  pub record:        Option<String>,
  pub height:        Option<String>,
  pub reach:         Option<String>,
  pub stance:        Option<String>,
  pub dob:           Option<String>,
  pub career_stats:  serde_json::Value,
  pub fight_history: FightHistory,
  pub style_summary: Option<String>,
  pub sources:       SourceLinks,
}
