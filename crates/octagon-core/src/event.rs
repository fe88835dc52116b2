//! Events, fight cards, and best-effort event date handling.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fighter::normalize_name;

// ─── Fight card ──────────────────────────────────────────────────────────────

/// One matchup on a card.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FightPair {
  pub fighter_a:    String,
  pub fighter_b:    String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub weight_class: Option<String>,
}

impl FightPair {
  pub fn new(fighter_a: impl Into<String>, fighter_b: impl Into<String>) -> Self {
    Self {
      fighter_a:    fighter_a.into(),
      fighter_b:    fighter_b.into(),
      weight_class: None,
    }
  }

  /// Whether `a` and `b` name the two sides of this pair, in either order,
  /// compared case-insensitively after whitespace normalisation.
  pub fn is_between(&self, a: &str, b: &str) -> bool {
    let (x, y) = (name_key(&self.fighter_a), name_key(&self.fighter_b));
    let (a, b) = (name_key(a), name_key(b));
    (x == a && y == b) || (x == b && y == a)
  }
}

/// Comparison key for names: whitespace-normalised and lowercased.
pub fn name_key(name: &str) -> String { normalize_name(name).to_lowercase() }

// ─── Event ───────────────────────────────────────────────────────────────────

/// A freshly resolved event, before it is upserted into the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
  pub name:       String,
  pub date:       Option<String>,
  pub location:   Option<String>,
  pub fight_card: Vec<FightPair>,
}

impl NewEvent {
  /// A resolved event is usable only with a name and at least one fight.
  pub fn is_complete(&self) -> bool {
    !normalize_name(&self.name).is_empty() && !self.fight_card.is_empty()
  }
}

/// One cached event. Unique by case-insensitive `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
  pub event_id:   Uuid,
  pub name:       String,
  pub date:       Option<String>,
  pub location:   Option<String>,
  /// Card order; the main event comes first.
  pub fight_card: Vec<FightPair>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl EventRecord {
  /// Every distinct fighter on the card, in card order.
  pub fn fighters(&self) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut names = Vec::new();
    for pair in &self.fight_card {
      for name in [&pair.fighter_a, &pair.fighter_b] {
        let name = normalize_name(name);
        if seen.insert(name.to_lowercase()) {
          names.push(name);
        }
      }
    }
    names
  }
}

// ─── Dates ───────────────────────────────────────────────────────────────────

/// A parsed event date. Sources report either an exact start instant or only
/// a calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDate {
  Instant(DateTime<Utc>),
  Day(NaiveDate),
}

impl EventDate {
  /// Parse the date formats seen across sources: RFC 3339, naive
  /// `YYYY-MM-DDTHH:MM:SS` (taken as UTC), ISO days, and long-form days such
  /// as `November 15, 2025` or `Nov 15, 2025`.
  pub fn parse(s: &str) -> Option<Self> {
    let s = normalize_name(s);
    if s.is_empty() {
      return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
      return Some(Self::Instant(dt.with_timezone(&Utc)));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S") {
      return Some(Self::Instant(naive.and_utc()));
    }
    ["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%A, %B %d, %Y", "%d %B %Y"]
      .iter()
      .find_map(|fmt| NaiveDate::parse_from_str(&s, fmt).ok())
      .map(Self::Day)
  }

  /// Strictly after `now`. A day-only date must be a later calendar day than
  /// `now`'s UTC date.
  pub fn is_after(&self, now: DateTime<Utc>) -> bool {
    match self {
      Self::Instant(dt) => *dt > now,
      Self::Day(day) => *day > now.date_naive(),
    }
  }

  /// On a calendar day before `now`'s UTC date.
  pub fn is_before_day_of(&self, now: DateTime<Utc>) -> bool {
    let day = match self {
      Self::Instant(dt) => dt.date_naive(),
      Self::Day(day) => *day,
    };
    day < now.date_naive()
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 11, 10, 18, 0, 0).unwrap() }

  #[test]
  fn parses_known_formats() {
    assert_eq!(
      EventDate::parse("2025-11-15T23:00:00Z"),
      Some(EventDate::Instant(Utc.with_ymd_and_hms(2025, 11, 15, 23, 0, 0).unwrap()))
    );
    let day = NaiveDate::from_ymd_opt(2025, 11, 15).unwrap();
    assert_eq!(EventDate::parse("2025-11-15"), Some(EventDate::Day(day)));
    assert_eq!(EventDate::parse("November 15, 2025"), Some(EventDate::Day(day)));
    assert_eq!(EventDate::parse(" Nov  15, 2025 "), Some(EventDate::Day(day)));
    assert_eq!(EventDate::parse("sometime soon"), None);
    assert_eq!(EventDate::parse(""), None);
  }

  #[test]
  fn day_only_dates_compare_by_calendar_day() {
    let today = EventDate::Day(now().date_naive());
    let tomorrow = EventDate::Day(now().date_naive() + Duration::days(1));
    assert!(!today.is_after(now()));
    assert!(tomorrow.is_after(now()));
    assert!(!today.is_before_day_of(now()));
  }

  #[test]
  fn instants_compare_strictly() {
    assert!(!EventDate::Instant(now()).is_after(now()));
    assert!(EventDate::Instant(now() + Duration::seconds(1)).is_after(now()));
    assert!(EventDate::Instant(now() - Duration::days(2)).is_before_day_of(now()));
  }

  #[test]
  fn pair_matching_ignores_case_order_and_spacing() {
    let pair = FightPair::new("Jon Jones", "Stipe  Miocic");
    assert!(pair.is_between("stipe miocic", "JON JONES"));
    assert!(!pair.is_between("Jon Jones", "Tom Aspinall"));
  }

  #[test]
  fn fighters_are_deduplicated_in_card_order() {
    let event = EventRecord {
      event_id:   Uuid::new_v4(),
      name:       "UFC 309".into(),
      date:       None,
      location:   None,
      fight_card: vec![
        FightPair::new("Jon Jones", "Stipe Miocic"),
        FightPair::new("jon jones", "Tom Aspinall"),
      ],
      created_at: now(),
      updated_at: now(),
    };
    assert_eq!(event.fighters(), vec!["Jon Jones", "Stipe Miocic", "Tom Aspinall"]);
  }
}
