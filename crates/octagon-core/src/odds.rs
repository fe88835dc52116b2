//! Odds-market payload shape and the per-fight odds view.
//!
//! The nested `events[].bookmakers[].markets[].outcomes[]` layout is owned by
//! the odds vendor; only the fields the pipeline reads are modelled, and
//! everything else is ignored on deserialisation.

use serde::{Deserialize, Serialize};

/// One upcoming market event. For MMA this is a single bout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsEvent {
  #[serde(default)]
  pub id:            String,
  #[serde(default)]
  pub sport_title:   String,
  /// RFC 3339 start time.
  pub commence_time: String,
  #[serde(default)]
  pub home_team:     Option<String>,
  #[serde(default)]
  pub away_team:     Option<String>,
  #[serde(default)]
  pub bookmakers:    Vec<Bookmaker>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmaker {
  #[serde(default)]
  pub key:     String,
  pub title:   String,
  #[serde(default)]
  pub markets: Vec<Market>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
  pub key:      String,
  #[serde(default)]
  pub outcomes: Vec<Outcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
  pub name:  String,
  /// American odds, e.g. `-250.0` or `+180.0`.
  pub price: f64,
}

impl OddsEvent {
  /// The two sides of the bout, when the vendor names them.
  pub fn sides(&self) -> Option<(&str, &str)> {
    Some((self.home_team.as_deref()?, self.away_team.as_deref()?))
  }
}

// ─── View ────────────────────────────────────────────────────────────────────

/// Prices for both sides of one fight from a single bookmaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FightOdds {
  pub price_a:   f64,
  pub price_b:   f64,
  pub bookmaker: String,
}

/// Odds attached to one fight pair; `odds` is `None` when no market names
/// both fighters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupOdds {
  pub fighter_a: String,
  pub fighter_b: String,
  pub odds:      Option<FightOdds>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn deserialises_vendor_payload_ignoring_unknown_fields() {
    let raw = r#"[{
      "id": "e1",
      "sport_key": "mma_mixed_martial_arts",
      "sport_title": "MMA",
      "commence_time": "2025-11-16T03:00:00Z",
      "home_team": "Jon Jones",
      "away_team": "Stipe Miocic",
      "bookmakers": [{
        "key": "draftkings",
        "title": "DraftKings",
        "last_update": "2025-11-10T12:00:00Z",
        "markets": [{
          "key": "h2h",
          "outcomes": [
            { "name": "Jon Jones", "price": -600 },
            { "name": "Stipe Miocic", "price": 425 }
          ]
        }]
      }]
    }]"#;

    let events: Vec<OddsEvent> = serde_json::from_str(raw).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].sides(), Some(("Jon Jones", "Stipe Miocic")));
    let outcomes = &events[0].bookmakers[0].markets[0].outcomes;
    assert_eq!(outcomes[1].price, 425.0);
  }
}
