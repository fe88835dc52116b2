//! Typed model output for fight analysis.
//!
//! Model replies are parsed as strict JSON and validated here before anything
//! is persisted or returned. Generated text is never evaluated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  event::{FightPair, name_key},
  odds::MatchupOdds,
};

// ─── Validated types ─────────────────────────────────────────────────────────

/// The predicted outcome of one fight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FightPrediction {
  pub fighter_a:   String,
  pub fighter_b:   String,
  pub winner:      String,
  /// KO/TKO, SUB or DEC as phrased by the model.
  pub method:      String,
  /// Always within `[0, 1]`.
  pub confidence:  f64,
  pub analysis:    String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub value_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParlaySuggestion {
  pub label:     String,
  /// Predicted winners making up the parlay.
  pub legs:      Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rationale: Option<String>,
}

/// Validated predictions for a whole card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
  pub predictions: Vec<FightPrediction>,
  pub parlays:     Vec<ParlaySuggestion>,
}

/// Returned by a successful full-event analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
  pub prediction_id: Uuid,
  pub event_id:      Uuid,
  pub event_name:    String,
  pub generated_at:  DateTime<Utc>,
  pub odds:          Vec<MatchupOdds>,
  pub predictions:   Vec<FightPrediction>,
  pub parlays:       Vec<ParlaySuggestion>,
}

// ─── Wire shapes ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawAnalysis {
  predictions: Vec<RawPrediction>,
  #[serde(default)]
  parlays:     Vec<RawParlay>,
}

#[derive(Debug, Deserialize)]
struct RawPrediction {
  fighter_a:   String,
  fighter_b:   String,
  winner:      String,
  method:      String,
  confidence:  f64,
  #[serde(default)]
  analysis:    String,
  #[serde(default)]
  value_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawParlay {
  label:     String,
  legs:      Vec<String>,
  #[serde(default)]
  rationale: Option<String>,
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

/// Strip an optional surrounding Markdown code fence (` ```json ... ``` `).
pub fn strip_code_fences(text: &str) -> &str {
  let trimmed = text.trim();
  let Some(rest) = trimmed.strip_prefix("```") else {
    return trimmed;
  };
  let body = rest.split_once('\n').map_or("", |(_, body)| body);
  body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a model reply as a JSON value.
pub fn parse_model_json(text: &str) -> Result<serde_json::Value> {
  serde_json::from_str(strip_code_fences(text))
    .map_err(|e| Error::MalformedAnalysis(format!("reply is not JSON: {e}")))
}

/// Values above this are read as a ten-point score rather than a slightly
/// overshot probability.
const TEN_POINT_FLOOR: f64 = 1.5;

/// Map a model-reported confidence into `[0, 1]`. Values in `(1.5, 10]` are
/// read as a ten-point scale; anything else is clamped.
pub fn normalize_confidence(raw: f64) -> f64 {
  if !raw.is_finite() {
    return 0.0;
  }
  let scaled = if raw > TEN_POINT_FLOOR && raw <= 10.0 { raw / 10.0 } else { raw };
  scaled.clamp(0.0, 1.0)
}

impl RawPrediction {
  fn validate(self) -> Result<FightPrediction> {
    let winner = self.winner.trim();
    if winner.is_empty() {
      return Err(Error::MalformedAnalysis(format!(
        "empty winner for {} vs {}",
        self.fighter_a, self.fighter_b
      )));
    }
    let key = name_key(winner);
    if key != name_key(&self.fighter_a) && key != name_key(&self.fighter_b) {
      return Err(Error::MalformedAnalysis(format!(
        "winner {winner} is not in {} vs {}",
        self.fighter_a, self.fighter_b
      )));
    }
    Ok(FightPrediction {
      winner:      winner.to_owned(),
      method:      self.method.trim().to_owned(),
      confidence:  normalize_confidence(self.confidence),
      analysis:    self.analysis,
      value_notes: self.value_notes.filter(|n| !n.trim().is_empty()),
      fighter_a:   self.fighter_a,
      fighter_b:   self.fighter_b,
    })
  }
}

impl FightPrediction {
  /// Validate a single-fight reply. Accepts either a bare prediction object or
  /// a `{"predictions": [...]}` wrapper containing the fight.
  pub fn from_value(value: serde_json::Value, pair: &FightPair) -> Result<Self> {
    if value.get("predictions").is_some() {
      let analysis = Analysis::from_value(value, std::slice::from_ref(pair))?;
      return analysis
        .predictions
        .into_iter()
        .next()
        .ok_or_else(|| Error::MissingPrediction {
          fighter_a: pair.fighter_a.clone(),
          fighter_b: pair.fighter_b.clone(),
        });
    }

    let raw: RawPrediction = serde_json::from_value(value)
      .map_err(|e| Error::MalformedAnalysis(e.to_string()))?;
    if !pair.is_between(&raw.fighter_a, &raw.fighter_b) {
      return Err(Error::MissingPrediction {
        fighter_a: pair.fighter_a.clone(),
        fighter_b: pair.fighter_b.clone(),
      });
    }
    raw.validate()
  }
}

impl Analysis {
  /// Validate a full-card reply against `card`.
  ///
  /// Every fight on the card must have a prediction; predictions come back in
  /// card order and predictions for fights not on the card are dropped.
  /// Parlay legs that do not name a predicted winner are dropped, as are
  /// parlays left without legs.
  pub fn from_value(value: serde_json::Value, card: &[FightPair]) -> Result<Self> {
    let raw: RawAnalysis = serde_json::from_value(value)
      .map_err(|e| Error::MalformedAnalysis(e.to_string()))?;

    let mut pool = raw.predictions;
    let mut predictions = Vec::with_capacity(card.len());
    for pair in card {
      let idx = pool
        .iter()
        .position(|p| pair.is_between(&p.fighter_a, &p.fighter_b))
        .ok_or_else(|| Error::MissingPrediction {
          fighter_a: pair.fighter_a.clone(),
          fighter_b: pair.fighter_b.clone(),
        })?;
      predictions.push(pool.swap_remove(idx).validate()?);
    }

    let winners: Vec<String> =
      predictions.iter().map(|p| name_key(&p.winner)).collect();
    let parlays = raw
      .parlays
      .into_iter()
      .filter_map(|parlay| {
        let legs: Vec<String> = parlay
          .legs
          .into_iter()
          .filter(|leg| {
            let keep = winners.contains(&name_key(leg));
            if !keep {
              tracing::warn!(leg = %leg, "dropping parlay leg that is not a predicted winner");
            }
            keep
          })
          .collect();
        (!legs.is_empty()).then_some(ParlaySuggestion {
          label: parlay.label,
          legs,
          rationale: parlay.rationale,
        })
      })
      .collect();

    Ok(Self { predictions, parlays })
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn card() -> Vec<FightPair> {
    vec![
      FightPair::new("Jon Jones", "Stipe Miocic"),
      FightPair::new("Charles Oliveira", "Michael Chandler"),
    ]
  }

  fn reply() -> serde_json::Value {
    json!({
      "predictions": [
        {
          "fighter_a": "Charles Oliveira", "fighter_b": "Michael Chandler",
          "winner": "Charles Oliveira", "method": "SUB",
          "confidence": 0.7, "analysis": "Grappling edge."
        },
        {
          "fighter_a": "Jon Jones", "fighter_b": "Stipe Miocic",
          "winner": "Jon Jones", "method": "DEC",
          "confidence": 1.4, "analysis": "Reach and wrestling."
        }
      ],
      "parlays": [
        { "label": "safe", "legs": ["Jon Jones", "Charles Oliveira"] },
        { "label": "longshot", "legs": ["Michael Chandler"] }
      ]
    })
  }

  #[test]
  fn strips_fences() {
    assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
  }

  #[test]
  fn malformed_reply_is_an_error() {
    assert!(matches!(
      parse_model_json("{'predictions': []}"),
      Err(Error::MalformedAnalysis(_))
    ));
  }

  #[test]
  fn predictions_follow_card_order_and_confidence_is_clamped() {
    let analysis = Analysis::from_value(reply(), &card()).unwrap();
    assert_eq!(analysis.predictions[0].winner, "Jon Jones");
    assert_eq!(analysis.predictions[0].confidence, 1.0);
    assert_eq!(analysis.predictions[1].confidence, 0.7);
  }

  #[test]
  fn parlay_legs_must_be_predicted_winners() {
    let analysis = Analysis::from_value(reply(), &card()).unwrap();
    assert_eq!(analysis.parlays.len(), 1);
    assert_eq!(analysis.parlays[0].legs, vec!["Jon Jones", "Charles Oliveira"]);
  }

  #[test]
  fn missing_fight_fails_the_whole_card() {
    let mut card = card();
    card.push(FightPair::new("Sean O'Malley", "Merab Dvalishvili"));
    assert!(matches!(
      Analysis::from_value(reply(), &card),
      Err(Error::MissingPrediction { .. })
    ));
  }

  #[test]
  fn empty_winner_is_rejected() {
    let value = json!({
      "predictions": [{
        "fighter_a": "Jon Jones", "fighter_b": "Stipe Miocic",
        "winner": " ", "method": "DEC", "confidence": 0.5
      }]
    });
    let card = vec![FightPair::new("Jon Jones", "Stipe Miocic")];
    assert!(matches!(
      Analysis::from_value(value, &card),
      Err(Error::MalformedAnalysis(_))
    ));
  }

  #[test]
  fn confidence_scale() {
    assert_eq!(normalize_confidence(7.0), 0.7);
    assert_eq!(normalize_confidence(-0.2), 0.0);
    assert_eq!(normalize_confidence(55.0), 1.0);
    assert_eq!(normalize_confidence(0.65), 0.65);
    assert_eq!(normalize_confidence(f64::NAN), 0.0);
  }

  #[test]
  fn slight_overshoot_is_clamped_not_rescaled() {
    assert_eq!(normalize_confidence(1.0), 1.0);
    assert_eq!(normalize_confidence(1.4), 1.0);
    assert_eq!(normalize_confidence(1.5), 1.0);
    assert_eq!(normalize_confidence(2.0), 0.2);
    assert_eq!(normalize_confidence(10.0), 1.0);
  }

  #[test]
  fn winner_must_be_one_of_the_pair() {
    let value = json!({
      "predictions": [{
        "fighter_a": "Jon Jones", "fighter_b": "Stipe Miocic",
        "winner": "Tom Aspinall", "method": "KO/TKO", "confidence": 0.6
      }]
    });
    let card = vec![FightPair::new("Jon Jones", "Stipe Miocic")];
    assert!(matches!(
      Analysis::from_value(value, &card),
      Err(Error::MalformedAnalysis(_))
    ));

    let pair = FightPair::new("Jon Jones", "Stipe Miocic");
    let bare = json!({
      "fighter_a": "Jon Jones", "fighter_b": "Stipe Miocic",
      "winner": " stipe  MIOCIC ", "method": "DEC", "confidence": 0.4
    });
    assert_eq!(FightPrediction::from_value(bare, &pair).unwrap().winner, "stipe  MIOCIC");
  }

  #[test]
  fn single_fight_reply_accepts_bare_object() {
    let pair = FightPair::new("Jon Jones", "Stipe Miocic");
    let value = json!({
      "fighter_a": "Jon Jones", "fighter_b": "Stipe Miocic",
      "winner": "Jon Jones", "method": "KO/TKO", "confidence": 8
    });
    let prediction = FightPrediction::from_value(value, &pair).unwrap();
    assert_eq!(prediction.confidence, 0.8);
    assert_eq!(prediction.analysis, "");
  }
}
