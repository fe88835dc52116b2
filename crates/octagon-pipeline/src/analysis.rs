//! Analysis runs: prompt assembly from merged profiles and odds, the model
//! call, and strict validation of the reply before anything is stored.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Value, json};
use uuid::Uuid;

use octagon_core::{
  analysis::{Analysis, AnalysisResult, FightPrediction, parse_model_json},
  event::{EventRecord, FightPair, name_key},
  fighter::{MergedProfile, normalize_name},
  odds::MatchupOdds,
  source::{ChatMessage, ChatModel, ReplyFormat, Sources, TextStream},
  store::FightStore,
};

use crate::{Pipeline, PipelineError, Refresh, Result, error::store_err};

/// History entries per source included in a fighter digest.
const RECENT_FIGHTS: usize = 5;

const SYSTEM: &str = "You are a professional MMA analyst and handicapper. Base your reasoning \
                      on the supplied fighter data and betting odds.";

// ─── Prompt assembly ─────────────────────────────────────────────────────────

fn recent(history: &Value) -> Value {
  match history.as_array() {
    Some(entries) => Value::Array(entries.iter().take(RECENT_FIGHTS).cloned().collect()),
    None => Value::Null,
  }
}

fn digest(profile: &MergedProfile) -> Value {
  json!({
    "name":          profile.name,
    "nickname":      profile.nickname,
    "record":        profile.record,
    "height":        profile.height,
    "reach":         profile.reach,
    "stance":        profile.stance,
    "dob":           profile.dob,
    "career_stats":  profile.career_stats,
    "style_summary": profile.style_summary,
    "recent_fights": {
      "stats": recent(&profile.fight_history.stats),
      "bio":   recent(&profile.fight_history.bio),
      "third": recent(&profile.fight_history.third),
    },
  })
}

fn profile_for<'a>(profiles: &'a BTreeMap<String, MergedProfile>, name: &str) -> Option<&'a MergedProfile> {
  let key = name_key(name);
  profiles.iter().find(|(k, _)| name_key(k) == key).map(|(_, p)| p)
}

fn fight_context(
  pair: &FightPair,
  a: Option<&MergedProfile>,
  b: Option<&MergedProfile>,
  odds: Option<&MatchupOdds>,
) -> Value {
  json!({
    "fighter_a":    pair.fighter_a,
    "fighter_b":    pair.fighter_b,
    "weight_class": pair.weight_class,
    "profile_a":    a.map(digest),
    "profile_b":    b.map(digest),
    "odds":         odds.and_then(|o| o.odds.as_ref()),
  })
}

fn pretty(value: &Value) -> String {
  serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// The full-card prompt: every fight with both fighters' digests and odds,
/// asking for strict JSON predictions and parlays.
pub fn event_prompt(
  event: &EventRecord,
  profiles: &BTreeMap<String, MergedProfile>,
  odds: &[MatchupOdds],
) -> Vec<ChatMessage> {
  let fights: Vec<Value> = event
    .fight_card
    .iter()
    .enumerate()
    .map(|(i, pair)| {
      fight_context(
        pair,
        profile_for(profiles, &pair.fighter_a),
        profile_for(profiles, &pair.fighter_b),
        odds.get(i),
      )
    })
    .collect();

  let header = json!({
    "event":    event.name,
    "date":     event.date,
    "location": event.location,
  });

  vec![
    ChatMessage::system(SYSTEM),
    ChatMessage::user(format!(
      "Event:\n{}\n\nFights (main event first; odds are American):\n{}\n\n\
       Predict every fight. Reply with one JSON object only:\n\
       {{\"predictions\": [{{\"fighter_a\": \"...\", \"fighter_b\": \"...\", \"winner\": \"...\", \
       \"method\": \"KO/TKO|SUB|DEC\", \"confidence\": 0.0, \"analysis\": \"...\", \
       \"value_notes\": \"...\"}}], \
       \"parlays\": [{{\"label\": \"...\", \"legs\": [\"<predicted winner>\"], \"rationale\": \"...\"}}]}}\n\
       Use the fighter names exactly as given. Confidence is between 0 and 1. Parlay legs \
       must be predicted winners.",
      pretty(&header),
      pretty(&Value::Array(fights)),
    )),
  ]
}

/// A single-fight prompt. With [`ReplyFormat::Json`] it asks for one
/// prediction object; otherwise for a freeform breakdown.
pub fn fight_prompt(
  event_name: Option<&str>,
  pair: &FightPair,
  a: &MergedProfile,
  b: &MergedProfile,
  odds: &MatchupOdds,
  format: ReplyFormat,
) -> Vec<ChatMessage> {
  let context = fight_context(pair, Some(a), Some(b), Some(odds));
  let event = event_name
    .map(normalize_name)
    .filter(|n| !n.is_empty())
    .map(|n| format!("Event: {n}\n\n"))
    .unwrap_or_default();
  let ask = match format {
    ReplyFormat::Json => "Reply with one JSON object only: {\"fighter_a\": \"...\", \"fighter_b\": \
                          \"...\", \"winner\": \"...\", \"method\": \"KO/TKO|SUB|DEC\", \
                          \"confidence\": 0.0, \"analysis\": \"...\", \"value_notes\": \"...\"}. \
                          Use the fighter names exactly as given.",
    ReplyFormat::Text => "Give a concise breakdown: stylistic matchup, paths to victory for \
                          each fighter, your pick with method and confidence, and whether the \
                          odds offer value.",
  };
  vec![
    ChatMessage::system(SYSTEM),
    ChatMessage::user(format!("{event}Fight:\n{}\n\n{ask}", pretty(&context))),
  ]
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

fn unavailable(what: &str, e: impl std::fmt::Display) -> PipelineError {
  PipelineError::AnalysisUnavailable(format!("{what}: {e}"))
}

impl<S: FightStore, X: Sources> Pipeline<S, X> {
  /// Analyse a full card and persist the model's reply.
  ///
  /// Fails as a whole if the reply is not valid JSON, does not match the
  /// expected shape, or misses any fight on the card.
  pub async fn analyze_event(&self, event: &EventRecord) -> Result<AnalysisResult> {
    if event.fight_card.is_empty() {
      return Err(PipelineError::AnalysisUnavailable(format!("{} has no fights", event.name)));
    }

    let profiles = self
      .load_fighters(&event.fighters(), HashMap::new(), Refresh::IfStale)
      .await?;
    let odds = self.attach_odds(&event.fight_card).await;

    let reply = self
      .sources
      .model()
      .complete(&event_prompt(event, &profiles, &odds), ReplyFormat::Json)
      .await
      .map_err(|e| unavailable("model call failed", e))?;

    let raw = parse_model_json(&reply)?;
    let analysis = Analysis::from_value(raw.clone(), &event.fight_card)?;
    let record = self
      .store
      .record_prediction(event.event_id, raw)
      .await
      .map_err(store_err)?;

    tracing::info!(
      event = %event.name,
      prediction_id = %record.prediction_id,
      fights = analysis.predictions.len(),
      parlays = analysis.parlays.len(),
      "stored event analysis"
    );

    Ok(AnalysisResult {
      prediction_id: record.prediction_id,
      event_id:      event.event_id,
      event_name:    event.name.clone(),
      generated_at:  record.created_at,
      odds,
      predictions:   analysis.predictions,
      parlays:       analysis.parlays,
    })
  }

  pub async fn analyze_event_id(&self, event_id: Uuid) -> Result<AnalysisResult> {
    let event = self.event(event_id).await?;
    self.analyze_event(&event).await
  }

  /// Resolve the next event, then analyse it.
  pub async fn analyze_next_event(&self) -> Result<AnalysisResult> {
    let event = self.load_next_event().await?;
    self.analyze_event(&event).await
  }

  async fn pair_context(&self, pair: &FightPair) -> Result<(MergedProfile, MergedProfile, MatchupOdds)> {
    let a = normalize_name(&pair.fighter_a);
    let b = normalize_name(&pair.fighter_b);
    if a.is_empty() || b.is_empty() {
      return Err(PipelineError::InvalidInput("both fighters must be named".into()));
    }

    let profiles = self
      .load_fighters(&[a.clone(), b.clone()], HashMap::new(), Refresh::IfStale)
      .await?;
    let missing = || PipelineError::AnalysisUnavailable("fighter profile missing".into());
    let profile_a = profile_for(&profiles, &a).cloned().ok_or_else(missing)?;
    let profile_b = profile_for(&profiles, &b).cloned().ok_or_else(missing)?;

    let odds = self
      .attach_odds(std::slice::from_ref(pair))
      .await
      .pop()
      .unwrap_or(MatchupOdds { fighter_a: a, fighter_b: b, odds: None });
    Ok((profile_a, profile_b, odds))
  }

  /// Single-fight prediction. Validated like a full card; not persisted.
  pub async fn analyze_fight(&self, event_name: Option<&str>, pair: &FightPair) -> Result<FightPrediction> {
    let (a, b, odds) = self.pair_context(pair).await?;
    let messages = fight_prompt(event_name, pair, &a, &b, &odds, ReplyFormat::Json);
    let reply = self
      .sources
      .model()
      .complete(&messages, ReplyFormat::Json)
      .await
      .map_err(|e| unavailable("model call failed", e))?;
    Ok(FightPrediction::from_value(parse_model_json(&reply)?, pair)?)
  }

  /// Freeform single-fight analysis streamed as text chunks.
  pub async fn stream_fight(&self, event_name: Option<&str>, pair: &FightPair) -> Result<TextStream> {
    let (a, b, odds) = self.pair_context(pair).await?;
    let messages = fight_prompt(event_name, pair, &a, &b, &odds, ReplyFormat::Text);
    self
      .sources
      .model()
      .stream(&messages)
      .await
      .map_err(|e| unavailable("model stream failed", e))
  }
}
