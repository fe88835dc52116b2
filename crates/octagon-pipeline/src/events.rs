//! Event resolution: the three-tier fallback chain behind
//! [`Pipeline::load_next_event`], plus cached event reads.
//!
//! Tier order is odds API, then the stats-site scrape, then the language
//! model. A tier that errors, finds nothing, or yields an event without a
//! name or fights is logged and skipped.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use octagon_core::{
  analysis::parse_model_json,
  event::{EventDate, EventRecord, FightPair, NewEvent},
  fighter::normalize_name,
  odds::OddsEvent,
  source::{ChatMessage, ChatModel, EventScraper, OddsFeed, ReplyFormat, Sources},
  store::{FightStore, PredictionRecord},
};

use crate::{Pipeline, PipelineError, Result, error::store_err};

// ─── Tier selection (pure) ───────────────────────────────────────────────────

/// Build the next card from odds-market bouts.
///
/// Only bouts with a parseable start strictly after `now` are eligible. The
/// card holds every eligible bout starting within `window` of the nearest
/// one, latest first, so the main event leads.
pub fn select_odds_card(
  events: &[OddsEvent],
  now: DateTime<Utc>,
  window: chrono::Duration,
) -> Option<NewEvent> {
  let mut eligible: Vec<(DateTime<Utc>, &OddsEvent)> = events
    .iter()
    .filter(|e| e.sides().is_some())
    .filter_map(|e| {
      let start = DateTime::parse_from_rfc3339(&e.commence_time).ok()?.with_timezone(&Utc);
      (start > now).then_some((start, e))
    })
    .collect();

  let (first, lead) = eligible.iter().min_by_key(|(start, _)| *start).copied()?;
  eligible.retain(|(start, _)| *start <= first + window);
  eligible.sort_by(|a, b| b.0.cmp(&a.0));

  let fight_card = eligible
    .iter()
    .filter_map(|(_, e)| e.sides())
    .map(|(a, b)| FightPair::new(normalize_name(a), normalize_name(b)))
    .collect();

  let title = match lead.sport_title.trim() {
    "" => "MMA",
    title => title,
  };
  let event = NewEvent {
    name: format!("{title} {}", first.format("%Y-%m-%d")),
    date: Some(first.to_rfc3339()),
    location: None,
    fight_card,
  };
  event.is_complete().then_some(event)
}

/// Accept a scraped event unless it is incomplete or its date is a day that
/// already passed. An unparseable date is kept as is.
pub fn accept_scraped(event: NewEvent, now: DateTime<Utc>) -> Option<NewEvent> {
  if !event.is_complete() {
    tracing::info!(name = %event.name, "scraped event has no name or fights");
    return None;
  }
  let parsed = event.date.as_deref().and_then(EventDate::parse);
  if parsed.is_some_and(|d| d.is_before_day_of(now)) {
    tracing::info!(name = %event.name, date = ?event.date, "scraped event is in the past");
    return None;
  }
  Some(event)
}

#[derive(Debug, Deserialize)]
struct ModelEvent {
  event_name: String,
  event_date: String,
  #[serde(default)]
  location:   Option<String>,
  #[serde(default)]
  fight_card: Vec<FightPair>,
}

/// Parse the model tier's reply. Accepted only if the date parses and lies
/// strictly after `now`.
pub fn parse_model_event(reply: &str, now: DateTime<Utc>) -> Option<NewEvent> {
  let value = parse_model_json(reply)
    .inspect_err(|e| tracing::info!(error = %e, "model event reply unusable"))
    .ok()?;
  let raw: ModelEvent = serde_json::from_value(value)
    .inspect_err(|e| tracing::info!(error = %e, "model event reply has the wrong shape"))
    .ok()?;

  let upcoming = EventDate::parse(&raw.event_date).is_some_and(|d| d.is_after(now));
  if !upcoming {
    tracing::info!(date = %raw.event_date, "model event is not in the future; discarding");
    return None;
  }

  let event = NewEvent {
    name:       normalize_name(&raw.event_name),
    date:       Some(raw.event_date.trim().to_owned()),
    location:   raw.location.filter(|l| !l.trim().is_empty()),
    fight_card: raw
      .fight_card
      .into_iter()
      .filter(|p| !p.fighter_a.trim().is_empty() && !p.fighter_b.trim().is_empty())
      .collect(),
  };
  event.is_complete().then_some(event)
}

fn next_event_prompt(now: DateTime<Utc>) -> Vec<ChatMessage> {
  vec![
    ChatMessage::system("You track the UFC schedule. Reply with a single JSON object only."),
    ChatMessage::user(format!(
      "Today is {}. What is the next UFC event after today? Reply as \
       {{\"event_name\": \"...\", \"event_date\": \"YYYY-MM-DD\", \"location\": \"...\", \
       \"fight_card\": [{{\"fighter_a\": \"...\", \"fighter_b\": \"...\", \
       \"weight_class\": \"...\"}}]}} with the main event first.",
      now.format("%Y-%m-%d")
    )),
  ]
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

impl<S: FightStore, X: Sources> Pipeline<S, X> {
  async fn odds_tier(&self, now: DateTime<Utc>) -> Option<NewEvent> {
    match self.sources.odds().upcoming().await {
      Ok(events) => {
        let card = select_odds_card(&events, now, self.settings.card_window);
        if card.is_none() {
          tracing::info!(bouts = events.len(), "odds tier found no future bouts");
        }
        card
      }
      Err(e) => {
        tracing::warn!(error = %e, "odds tier failed");
        None
      }
    }
  }

  async fn scrape_tier(&self, now: DateTime<Utc>) -> Option<NewEvent> {
    match self.sources.scraper().next_event().await {
      Ok(Some(event)) => accept_scraped(event, now),
      Ok(None) => {
        tracing::info!("scrape tier found no upcoming event");
        None
      }
      Err(e) => {
        tracing::warn!(error = %e, "scrape tier failed");
        None
      }
    }
  }

  async fn model_tier(&self, now: DateTime<Utc>) -> Option<NewEvent> {
    match self
      .sources
      .model()
      .complete(&next_event_prompt(now), ReplyFormat::Json)
      .await
    {
      Ok(reply) => parse_model_event(&reply, now),
      Err(e) => {
        tracing::warn!(error = %e, "model tier failed");
        None
      }
    }
  }

  /// Resolve the next scheduled event through the fallback chain and upsert
  /// it by name.
  pub async fn load_next_event(&self) -> Result<EventRecord> {
    let now = Utc::now();

    let (tier, event) = if let Some(e) = self.odds_tier(now).await {
      ("odds", e)
    } else if let Some(e) = self.scrape_tier(now).await {
      ("scrape", e)
    } else if let Some(e) = self.model_tier(now).await {
      ("model", e)
    } else {
      tracing::warn!("every event tier failed");
      return Err(PipelineError::EventNotFound("no upcoming event could be resolved".into()));
    };

    tracing::info!(tier, name = %event.name, fights = event.fight_card.len(), "resolved next event");
    self.store.upsert_event(event).await.map_err(store_err)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub async fn event(&self, event_id: Uuid) -> Result<EventRecord> {
    self
      .store
      .get_event(event_id)
      .await
      .map_err(store_err)?
      .ok_or_else(|| PipelineError::EventNotFound(event_id.to_string()))
  }

  pub async fn event_by_name(&self, name: &str) -> Result<EventRecord> {
    self
      .store
      .find_event(name)
      .await
      .map_err(store_err)?
      .ok_or_else(|| PipelineError::EventNotFound(normalize_name(name)))
  }

  pub async fn latest_event(&self) -> Result<EventRecord> {
    self
      .store
      .latest_event()
      .await
      .map_err(store_err)?
      .ok_or_else(|| PipelineError::EventNotFound("no cached events".into()))
  }

  pub async fn events(&self) -> Result<Vec<EventRecord>> {
    self.store.list_events().await.map_err(store_err)
  }

  /// Stored analysis runs for an event; 404s if the event is unknown.
  pub async fn predictions(&self, event_id: Uuid) -> Result<Vec<PredictionRecord>> {
    let event = self.event(event_id).await?;
    self
      .store
      .list_predictions(event.event_id)
      .await
      .map_err(store_err)
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};
  use octagon_core::odds::{Bookmaker, Market, Outcome};

  use super::*;

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 11, 10, 18, 0, 0).unwrap() }

  fn bout(a: &str, b: &str, start: DateTime<Utc>) -> OddsEvent {
    OddsEvent {
      id:            format!("{a}-{b}"),
      sport_title:   "MMA".into(),
      commence_time: start.to_rfc3339(),
      home_team:     Some(a.into()),
      away_team:     Some(b.into()),
      bookmakers:    vec![Bookmaker {
        key:     "book".into(),
        title:   "Book".into(),
        markets: vec![Market {
          key:      "h2h".into(),
          outcomes: vec![
            Outcome { name: a.into(), price: -150.0 },
            Outcome { name: b.into(), price: 130.0 },
          ],
        }],
      }],
    }
  }

  #[test]
  fn odds_tier_skips_past_and_started_bouts() {
    let next_week = now() + Duration::days(7);
    let events = vec![
      bout("Yesterday A", "Yesterday B", now() - Duration::days(1)),
      bout("Started A", "Started B", now() - Duration::hours(1)),
      bout("Prelim A", "Prelim B", next_week),
      bout("Main A", "Main B", next_week + Duration::hours(3)),
      bout("Later A", "Later B", next_week + Duration::days(7)),
    ];

    let event = select_odds_card(&events, now(), Duration::hours(12)).unwrap();
    assert_eq!(event.name, format!("MMA {}", next_week.format("%Y-%m-%d")));
    assert_eq!(event.fight_card, vec![
      FightPair::new("Main A", "Main B"),
      FightPair::new("Prelim A", "Prelim B"),
    ]);
  }

  #[test]
  fn odds_tier_with_only_past_bouts_is_empty() {
    let events = vec![bout("A", "B", now() - Duration::days(1))];
    assert!(select_odds_card(&events, now(), Duration::hours(12)).is_none());

    let mut malformed = bout("A", "B", now() + Duration::days(1));
    malformed.commence_time = "soon".into();
    assert!(select_odds_card(&[malformed], now(), Duration::hours(12)).is_none());
  }

  fn scraped(date: Option<&str>) -> NewEvent {
    NewEvent {
      name:       "UFC 311".into(),
      date:       date.map(str::to_owned),
      location:   None,
      fight_card: vec![FightPair::new("Islam Makhachev", "Arman Tsarukyan")],
    }
  }

  #[test]
  fn scraped_event_date_rules() {
    assert!(accept_scraped(scraped(Some("November 9, 2025")), now()).is_none());
    assert!(accept_scraped(scraped(Some("November 10, 2025")), now()).is_some());
    assert!(accept_scraped(scraped(Some("TBD")), now()).is_some());
    assert!(accept_scraped(scraped(None), now()).is_some());

    let mut empty = scraped(None);
    empty.fight_card.clear();
    assert!(accept_scraped(empty, now()).is_none());
  }

  #[test]
  fn model_event_must_be_in_the_future() {
    let past = r#"{"event_name": "UFC 300", "event_date": "2024-04-13",
      "fight_card": [{"fighter_a": "Alex Pereira", "fighter_b": "Jamahal Hill"}]}"#;
    assert!(parse_model_event(past, now()).is_none());

    let future = r#"```json
      {"event_name": "UFC 322", "event_date": "2025-11-15", "location": "New York",
       "fight_card": [{"fighter_a": "Jack Della Maddalena", "fighter_b": "Islam Makhachev"}]}
    ```"#;
    let event = parse_model_event(future, now()).unwrap();
    assert_eq!(event.name, "UFC 322");
    assert_eq!(event.fight_card.len(), 1);

    let no_card = r#"{"event_name": "UFC 322", "event_date": "2025-11-15", "fight_card": []}"#;
    assert!(parse_model_event(no_card, now()).is_none());
    assert!(parse_model_event("{'event_name': 'x'}", now()).is_none());
  }
}
