//! Integration tests for `SqliteStore` against an in-memory database.

use octagon_core::{
  event::{FightPair, NewEvent},
  fighter::Source,
  store::FightStore,
};
use serde_json::json;
use uuid::Uuid;

use crate::{Error, SqliteStore};

/// Timestamps are stored at microsecond precision; keep ordered writes apart.
async fn tick() { tokio::time::sleep(std::time::Duration::from_millis(2)).await; }

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn event(name: &str, date: &str, card: &[(&str, &str)]) -> NewEvent {
  NewEvent {
    name:       name.into(),
    date:       Some(date.into()),
    location:   Some("Las Vegas, Nevada, USA".into()),
    fight_card: card.iter().map(|(a, b)| FightPair::new(*a, *b)).collect(),
  }
}

// ─── Fighters ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_or_create_is_case_insensitive() {
  let s = store().await;

  let first = s.get_or_create_fighter("Jon Jones").await.unwrap();
  let again = s.get_or_create_fighter("jon  JONES").await.unwrap();
  assert_eq!(first.fighter_id, again.fighter_id);
  assert_eq!(again.name, "Jon Jones");
  assert!(again.sources.is_empty());

  assert_eq!(s.list_fighters().await.unwrap().len(), 1);
}

#[tokio::test]
async fn find_fighter_missing_returns_none() {
  let s = store().await;
  assert!(s.find_fighter("Nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn source_payload_overwrites_and_records_external_id() {
  let s = store().await;
  let f = s.get_or_create_fighter("Jon Jones").await.unwrap();

  s.store_source_payload(
    f.fighter_id,
    Source::Stats,
    json!({ "name": "Jon Jones", "record": "26-1-0" }),
    Some("abc123".into()),
  )
  .await
  .unwrap();

  let updated = s
    .store_source_payload(
      f.fighter_id,
      Source::Stats,
      json!({ "name": "Jon Jones", "record": "27-1-0" }),
      None,
    )
    .await
    .unwrap();

  assert_eq!(updated.payload(Source::Stats).unwrap()["record"], "27-1-0");
  // A refetch without an id keeps the one already resolved.
  assert_eq!(updated.external_ids.stats_id.as_deref(), Some("abc123"));
  assert!(updated.payload(Source::Bio).is_none());
}

#[tokio::test]
async fn sources_are_stored_independently() {
  let s = store().await;
  let f = s.get_or_create_fighter("Stipe Miocic").await.unwrap();

  s.store_source_payload(f.fighter_id, Source::Bio, json!({ "nickname": "" }), None)
    .await
    .unwrap();
  s.store_source_payload(
    f.fighter_id,
    Source::Third,
    json!({ "summary": "Boxer-wrestler.", "slug": "stipe-miocic" }),
    Some("stipe-miocic".into()),
  )
  .await
  .unwrap();

  let found = s.find_fighter("STIPE MIOCIC").await.unwrap().unwrap();
  assert_eq!(found.sources.len(), 2);
  assert_eq!(found.external_ids.third_slug.as_deref(), Some("stipe-miocic"));
}

#[tokio::test]
async fn store_payload_for_unknown_fighter_fails() {
  let s = store().await;
  let err = s
    .store_source_payload(Uuid::new_v4(), Source::Stats, json!({}), None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::FighterNotFound(_)));
}

#[tokio::test]
async fn metadata_round_trips() {
  let s = store().await;
  let f = s.get_or_create_fighter("Alex Pereira").await.unwrap();

  let updated = s
    .set_fighter_metadata(f.fighter_id, json!({ "nickname": "Poatan" }))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.metadata, Some(json!({ "nickname": "Poatan" })));

  assert!(
    s.set_fighter_metadata(Uuid::new_v4(), json!({}))
      .await
      .unwrap()
      .is_none()
  );
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upserting_twice_keeps_one_record_with_second_values() {
  let s = store().await;

  let first = s
    .upsert_event(event("UFC 309", "2025-11-15", &[("Jon Jones", "Stipe Miocic")]))
    .await
    .unwrap();
  let second_input = event("ufc 309", "2025-11-16", &[
    ("Jon Jones", "Stipe Miocic"),
    ("Charles Oliveira", "Michael Chandler"),
  ]);
  let second = s.upsert_event(second_input.clone()).await.unwrap();

  assert_eq!(first.event_id, second.event_id);
  assert_eq!(second.name, second_input.name);
  assert_eq!(second.date, second_input.date);
  assert_eq!(second.location, second_input.location);
  assert_eq!(second.fight_card, second_input.fight_card);

  let all = s.list_events().await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0], second);
}

#[tokio::test]
async fn event_lookups() {
  let s = store().await;
  let a = s
    .upsert_event(event("UFC 308", "2025-10-26", &[("Ilia Topuria", "Max Holloway")]))
    .await
    .unwrap();
  tick().await;
  let b = s
    .upsert_event(event("UFC 309", "2025-11-15", &[("Jon Jones", "Stipe Miocic")]))
    .await
    .unwrap();

  assert_eq!(s.get_event(a.event_id).await.unwrap(), Some(a.clone()));
  assert_eq!(s.find_event("ufc 309").await.unwrap(), Some(b.clone()));
  assert_eq!(s.latest_event().await.unwrap(), Some(b.clone()));
  assert!(s.get_event(Uuid::new_v4()).await.unwrap().is_none());

  let names: Vec<_> = s.list_events().await.unwrap().into_iter().map(|e| e.name).collect();
  assert_eq!(names, vec!["UFC 309", "UFC 308"]);

  // Re-upserting an older event makes it the latest.
  tick().await;
  s.upsert_event(event("UFC 308", "2025-10-26", &[("Ilia Topuria", "Max Holloway")]))
    .await
    .unwrap();
  assert_eq!(s.latest_event().await.unwrap().unwrap().event_id, a.event_id);
}

#[tokio::test]
async fn latest_event_on_empty_store() {
  let s = store().await;
  assert!(s.latest_event().await.unwrap().is_none());
}

// ─── Predictions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn predictions_are_appended_per_event() {
  let s = store().await;
  let e = s
    .upsert_event(event("UFC 309", "2025-11-15", &[("Jon Jones", "Stipe Miocic")]))
    .await
    .unwrap();

  let first = s
    .record_prediction(e.event_id, json!({ "predictions": [], "run": 1 }))
    .await
    .unwrap();
  tick().await;
  let second = s
    .record_prediction(e.event_id, json!({ "predictions": [], "run": 2 }))
    .await
    .unwrap();

  let stored = s.list_predictions(e.event_id).await.unwrap();
  assert_eq!(stored.len(), 2);
  assert_eq!(stored[0].prediction_id, second.prediction_id);
  assert_eq!(stored[1].prediction_id, first.prediction_id);
  assert_eq!(stored[1].payload["run"], 1);
}

#[tokio::test]
async fn prediction_for_unknown_event_fails() {
  let s = store().await;
  let err = s
    .record_prediction(Uuid::new_v4(), json!({}))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::EventNotFound(_)));
}
