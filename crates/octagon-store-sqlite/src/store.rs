//! [`SqliteStore`]: the SQLite implementation of [`FightStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _};
use uuid::Uuid;

use octagon_core::{
  event::{EventRecord, NewEvent},
  fighter::{FighterRecord, Source, normalize_name},
  store::{FightStore, PredictionRecord},
};

use crate::{
  Error, Result,
  encode::{
    EVENT_COLUMNS, FIGHTER_COLUMNS, RawEvent, RawFighter, RawFighterWithSources,
    RawPrediction, RawSourceRow, encode_card, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Octagon cache backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row helpers (run on the database thread) ────────────────────────────────

/// Which external-id column a source writes to.
fn external_id_column(source: Source) -> &'static str {
  match source {
    Source::Stats => "stats_id",
    Source::Bio => "bio_url",
    Source::Third => "third_slug",
  }
}

/// Read one fighter and its source rows. `clause` selects on `?1`.
fn read_fighter(
  conn: &Connection,
  clause: &str,
  key: &str,
) -> rusqlite::Result<Option<RawFighterWithSources>> {
  let sql = format!("SELECT {FIGHTER_COLUMNS} FROM fighters WHERE {clause}");
  let Some(fighter) = conn
    .query_row(&sql, rusqlite::params![key], RawFighter::from_row)
    .optional()?
  else {
    return Ok(None);
  };

  let mut stmt = conn.prepare(
    "SELECT source, payload, fetched_at FROM fighter_sources
     WHERE fighter_id = ?1 ORDER BY source",
  )?;
  let sources = stmt
    .query_map(rusqlite::params![fighter.fighter_id], |row| {
      Ok(RawSourceRow {
        source:     row.get(0)?,
        payload:    row.get(1)?,
        fetched_at: row.get(2)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(Some(RawFighterWithSources { fighter, sources }))
}

fn read_event(
  conn: &Connection,
  clause: &str,
  key: &str,
) -> rusqlite::Result<Option<RawEvent>> {
  let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE {clause}");
  conn
    .query_row(&sql, rusqlite::params![key], RawEvent::from_row)
    .optional()
}

// ─── FightStore impl ─────────────────────────────────────────────────────────

impl FightStore for SqliteStore {
  type Error = Error;

  // ── Fighters ──────────────────────────────────────────────────────────────

  async fn get_or_create_fighter(&self, name: &str) -> Result<FighterRecord> {
    let name   = normalize_name(name);
    let id_str = encode_uuid(Uuid::new_v4());
    let at_str = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO fighters (fighter_id, name, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?3)
           ON CONFLICT(name) DO NOTHING",
          rusqlite::params![id_str, name, at_str],
        )?;
        let raw = read_fighter(&tx, "name = ?1", &name)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_record()
  }

  async fn find_fighter(&self, name: &str) -> Result<Option<FighterRecord>> {
    let name = normalize_name(name);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let raw = read_fighter(&tx, "name = ?1", &name)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawFighterWithSources::into_record).transpose()
  }

  async fn list_fighters(&self) -> Result<Vec<FighterRecord>> {
    let raws = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        let ids = {
          let mut stmt = tx.prepare("SELECT fighter_id FROM fighters ORDER BY name")?;
          stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        let mut raws = Vec::with_capacity(ids.len());
        for id in ids {
          raws.extend(read_fighter(&tx, "fighter_id = ?1", &id)?);
        }
        tx.commit()?;
        Ok(raws)
      })
      .await?;

    raws.into_iter().map(RawFighterWithSources::into_record).collect()
  }

  async fn store_source_payload(
    &self,
    fighter_id:  Uuid,
    source:      Source,
    payload:     serde_json::Value,
    external_id: Option<String>,
  ) -> Result<FighterRecord> {
    let id_str      = encode_uuid(fighter_id);
    let source_str  = source.as_str();
    let column      = external_id_column(source);
    let payload_str = payload.to_string();
    let at_str      = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let updated = tx.execute(
          &format!(
            "UPDATE fighters SET {column} = COALESCE(?2, {column}), updated_at = ?3
             WHERE fighter_id = ?1"
          ),
          rusqlite::params![id_str, external_id, at_str],
        )?;
        if updated == 0 {
          return Ok(None);
        }
        tx.execute(
          "INSERT INTO fighter_sources (fighter_id, source, payload, fetched_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(fighter_id, source)
           DO UPDATE SET payload = excluded.payload, fetched_at = excluded.fetched_at",
          rusqlite::params![id_str, source_str, payload_str, at_str],
        )?;
        let raw = read_fighter(&tx, "fighter_id = ?1", &id_str)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw
      .ok_or(Error::FighterNotFound(fighter_id))?
      .into_record()
  }

  async fn set_fighter_metadata(
    &self,
    fighter_id: Uuid,
    metadata:   serde_json::Value,
  ) -> Result<Option<FighterRecord>> {
    let id_str   = encode_uuid(fighter_id);
    let meta_str = metadata.to_string();
    let at_str   = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "UPDATE fighters SET metadata = ?2, updated_at = ?3 WHERE fighter_id = ?1",
          rusqlite::params![id_str, meta_str, at_str],
        )?;
        let raw = read_fighter(&tx, "fighter_id = ?1", &id_str)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawFighterWithSources::into_record).transpose()
  }

  // ── Events ────────────────────────────────────────────────────────────────

  async fn upsert_event(&self, event: NewEvent) -> Result<EventRecord> {
    let name     = normalize_name(&event.name);
    let id_str   = encode_uuid(Uuid::new_v4());
    let card_str = encode_card(&event.fight_card)?;
    let at_str   = encode_dt(Utc::now());
    let NewEvent { date, location, .. } = event;

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO events (event_id, name, date, location, fight_card, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
           ON CONFLICT(name) DO UPDATE SET
             name       = excluded.name,
             date       = excluded.date,
             location   = excluded.location,
             fight_card = excluded.fight_card,
             updated_at = excluded.updated_at",
          rusqlite::params![id_str, name, date, location, card_str, at_str],
        )?;
        let raw = read_event(&tx, "name = ?1", &name)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_event()
  }

  async fn get_event(&self, event_id: Uuid) -> Result<Option<EventRecord>> {
    let id_str = encode_uuid(event_id);

    let raw = self
      .conn
      .call(move |conn| Ok(read_event(conn, "event_id = ?1", &id_str)?))
      .await?;

    raw.map(RawEvent::into_event).transpose()
  }

  async fn find_event(&self, name: &str) -> Result<Option<EventRecord>> {
    let name = normalize_name(name);

    let raw = self
      .conn
      .call(move |conn| Ok(read_event(conn, "name = ?1", &name)?))
      .await?;

    raw.map(RawEvent::into_event).transpose()
  }

  async fn latest_event(&self) -> Result<Option<EventRecord>> {
    let raw = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {EVENT_COLUMNS} FROM events
                 ORDER BY updated_at DESC, rowid DESC LIMIT 1"
              ),
              [],
              RawEvent::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEvent::into_event).transpose()
  }

  async fn list_events(&self) -> Result<Vec<EventRecord>> {
    let raws = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {EVENT_COLUMNS} FROM events ORDER BY updated_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map([], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  // ── Predictions ───────────────────────────────────────────────────────────

  async fn record_prediction(
    &self,
    event_id: Uuid,
    payload:  serde_json::Value,
  ) -> Result<PredictionRecord> {
    let record = PredictionRecord {
      prediction_id: Uuid::new_v4(),
      event_id,
      payload,
      created_at: Utc::now(),
    };

    let pred_str    = encode_uuid(record.prediction_id);
    let event_str   = encode_uuid(event_id);
    let payload_str = record.payload.to_string();
    let at_str      = encode_dt(record.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let exists = tx
          .query_row(
            "SELECT 1 FROM events WHERE event_id = ?1",
            rusqlite::params![event_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !exists {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO predictions (prediction_id, event_id, payload, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![pred_str, event_str, payload_str, at_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(Error::EventNotFound(event_id));
    }
    Ok(record)
  }

  async fn list_predictions(&self, event_id: Uuid) -> Result<Vec<PredictionRecord>> {
    let event_str = encode_uuid(event_id);

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT prediction_id, event_id, payload, created_at FROM predictions
           WHERE event_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![event_str], |row| {
            Ok(RawPrediction {
              prediction_id: row.get(0)?,
              event_id:      row.get(1)?,
              payload:       row.get(2)?,
              created_at:    row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPrediction::into_prediction).collect()
  }
}
