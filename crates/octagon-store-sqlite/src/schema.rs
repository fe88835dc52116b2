//! SQL schema for the Octagon SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS fighters (
    fighter_id  TEXT PRIMARY KEY,
    name        TEXT NOT NULL COLLATE NOCASE UNIQUE,
    stats_id    TEXT,
    bio_url     TEXT,
    third_slug  TEXT,
    metadata    TEXT,            -- JSON blob or NULL
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- Latest successful payload per (fighter, source). Rows are only ever
-- replaced by a newer non-empty payload.
CREATE TABLE IF NOT EXISTS fighter_sources (
    fighter_id  TEXT NOT NULL REFERENCES fighters(fighter_id),
    source      TEXT NOT NULL,   -- 'stats' | 'bio' | 'third'
    payload     TEXT NOT NULL,
    fetched_at  TEXT NOT NULL,
    PRIMARY KEY (fighter_id, source)
);

CREATE TABLE IF NOT EXISTS events (
    event_id    TEXT PRIMARY KEY,
    name        TEXT NOT NULL COLLATE NOCASE UNIQUE,
    date        TEXT,
    location    TEXT,
    fight_card  TEXT NOT NULL DEFAULT '[]',
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- Append-only audit log of model output.
CREATE TABLE IF NOT EXISTS predictions (
    prediction_id TEXT PRIMARY KEY,
    event_id      TEXT NOT NULL REFERENCES events(event_id),
    payload       TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS events_updated_idx     ON events(updated_at);
CREATE INDEX IF NOT EXISTS predictions_event_idx  ON predictions(event_id);

PRAGMA user_version = 1;
";
