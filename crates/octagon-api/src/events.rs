//! Handlers for `/events` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/events` | Most recently updated first |
//! | `GET`  | `/events/next` | Runs the fallback chain; 404 if every tier fails |
//! | `GET`  | `/events/latest` | 404 if nothing is cached |
//! | `GET`  | `/events/by-name/:name` | Case-insensitive |
//! | `GET`  | `/events/:id` | 404 if not found |
//! | `GET`  | `/events/:id/predictions` | Newest first |

use axum::{
  Json,
  extract::{Path, State},
};
use octagon_core::{event::EventRecord, source::Sources, store::{FightStore, PredictionRecord}};
use octagon_pipeline::Pipeline;
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /events`
pub async fn list<S, X>(State(p): State<Pipeline<S, X>>) -> Result<Json<Vec<EventRecord>>, ApiError>
where
  S: FightStore,
  X: Sources,
{
  Ok(Json(p.events().await?))
}

/// `GET /events/next`
pub async fn next<S, X>(State(p): State<Pipeline<S, X>>) -> Result<Json<EventRecord>, ApiError>
where
  S: FightStore,
  X: Sources,
{
  Ok(Json(p.load_next_event().await?))
}

/// `GET /events/latest`
pub async fn latest<S, X>(State(p): State<Pipeline<S, X>>) -> Result<Json<EventRecord>, ApiError>
where
  S: FightStore,
  X: Sources,
{
  Ok(Json(p.latest_event().await?))
}

/// `GET /events/by-name/:name`
pub async fn by_name<S, X>(
  State(p): State<Pipeline<S, X>>,
  Path(name): Path<String>,
) -> Result<Json<EventRecord>, ApiError>
where
  S: FightStore,
  X: Sources,
{
  Ok(Json(p.event_by_name(&name).await?))
}

/// `GET /events/:id`
pub async fn get_one<S, X>(
  State(p): State<Pipeline<S, X>>,
  Path(id): Path<Uuid>,
) -> Result<Json<EventRecord>, ApiError>
where
  S: FightStore,
  X: Sources,
{
  Ok(Json(p.event(id).await?))
}

/// `GET /events/:id/predictions`
pub async fn predictions<S, X>(
  State(p): State<Pipeline<S, X>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<PredictionRecord>>, ApiError>
where
  S: FightStore,
  X: Sources,
{
  Ok(Json(p.predictions(id).await?))
}
