//! Handlers for `/fighters` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/fighters` | Cached fighters, merged; never fetches |
//! | `POST` | `/fighters/load` | Body: [`LoadBody`] |
//! | `GET`  | `/fighters/:name` | `?refresh=true` refetches every source |
//! | `PUT`  | `/fighters/:name/metadata` | Body: any JSON object |

use std::collections::{BTreeMap, HashMap};

use axum::{
  Json,
  extract::{Path, Query, State},
};
use octagon_core::{fighter::MergedProfile, source::Sources, store::FightStore};
use octagon_pipeline::{Pipeline, Refresh};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// `GET /fighters`
pub async fn list<S, X>(State(p): State<Pipeline<S, X>>) -> Result<Json<Vec<MergedProfile>>, ApiError>
where
  S: FightStore,
  X: Sources,
{
  Ok(Json(p.cached_fighters().await?))
}

// ─── Load ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoadBody {
  pub fighters: Vec<String>,
  /// Third-source payloads the caller already has, keyed by fighter name.
  #[serde(default)]
  pub third:    HashMap<String, Value>,
  #[serde(default)]
  pub refresh:  bool,
}

#[derive(Debug, Serialize)]
pub struct LoadResponse {
  pub fighters: BTreeMap<String, MergedProfile>,
}

/// `POST /fighters/load`
pub async fn load<S, X>(
  State(p): State<Pipeline<S, X>>,
  Json(body): Json<LoadBody>,
) -> Result<Json<LoadResponse>, ApiError>
where
  S: FightStore,
  X: Sources,
{
  if body.fighters.iter().all(|n| n.trim().is_empty()) {
    return Err(ApiError::BadRequest("no fighter names given".into()));
  }
  let fighters = p
    .load_fighters(&body.fighters, body.third, Refresh::from_flag(body.refresh))
    .await?;
  Ok(Json(LoadResponse { fighters }))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct GetParams {
  #[serde(default)]
  pub refresh: bool,
}

/// `GET /fighters/:name[?refresh=true]`
pub async fn get_one<S, X>(
  State(p): State<Pipeline<S, X>>,
  Path(name): Path<String>,
  Query(params): Query<GetParams>,
) -> Result<Json<MergedProfile>, ApiError>
where
  S: FightStore,
  X: Sources,
{
  if name.trim().is_empty() {
    return Err(ApiError::BadRequest("empty fighter name".into()));
  }
  Ok(Json(p.load_fighter(&name, Refresh::from_flag(params.refresh)).await?))
}

// ─── Metadata ─────────────────────────────────────────────────────────────────

/// `PUT /fighters/:name/metadata`: replaces the stored metadata and returns
/// the re-merged profile.
pub async fn set_metadata<S, X>(
  State(p): State<Pipeline<S, X>>,
  Path(name): Path<String>,
  Json(metadata): Json<Value>,
) -> Result<Json<MergedProfile>, ApiError>
where
  S: FightStore,
  X: Sources,
{
  if !metadata.is_object() {
    return Err(ApiError::BadRequest("metadata must be a JSON object".into()));
  }
  Ok(Json(p.set_metadata(&name, metadata).await?))
}
