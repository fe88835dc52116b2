//! Handler for `POST /odds`.

use axum::{Json, extract::State};
use octagon_core::{event::FightPair, odds::MatchupOdds, source::Sources, store::FightStore};
use octagon_pipeline::Pipeline;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct OddsBody {
  pub fight_card: Vec<FightPair>,
}

#[derive(Debug, Serialize)]
pub struct OddsResponse {
  pub odds: Vec<MatchupOdds>,
}

/// `POST /odds`: one entry per pair in card order. When the odds feed is
/// down every entry has `"odds": null`.
pub async fn attach<S, X>(
  State(p): State<Pipeline<S, X>>,
  Json(body): Json<OddsBody>,
) -> Result<Json<OddsResponse>, ApiError>
where
  S: FightStore,
  X: Sources,
{
  Ok(Json(OddsResponse { odds: p.attach_odds(&body.fight_card).await }))
}
