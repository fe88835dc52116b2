//! Handlers for analysis runs.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/events/:id/analysis` | Full card; persisted; 502 on an unusable reply |
//! | `GET`  | `/analysis/next` | Resolve the next event, then analyse it |
//! | `POST` | `/analysis/fight` | Body: [`FightBody`]; not persisted |
//! | `POST` | `/analysis/fight/stream` | Same body; `text/event-stream` |

use std::convert::Infallible;

use axum::{
  Json,
  extract::{Path, State},
  response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt, stream};
use octagon_core::{
  analysis::{AnalysisResult, FightPrediction},
  event::FightPair,
  source::Sources,
  store::FightStore,
};
use octagon_pipeline::Pipeline;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// `POST /events/:id/analysis`
pub async fn event<S, X>(
  State(p): State<Pipeline<S, X>>,
  Path(id): Path<Uuid>,
) -> Result<Json<AnalysisResult>, ApiError>
where
  S: FightStore,
  X: Sources,
{
  Ok(Json(p.analyze_event_id(id).await?))
}

/// `GET /analysis/next`
pub async fn next<S, X>(State(p): State<Pipeline<S, X>>) -> Result<Json<AnalysisResult>, ApiError>
where
  S: FightStore,
  X: Sources,
{
  Ok(Json(p.analyze_next_event().await?))
}

#[derive(Debug, Deserialize)]
pub struct FightBody {
  pub event_name: Option<String>,
  pub fight:      FightPair,
}

/// `POST /analysis/fight`
pub async fn fight<S, X>(
  State(p): State<Pipeline<S, X>>,
  Json(body): Json<FightBody>,
) -> Result<Json<FightPrediction>, ApiError>
where
  S: FightStore,
  X: Sources,
{
  Ok(Json(p.analyze_fight(body.event_name.as_deref(), &body.fight).await?))
}

/// `POST /analysis/fight/stream`
///
/// Each text chunk is one `data:` event. A mid-stream model failure is sent
/// as an `error` event and stops the chunks. The stream always closes with a
/// `done` event.
pub async fn fight_stream<S, X>(
  State(p): State<Pipeline<S, X>>,
  Json(body): Json<FightBody>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError>
where
  S: FightStore,
  X: Sources,
{
  let chunks = p.stream_fight(body.event_name.as_deref(), &body.fight).await?;

  let events = chunks
    .scan(false, |failed, chunk| {
      if *failed {
        return futures::future::ready(None);
      }
      let event = match chunk {
        Ok(text) => Event::default().data(text),
        Err(e) => {
          tracing::warn!(error = %e, "fight stream interrupted");
          *failed = true;
          Event::default().event("error").data(e.to_string())
        }
      };
      futures::future::ready(Some(event))
    })
    .chain(stream::once(async { Event::default().event("done").data("") }))
    .map(Ok);

  Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
