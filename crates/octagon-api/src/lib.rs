//! JSON REST API for Octagon.
//!
//! Exposes an axum [`Router`] over a [`Pipeline`] backed by any
//! [`FightStore`] and [`Sources`] bundle. TLS, auth and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = octagon_api::api_router(pipeline);
//! ```

pub mod analysis;
pub mod error;
pub mod events;
pub mod fighters;
pub mod odds;

use axum::{
  Json, Router,
  routing::{get, post, put},
};
use octagon_core::{source::Sources, store::FightStore};
use octagon_pipeline::Pipeline;
use serde_json::{Value, json};

pub use error::ApiError;

/// Build a fully-materialised API router for `pipeline`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, X>(pipeline: Pipeline<S, X>) -> Router<()>
where
  S: FightStore + 'static,
  X: Sources,
{
  Router::new()
    .route("/health", get(health))
    // Events
    .route("/events", get(events::list::<S, X>))
    .route("/events/next", get(events::next::<S, X>))
    .route("/events/latest", get(events::latest::<S, X>))
    .route("/events/by-name/{name}", get(events::by_name::<S, X>))
    .route("/events/{id}", get(events::get_one::<S, X>))
    .route("/events/{id}/analysis", post(analysis::event::<S, X>))
    .route("/events/{id}/predictions", get(events::predictions::<S, X>))
    // Fighters
    .route("/fighters", get(fighters::list::<S, X>))
    .route("/fighters/load", post(fighters::load::<S, X>))
    .route("/fighters/{name}", get(fighters::get_one::<S, X>))
    .route("/fighters/{name}/metadata", put(fighters::set_metadata::<S, X>))
    // Odds and analysis
    .route("/odds", post(odds::attach::<S, X>))
    .route("/analysis/next", get(analysis::next::<S, X>))
    .route("/analysis/fight", post(analysis::fight::<S, X>))
    .route("/analysis/fight/stream", post(analysis::fight_stream::<S, X>))
    .with_state(pipeline)
}

/// `GET /health`
async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }
