//! Live clients for the external data sources behind Octagon.
//!
//! Every client implements one of the source traits from
//! [`octagon_core::source`]. HTML is parsed in synchronous helpers so no
//! parsed document is ever held across an `.await`.

mod html;
mod http;
mod retry;

pub mod config;
pub mod live;
pub mod odds_api;
pub mod openai;
pub mod sherdog;
pub mod style;
pub mod ufcstats;

pub use config::{LlmConfig, OddsConfig, ScrapeConfig, SourcesConfig};
pub use live::LiveSources;
pub use octagon_core::SourceError;
pub use retry::RetryPolicy;
