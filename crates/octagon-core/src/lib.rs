//! Core types and trait definitions for the Octagon fight-analysis backend.
//!
//! This crate is free of HTTP and database dependencies. It holds the data
//! model, the merge engine, validated analysis types, and the traits every
//! store and external source implements.

// Native `async fn` in traits; the returned futures carry explicit `Send`
// bounds where it matters.
#![allow(async_fn_in_trait)]

pub mod analysis;
pub mod error;
pub mod event;
pub mod fighter;
pub mod merge;
pub mod odds;
pub mod source;
pub mod store;

pub use error::{Error, Result, SourceError};
