//! In-process fakes for every source trait, scripted per test.
//!
//! Everything uses interior mutability so a test can keep scripting the
//! fakes through [`crate::Pipeline::sources`] after the pipeline is built.

use std::{
  collections::{HashMap, VecDeque},
  sync::{
    Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
};

use futures::{StreamExt, stream};
use serde_json::Value;

use octagon_core::{
  SourceError,
  event::{NewEvent, name_key},
  fighter::{Source, normalize_name},
  odds::OddsEvent,
  source::{
    ChatMessage, ChatModel, EventScraper, FighterSource, OddsFeed, ReplyFormat, Sources,
    TextStream,
  },
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> { m.lock().unwrap_or_else(PoisonError::into_inner) }

// ─── Fighter sources ─────────────────────────────────────────────────────────

/// A fighter source answering from a per-name script. Unscripted names have
/// no data.
#[derive(Debug)]
pub struct FakeFighterSource {
  source:       Source,
  responses:    Mutex<HashMap<String, Result<Option<Value>, SourceError>>>,
  calls:        Mutex<Vec<String>>,
  batch_sizes:  Mutex<Vec<usize>>,
  fail_batches: AtomicBool,
}

impl FakeFighterSource {
  pub fn new(source: Source) -> Self {
    Self {
      source,
      responses: Mutex::default(),
      calls: Mutex::default(),
      batch_sizes: Mutex::default(),
      fail_batches: AtomicBool::new(false),
    }
  }

  pub fn respond(&self, name: &str, payload: Value) {
    lock(&self.responses).insert(name_key(name), Ok(Some(payload)));
  }

  pub fn fail(&self, name: &str, error: SourceError) {
    lock(&self.responses).insert(name_key(name), Err(error));
  }

  pub fn forget(&self, name: &str) { lock(&self.responses).remove(&name_key(name)); }

  /// Make every batch request fail outright.
  pub fn fail_batches(&self, fail: bool) { self.fail_batches.store(fail, Ordering::SeqCst); }

  /// Names looked up so far, in order.
  pub fn calls(&self) -> Vec<String> { lock(&self.calls).clone() }

  /// Size of every batch request so far.
  pub fn batch_sizes(&self) -> Vec<usize> { lock(&self.batch_sizes).clone() }

  fn answer(&self, name: &str) -> Result<Option<Value>, SourceError> {
    lock(&self.calls).push(normalize_name(name));
    lock(&self.responses)
      .get(&name_key(name))
      .cloned()
      .unwrap_or(Ok(None))
  }
}

impl FighterSource for FakeFighterSource {
  fn source(&self) -> Source { self.source }

  async fn fetch_profile<'a>(&'a self, name: &'a str) -> Result<Option<Value>, SourceError> {
    self.answer(name)
  }

  async fn fetch_batch<'a>(&'a self, names: &'a [String]) -> Result<HashMap<String, Value>, SourceError> {
    lock(&self.batch_sizes).push(names.len());
    if self.fail_batches.load(Ordering::SeqCst) {
      return Err(SourceError::Http("batch refused".into()));
    }
    let mut found = HashMap::new();
    for name in names {
      if let Ok(Some(payload)) = self.answer(name) {
        found.insert(normalize_name(name), payload);
      }
    }
    Ok(found)
  }
}

// ─── Events and odds ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct FakeScraper {
  next:  Mutex<Result<Option<NewEvent>, SourceError>>,
  calls: AtomicUsize,
}

impl Default for FakeScraper {
  fn default() -> Self { Self { next: Mutex::new(Ok(None)), calls: AtomicUsize::new(0) } }
}

impl FakeScraper {
  pub fn set(&self, next: Result<Option<NewEvent>, SourceError>) { *lock(&self.next) = next; }

  pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl EventScraper for FakeScraper {
  async fn next_event(&self) -> Result<Option<NewEvent>, SourceError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    lock(&self.next).clone()
  }
}

#[derive(Debug)]
pub struct FakeOdds {
  upcoming: Mutex<Result<Vec<OddsEvent>, SourceError>>,
  calls:    AtomicUsize,
}

impl Default for FakeOdds {
  fn default() -> Self { Self { upcoming: Mutex::new(Ok(Vec::new())), calls: AtomicUsize::new(0) } }
}

impl FakeOdds {
  pub fn set(&self, upcoming: Result<Vec<OddsEvent>, SourceError>) {
    *lock(&self.upcoming) = upcoming;
  }

  pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl OddsFeed for FakeOdds {
  async fn upcoming(&self) -> Result<Vec<OddsEvent>, SourceError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    lock(&self.upcoming).clone()
  }
}

// ─── Model ───────────────────────────────────────────────────────────────────

/// A chat model that replays queued replies in order. With the queue empty,
/// completions fail.
#[derive(Debug, Default)]
pub struct FakeModel {
  replies:  Mutex<VecDeque<Result<String, SourceError>>>,
  chunks:   Mutex<Vec<String>>,
  requests: Mutex<Vec<(Vec<ChatMessage>, Option<ReplyFormat>)>>,
}

impl FakeModel {
  pub fn push_reply(&self, reply: impl Into<String>) { lock(&self.replies).push_back(Ok(reply.into())); }

  pub fn push_error(&self, error: SourceError) { lock(&self.replies).push_back(Err(error)); }

  /// Chunks returned by every subsequent streaming call.
  pub fn set_stream(&self, chunks: &[&str]) {
    *lock(&self.chunks) = chunks.iter().map(|c| (*c).to_owned()).collect();
  }

  /// Every request so far with its format; streaming calls carry `None`.
  pub fn requests(&self) -> Vec<(Vec<ChatMessage>, Option<ReplyFormat>)> {
    lock(&self.requests).clone()
  }
}

impl ChatModel for FakeModel {
  async fn complete<'a>(
    &'a self,
    messages: &'a [ChatMessage],
    format: ReplyFormat,
  ) -> Result<String, SourceError> {
    lock(&self.requests).push((messages.to_vec(), Some(format)));
    lock(&self.replies)
      .pop_front()
      .unwrap_or_else(|| Err(SourceError::Http("no scripted reply".into())))
  }

  async fn stream<'a>(&'a self, messages: &'a [ChatMessage]) -> Result<TextStream, SourceError> {
    lock(&self.requests).push((messages.to_vec(), None));
    let chunks = lock(&self.chunks).clone();
    Ok(stream::iter(chunks.into_iter().map(Ok)).boxed())
  }
}

// ─── Bundle ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct FakeSources {
  pub stats:   FakeFighterSource,
  pub bio:     FakeFighterSource,
  pub third:   FakeFighterSource,
  pub scraper: FakeScraper,
  pub odds:    FakeOdds,
  pub model:   FakeModel,
}

impl Default for FakeSources {
  fn default() -> Self {
    Self {
      stats:   FakeFighterSource::new(Source::Stats),
      bio:     FakeFighterSource::new(Source::Bio),
      third:   FakeFighterSource::new(Source::Third),
      scraper: FakeScraper::default(),
      odds:    FakeOdds::default(),
      model:   FakeModel::default(),
    }
  }
}

impl Sources for FakeSources {
  type Stats = FakeFighterSource;
  type Bio = FakeFighterSource;
  type Third = FakeFighterSource;
  type Scraper = FakeScraper;
  type Odds = FakeOdds;
  type Model = FakeModel;

  fn stats(&self) -> &FakeFighterSource { &self.stats }
  fn bio(&self) -> &FakeFighterSource { &self.bio }
  fn third(&self) -> &FakeFighterSource { &self.third }
  fn scraper(&self) -> &FakeScraper { &self.scraper }
  fn odds(&self) -> &FakeOdds { &self.odds }
  fn model(&self) -> &FakeModel { &self.model }
}
