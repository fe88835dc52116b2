//! Fighter loading: per-source refresh, isolated fetches, cache writes and
//! the merge into a [`MergedProfile`].

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde_json::Value;

use octagon_core::{
  SourceError,
  event::name_key,
  fighter::{FighterRecord, MergedProfile, Source, normalize_name},
  merge::{is_empty_value, merge_profile},
  source::{FighterSource, Sources},
  store::FightStore,
};

use crate::{
  Pipeline, PipelineError, Result,
  error::store_err,
};

/// When to go back to a source for a fighter that is already cached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Refresh {
  /// Fetch sources that were never fetched or whose payload outlived the
  /// cache TTL.
  #[default]
  IfStale,
  /// Fetch every source.
  Force,
}

impl Refresh {
  pub fn from_flag(force: bool) -> Self { if force { Self::Force } else { Self::IfStale } }
}

/// What to do about the third source for one fighter load.
enum ThirdPlan {
  Fetch,
  Use(Value),
  Skip,
}

impl<S: FightStore, X: Sources> Pipeline<S, X> {
  fn is_stale(&self, record: &FighterRecord, source: Source, refresh: Refresh, now: DateTime<Utc>) -> bool {
    if refresh == Refresh::Force {
      return true;
    }
    match record.sources.get(&source) {
      None => true,
      Some(cached) => self
        .settings
        .cache_ttl
        .is_some_and(|ttl| now - cached.fetched_at > ttl),
    }
  }

  async fn fetch_one(&self, source: Source, name: &str) -> Result<Option<Value>, SourceError> {
    match source {
      Source::Stats => self.sources.stats().fetch_profile(name).await,
      Source::Bio => self.sources.bio().fetch_profile(name).await,
      Source::Third => self.sources.third().fetch_profile(name).await,
    }
  }

  async fn persist(
    &self,
    record: &FighterRecord,
    source: Source,
    payload: Value,
  ) -> Result<FighterRecord> {
    let external_id = source.external_id(&payload);
    self
      .store
      .store_source_payload(record.fighter_id, source, payload, external_id)
      .await
      .map_err(store_err)
  }

  /// Load one fighter, fetching whichever sources need it, and merge.
  ///
  /// Never fails because a source is down or has no data; only store errors
  /// propagate.
  pub async fn load_fighter(&self, name: &str, refresh: Refresh) -> Result<MergedProfile> {
    self.load_with(name, ThirdPlan::Fetch, refresh).await
  }

  async fn load_with(&self, name: &str, third: ThirdPlan, refresh: Refresh) -> Result<MergedProfile> {
    let name = normalize_name(name);
    let mut record = self
      .store
      .get_or_create_fighter(&name)
      .await
      .map_err(store_err)?;
    let now = Utc::now();

    for source in Source::ALL {
      let fetched = match (source, &third) {
        (Source::Third, ThirdPlan::Skip) => continue,
        (Source::Third, ThirdPlan::Use(payload)) => Ok(Some(payload.clone())),
        _ if !self.is_stale(&record, source, refresh, now) => continue,
        _ => self.fetch_one(source, &name).await,
      };

      match fetched {
        Ok(Some(payload)) if !is_empty_value(&payload) => {
          record = self.persist(&record, source, payload).await?;
        }
        Ok(_) => {
          tracing::info!(fighter = %name, %source, "source returned no data; keeping cache");
        }
        Err(e) => {
          tracing::warn!(fighter = %name, %source, error = %e, "source fetch failed; keeping cache");
        }
      }
    }

    Ok(merge_profile(&name, &record))
  }

  /// Batch-fetch third-source payloads for every fighter in `names` that needs
  /// one, in batches of `third_batch_size`. Returns payloads keyed by
  /// [`name_key`]. A failed batch leaves its fighters out.
  pub(crate) async fn prefetch_third(
    &self,
    names: &[String],
    refresh: Refresh,
  ) -> Result<HashMap<String, Value>> {
    let now = Utc::now();
    let mut wanted = Vec::new();
    for name in names {
      let record = self
        .store
        .get_or_create_fighter(name)
        .await
        .map_err(store_err)?;
      if self.is_stale(&record, Source::Third, refresh, now) {
        wanted.push(normalize_name(name));
      }
    }

    let mut found = HashMap::new();
    for chunk in wanted.chunks(self.settings.third_batch_size.max(1)) {
      match self.sources.third().fetch_batch(chunk).await {
        Ok(batch) => {
          tracing::debug!(requested = chunk.len(), returned = batch.len(), "third-source batch");
          found.extend(batch.into_iter().map(|(name, payload)| (name_key(&name), payload)));
        }
        Err(e) => {
          tracing::warn!(requested = chunk.len(), error = %e, "third-source batch failed");
        }
      }
    }
    Ok(found)
  }

  /// Load several fighters. Third-source payloads in `supplied_third` (keyed
  /// by fighter name) are stored as if fetched; the rest of the third source
  /// is batch-fetched up front. Profiles come back keyed by requested name.
  pub async fn load_fighters(
    &self,
    names: &[String],
    supplied_third: HashMap<String, Value>,
    refresh: Refresh,
  ) -> Result<BTreeMap<String, MergedProfile>> {
    let mut supplied: HashMap<String, Value> = supplied_third
      .into_iter()
      .map(|(name, payload)| (name_key(&name), payload))
      .collect();

    let to_prefetch: Vec<String> = names
      .iter()
      .filter(|n| !supplied.contains_key(&name_key(n)))
      .cloned()
      .collect();
    let mut prefetched = self.prefetch_third(&to_prefetch, refresh).await?;

    let mut profiles = BTreeMap::new();
    for name in names {
      let key = name_key(name);
      if key.is_empty() {
        continue;
      }
      let third = match supplied.remove(&key).or_else(|| prefetched.remove(&key)) {
        Some(payload) => ThirdPlan::Use(payload),
        None => ThirdPlan::Skip,
      };
      let profile = self.load_with(name, third, refresh).await?;
      profiles.insert(name.trim().to_owned(), profile);
    }
    Ok(profiles)
  }

  /// Replace a fighter's out-of-band metadata, creating the fighter if
  /// needed, and return the re-merged profile.
  pub async fn set_metadata(&self, name: &str, metadata: Value) -> Result<MergedProfile> {
    let name = normalize_name(name);
    if name.is_empty() {
      return Err(PipelineError::InvalidInput("empty fighter name".into()));
    }
    let record = self
      .store
      .get_or_create_fighter(&name)
      .await
      .map_err(store_err)?;
    let record = self
      .store
      .set_fighter_metadata(record.fighter_id, metadata)
      .await
      .map_err(store_err)?
      .unwrap_or(record);
    Ok(merge_profile(&name, &record))
  }

  /// Cached fighters merged without touching any source.
  pub async fn cached_fighters(&self) -> Result<Vec<MergedProfile>> {
    let records = self.store.list_fighters().await.map_err(store_err)?;
    Ok(records.iter().map(|r| merge_profile(&r.name, r)).collect())
  }
}
