//! The merge engine: fold a fighter's per-source payloads into one
//! [`MergedProfile`].
//!
//! Identity and physical fields take the first non-empty value in a fixed
//! priority order. Fight histories are kept per source, untouched.

use serde_json::Value;

use crate::fighter::{
  FightHistory, FighterRecord, MergedProfile, Source, SourceLinks, normalize_name,
};

/// Placeholder tokens that sources emit in place of a missing value.
const PLACEHOLDERS: [&str; 3] = ["N/A", "-", "--"];

/// Whether a JSON value carries no information: `null`, a blank string, a
/// placeholder token, or an empty object.
pub fn is_empty_value(value: &Value) -> bool {
  match value {
    Value::Null => true,
    Value::String(s) => {
      let s = s.trim();
      s.is_empty() || PLACEHOLDERS.contains(&s)
    }
    Value::Object(map) => map.is_empty(),
    _ => false,
  }
}

/// First candidate that is present and non-empty.
pub fn pick_best<'a, I>(candidates: I) -> Option<&'a Value>
where
  I: IntoIterator<Item = Option<&'a Value>>,
{
  candidates.into_iter().flatten().find(|v| !is_empty_value(v))
}

/// Follow a path of object keys.
fn lookup<'a>(root: Option<&'a Value>, path: &[&str]) -> Option<&'a Value> {
  path.iter().try_fold(root?, |value, key| value.get(*key))
}

fn as_text(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

fn pick_text<'a, I>(candidates: I) -> Option<String>
where
  I: IntoIterator<Item = Option<&'a Value>>,
{
  pick_best(candidates).and_then(as_text)
}

// ─── Field normalisation ─────────────────────────────────────────────────────

fn clean_height(value: String) -> String { value.split_whitespace().collect() }

fn clean_reach(value: String) -> String {
  value.trim().trim_end_matches('"').trim_end().to_owned()
}

fn clean_trimmed(value: String) -> String { value.trim().to_owned() }

// ─── Merge ───────────────────────────────────────────────────────────────────

/// Merge a cached fighter into a profile. `input_name` is the name the caller
/// asked for; it is the final fallback for the display name.
pub fn merge_profile(input_name: &str, record: &FighterRecord) -> MergedProfile {
  let stats = record.payload(Source::Stats);
  let bio = record.payload(Source::Bio);
  let third = record.payload(Source::Third);
  let meta = record.metadata.as_ref();

  let name = pick_text([
    lookup(stats, &["name"]),
    lookup(bio, &["name"]),
    lookup(meta, &["name"]),
  ])
  .map(|n| normalize_name(&n))
  .filter(|n| !n.is_empty())
  .unwrap_or_else(|| normalize_name(input_name));

  let nickname = pick_text([lookup(bio, &["nickname"]), lookup(meta, &["nickname"])])
    .map(clean_trimmed);

  let record_line = pick_text([
    lookup(bio, &["record"]),
    lookup(stats, &["career_stats", "Record"]),
    lookup(stats, &["record"]),
  ])
  .map(clean_trimmed);

  let height = pick_text([
    lookup(stats, &["attributes", "Height"]),
    lookup(bio, &["details", "Height"]),
  ])
  .map(clean_height);

  let reach = pick_text([
    lookup(stats, &["attributes", "Reach"]),
    lookup(bio, &["details", "Reach"]),
  ])
  .map(clean_reach);

  let stance = pick_text([
    lookup(stats, &["attributes", "Stance"]),
    lookup(meta, &["stance"]),
  ])
  .map(clean_trimmed);

  let dob = pick_text([
    lookup(stats, &["attributes", "DOB"]),
    lookup(bio, &["details", "Birth Date"]),
  ])
  .map(clean_trimmed);

  let career_stats = lookup(stats, &["career_stats"])
    .filter(|v| v.is_object())
    .cloned()
    .unwrap_or_else(|| Value::Object(Default::default()));

  let fight_history = FightHistory {
    stats: lookup(stats, &["fight_history"]).cloned().unwrap_or(Value::Null),
    bio:   lookup(bio, &["fight_history"]).cloned().unwrap_or(Value::Null),
    third: lookup(third, &["history"]).cloned().unwrap_or(Value::Null),
  };

  let style_summary = pick_text([lookup(third, &["summary"])]).map(clean_trimmed);

  let sources = SourceLinks {
    stats: pick_text([lookup(stats, &["url"])]),
    bio:   pick_text([lookup(bio, &["url"])]),
    third: pick_text([lookup(third, &["url"])]),
  };

  MergedProfile {
    name,
    nickname,
    record: record_line,
    height,
    reach,
    stance,
    dob,
    career_stats,
    fight_history,
    style_summary,
    sources,
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use chrono::Utc;
  use serde_json::json;
  use uuid::Uuid;

  use super::*;
  use crate::fighter::{ExternalIds, SourcePayload};

  fn record(
    stats: Option<Value>,
    bio: Option<Value>,
    third: Option<Value>,
    metadata: Option<Value>,
  ) -> FighterRecord {
    let mut sources = BTreeMap::new();
    for (source, data) in [(Source::Stats, stats), (Source::Bio, bio), (Source::Third, third)] {
      if let Some(data) = data {
        sources.insert(source, SourcePayload { data, fetched_at: Utc::now() });
      }
    }
    FighterRecord {
      fighter_id: Uuid::new_v4(),
      name: "jon jones".into(),
      external_ids: ExternalIds::default(),
      sources,
      metadata,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  #[test]
  fn empty_values() {
    for v in [json!(null), json!(""), json!("  "), json!("N/A"), json!("-"), json!("--"), json!({})] {
      assert!(is_empty_value(&v), "{v} should be empty");
    }
    for v in [json!("x"), json!(0), json!([]), json!({ "a": 1 }), json!(false)] {
      assert!(!is_empty_value(&v), "{v} should not be empty");
    }
  }

  #[test]
  fn name_follows_priority_order() {
    let stats = json!({ "name": "Jon Jones" });
    let bio = json!({ "name": "Jonathan Jones" });
    let meta = json!({ "name": "Bones" });

    let r = record(Some(stats), Some(bio.clone()), None, Some(meta.clone()));
    assert_eq!(merge_profile("jon jones", &r).name, "Jon Jones");

    let r = record(Some(json!({ "name": "N/A" })), Some(bio), None, Some(meta.clone()));
    assert_eq!(merge_profile("jon jones", &r).name, "Jonathan Jones");

    let r = record(None, Some(json!({ "name": "" })), None, Some(meta));
    assert_eq!(merge_profile("jon jones", &r).name, "Bones");

    let r = record(None, None, None, None);
    assert_eq!(merge_profile("  jon\u{a0}jones ", &r).name, "jon jones");
  }

  #[test]
  fn physical_fields_are_lightly_normalised() {
    let stats = json!({
      "attributes": { "Height": "6' 4\"", "Reach": "84\"", "Stance": " Orthodox ", "DOB": "--" }
    });
    let bio = json!({ "details": { "Birth Date": "1987-07-19", "Height": "6'4\"" } });
    let p = merge_profile("Jon Jones", &record(Some(stats), Some(bio), None, None));
    assert_eq!(p.height.as_deref(), Some("6'4\""));
    assert_eq!(p.reach.as_deref(), Some("84"));
    assert_eq!(p.stance.as_deref(), Some("Orthodox"));
    assert_eq!(p.dob.as_deref(), Some("1987-07-19"));
  }

  #[test]
  fn record_prefers_bio_then_stats_career_line() {
    let stats = json!({ "career_stats": { "Record": "27-1-0" } });
    let p = merge_profile("x", &record(Some(stats.clone()), None, None, None));
    assert_eq!(p.record.as_deref(), Some("27-1-0"));

    let bio = json!({ "record": " 28-1-0 " });
    let p = merge_profile("x", &record(Some(stats), Some(bio), None, None));
    assert_eq!(p.record.as_deref(), Some("28-1-0"));
  }

  #[test]
  fn histories_are_kept_verbatim_per_source() {
    let stats_hist = json!([{ "result": "win", "opponent": "Stipe Miocic" }]);
    let bio_hist = json!([{ "result": "W", "opponent": "Ciryl Gane", "round": 1 }]);
    let third_hist = json!([{ "opponent": "Dominick Reyes", "result": "Win" }]);
    let r = record(
      Some(json!({ "fight_history": stats_hist.clone() })),
      Some(json!({ "fight_history": bio_hist.clone() })),
      Some(json!({ "history": third_hist.clone(), "summary": "Long, versatile striker." })),
      None,
    );
    let p = merge_profile("Jon Jones", &r);
    assert_eq!(p.fight_history.stats, stats_hist);
    assert_eq!(p.fight_history.bio, bio_hist);
    assert_eq!(p.fight_history.third, third_hist);
    assert_eq!(p.style_summary.as_deref(), Some("Long, versatile striker."));
  }

  #[test]
  fn no_sources_gives_empty_profile() {
    let p = merge_profile("Nobody", &record(None, None, None, None));
    assert_eq!(p.name, "Nobody");
    assert!(p.nickname.is_none() && p.record.is_none() && p.height.is_none());
    assert_eq!(p.career_stats, json!({}));
    assert_eq!(p.fight_history, FightHistory::default());
  }
}
