//! The third fighter source: style summaries and fight histories produced by
//! the language model, requested for up to [`MAX_BATCH`] fighters per prompt.

use std::collections::HashMap;

use octagon_core::{
  SourceError,
  analysis::parse_model_json,
  event::name_key,
  fighter::{Source, normalize_name},
  source::{ChatMessage, ChatModel, FighterSource, ReplyFormat},
};
use serde::Deserialize;
use serde_json::{Value, json};

/// Most fighters sent in one prompt.
pub const MAX_BATCH: usize = 20;

const PROFILE_BASE: &str = "https://www.tapology.com/fightcenter/fighters";

#[derive(Debug, Deserialize)]
struct BatchReply {
  #[serde(default)]
  results: Vec<BatchEntry>,
}

#[derive(Debug, Deserialize)]
struct BatchEntry {
  fighter: String,
  #[serde(default)]
  summary: Option<String>,
  #[serde(default)]
  history: Value,
}

/// Lowercase, ASCII-alphanumeric words joined by `-`.
pub fn slugify(name: &str) -> String {
  name
    .to_lowercase()
    .split(|c: char| !c.is_ascii_alphanumeric())
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join("-")
}

fn prompt(names: &[String]) -> Vec<ChatMessage> {
  let list = names.iter().map(|n| format!("- {n}")).collect::<Vec<_>>().join("\n");
  vec![
    ChatMessage::system(
      "You compile concise MMA fighter profiles. Reply with a single JSON object only.",
    ),
    ChatMessage::user(format!(
      "For each fighter below give a short summary of their fighting style, career \
       trajectory, strengths and weaknesses, and their recent professional fight history.\n\n\
       Fighters:\n{list}\n\n\
       Reply as {{\"results\": [{{\"fighter\": \"<name as listed>\", \"summary\": \"...\", \
       \"history\": [{{\"opponent\": \"...\", \"result\": \"Win|Loss|Draw|NC\", \
       \"method\": \"...\", \"round\": \"...\", \"time\": \"...\", \"event\": \"...\", \
       \"date\": \"YYYY-MM-DD\"}}]}}]}}"
    )),
  ]
}

/// Model-backed style source.
#[derive(Debug, Clone)]
pub struct StyleSource<M> {
  model: M,
}

impl<M: ChatModel> StyleSource<M> {
  pub fn new(model: M) -> Self { Self { model } }

  /// One prompt for at most [`MAX_BATCH`] normalised names. Entries the model
  /// returns for names that were not asked for are ignored.
  async fn fetch_chunk(&self, names: &[String]) -> Result<HashMap<String, Value>, SourceError> {
    let reply = self.model.complete(&prompt(names), ReplyFormat::Json).await?;
    let value = parse_model_json(&reply).map_err(|e| SourceError::Parse(e.to_string()))?;
    let parsed: BatchReply =
      serde_json::from_value(value).map_err(|e| SourceError::Parse(e.to_string()))?;

    let mut by_key: HashMap<String, BatchEntry> = parsed
      .results
      .into_iter()
      .map(|entry| (name_key(&entry.fighter), entry))
      .collect();

    let mut found = HashMap::new();
    for name in names {
      let Some(entry) = by_key.remove(&name_key(name)) else {
        continue;
      };
      let summary = entry.summary.filter(|s| !s.trim().is_empty());
      if summary.is_none() && entry.history.as_array().is_none_or(Vec::is_empty) {
        continue;
      }
      let slug = slugify(name);
      found.insert(name.clone(), json!({
        "fighter": name,
        "summary": summary,
        "history": entry.history,
        "slug":    slug,
        "url":     format!("{PROFILE_BASE}/{slug}"),
      }));
    }
    Ok(found)
  }
}

impl<M: ChatModel> FighterSource for StyleSource<M> {
  fn source(&self) -> Source { Source::Third }

  async fn fetch_profile(&self, name: &str) -> Result<Option<Value>, SourceError> {
    let name = normalize_name(name);
    let mut found = self.fetch_chunk(std::slice::from_ref(&name)).await?;
    Ok(found.remove(&name))
  }

  async fn fetch_batch(&self, names: &[String]) -> Result<HashMap<String, Value>, SourceError> {
    let names: Vec<String> = names.iter().map(|n| normalize_name(n)).collect();
    let mut found = HashMap::new();
    for chunk in names.chunks(MAX_BATCH) {
      match self.fetch_chunk(chunk).await {
        Ok(part) => found.extend(part),
        Err(e) => tracing::warn!(size = chunk.len(), error = %e, "style batch failed"),
      }
    }
    Ok(found)
  }
}
