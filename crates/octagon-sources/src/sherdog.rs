//! Scraper for the secondary bio site (sherdog.com).

use octagon_core::{
  SourceError,
  event::name_key,
  fighter::Source,
  source::FighterSource,
};
use reqwest::Client;
use scraper::Html;
use serde_json::{Map, Value, json};

use crate::{
  ScrapeConfig,
  html::{absolute_url, canonical_label, first_text, sel, text_of},
  http::{build_client, send_text},
};

#[derive(Debug, Clone)]
pub struct BioSiteClient {
  http:     Client,
  base_url: String,
}

impl BioSiteClient {
  pub fn new(config: &ScrapeConfig) -> Result<Self, SourceError> {
    Ok(Self {
      http:     build_client(config.timeout_secs, &config.user_agent)?,
      base_url: config.bio_base_url.trim_end_matches('/').to_owned(),
    })
  }
}

impl FighterSource for BioSiteClient {
  fn source(&self) -> Source { Source::Bio }

  async fn fetch_profile(&self, name: &str) -> Result<Option<Value>, SourceError> {
    let search = self
      .http
      .get(format!("{}/stats/fightfinder", self.base_url))
      .query(&[("SearchTxt", name)]);
    let html = send_text(search).await?;
    let Some(url) = find_profile_url(&html, name, &self.base_url)? else {
      tracing::info!(fighter = %name, "no bio-site search result");
      return Ok(None);
    };

    let page = send_text(self.http.get(&url)).await?;
    parse_profile_page(&page, &url).map(Some)
  }
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

/// The profile link of the first fight-finder result whose name matches
/// exactly (case-insensitive).
pub fn find_profile_url(html: &str, name: &str, base: &str) -> Result<Option<String>, SourceError> {
  let doc = Html::parse_document(html);
  let links = sel("table.fightfinder_result a[href]")?;
  let wanted = name_key(name);
  Ok(
    doc
      .select(&links)
      .find(|a| name_key(&text_of(*a)) == wanted)
      .and_then(|a| a.value().attr("href"))
      .map(|href| absolute_url(base, href)),
  )
}

pub fn parse_profile_page(html: &str, url: &str) -> Result<Value, SourceError> {
  let doc = Html::parse_document(html);
  let root = doc.root_element();

  let name = first_text(root, &sel("h1[itemprop=\"name\"] span.fn")?);
  let nickname = first_text(root, &sel("h1[itemprop=\"name\"] span.nickname")?)
    .map(|n| n.trim_matches('"').trim().to_owned());

  let count = |css: &'static str| -> Result<Option<String>, SourceError> {
    Ok(first_text(root, &sel(css)?))
  };
  let record = match (
    count(".winloses.win span:nth-child(2)")?,
    count(".winloses.lose span:nth-child(2)")?,
  ) {
    (Some(w), Some(l)) => {
      let d = count(".winloses.draws span:nth-child(2)")?.unwrap_or_else(|| "0".into());
      Some(format!("{w}-{l}-{d}"))
    }
    _ => None,
  };

  let mut details = Map::new();
  let row = sel("div.bio-holder table tr")?;
  let cell = sel("td")?;
  for tr in doc.select(&row) {
    let tds: Vec<_> = tr.select(&cell).map(text_of).collect();
    if let [label, value, ..] = tds.as_slice() {
      let label = canonical_label(label);
      if !label.is_empty() && !value.is_empty() {
        details.insert(label, Value::String(value.clone()));
      }
    }
  }
  if let Some(born) = first_text(root, &sel("span[itemprop=\"birthDate\"]")?) {
    details.insert("Birth Date".into(), Value::String(born));
  }
  if let Some(height) = first_text(root, &sel("b[itemprop=\"height\"]")?) {
    details.insert("Height".into(), Value::String(height));
  }

  let history_row = sel("div.fight_history table tr")?;
  let mut fights = Vec::new();
  for tr in doc.select(&history_row) {
    if tr.value().classes().any(|c| c == "table_head") {
      continue;
    }
    let tds: Vec<_> = tr.select(&cell).map(text_of).collect();
    if tds.len() < 6 {
      continue;
    }
    fights.push(json!({
      "result":   tds[0],
      "opponent": tds[1],
      "event":    tds[2],
      "method":   tds[3],
      "round":    tds[4],
      "time":     tds[5],
    }));
  }

  Ok(json!({
    "name":          name,
    "nickname":      nickname,
    "record":        record,
    "url":           url,
    "details":       details,
    "fight_history": fights,
  }))
}
