//! Scraper for the primary stats site (ufcstats.com).
//!
//! Provides the `stats` fighter payload and the upcoming-event scrape used
//! by the second tier of event resolution.

use octagon_core::{
  SourceError,
  event::{FightPair, NewEvent, name_key},
  fighter::{Source, normalize_name},
  source::{EventScraper, FighterSource},
};
use reqwest::Client;
use scraper::Html;
use serde_json::{Map, Value, json};

use crate::{
  ScrapeConfig,
  html::{absolute_url, first_text, label_value, sel, text_of},
  http::{build_client, send_text},
};

#[derive(Debug, Clone)]
pub struct StatsSiteClient {
  http:     Client,
  base_url: String,
}

impl StatsSiteClient {
  pub fn new(config: &ScrapeConfig) -> Result<Self, SourceError> {
    Ok(Self {
      http:     build_client(config.timeout_secs, &config.user_agent)?,
      base_url: config.stats_base_url.trim_end_matches('/').to_owned(),
    })
  }

  async fn get(&self, url: &str) -> Result<String, SourceError> {
    send_text(self.http.get(url)).await
  }
}

impl FighterSource for StatsSiteClient {
  fn source(&self) -> Source { Source::Stats }

  async fn fetch_profile(&self, name: &str) -> Result<Option<Value>, SourceError> {
    let search = self
      .http
      .get(format!("{}/statistics/fighters", self.base_url))
      .query(&[("query", name), ("page", "all")]);
    let html = send_text(search).await?;
    let Some(url) = find_fighter_url(&html, name, &self.base_url)? else {
      tracing::info!(fighter = %name, "no stats-site search result");
      return Ok(None);
    };

    let page = self.get(&url).await?;
    parse_fighter_page(&page, &url).map(Some)
  }
}

impl EventScraper for StatsSiteClient {
  async fn next_event(&self) -> Result<Option<NewEvent>, SourceError> {
    let listing = self
      .get(&format!("{}/statistics/events/upcoming", self.base_url))
      .await?;
    let Some(url) = first_upcoming_url(&listing, &self.base_url)? else {
      tracing::info!("stats-site upcoming listing is empty");
      return Ok(None);
    };
    let page = self.get(&url).await?;
    parse_event_page(&page)
  }
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

/// Pick the fighter detail URL from the search results table. An exact
/// (case-insensitive) full-name match wins; otherwise the first row whose name
/// contains, or is contained in, the query.
pub fn find_fighter_url(html: &str, name: &str, base: &str) -> Result<Option<String>, SourceError> {
  let doc = Html::parse_document(html);
  let rows = sel("table.b-statistics__table tr")?;
  let cells = sel("td")?;
  let link = sel("a")?;

  let wanted = name_key(name);
  let mut loose = None;
  for row in doc.select(&rows) {
    let tds: Vec<_> = row.select(&cells).collect();
    let (Some(first), Some(last)) = (tds.first(), tds.get(1)) else {
      continue;
    };
    let Some(href) = first.select(&link).next().and_then(|a| a.value().attr("href")) else {
      continue;
    };
    let found = name_key(&format!("{} {}", text_of(*first), text_of(*last)));
    if found.is_empty() {
      continue;
    }
    if found == wanted {
      return Ok(Some(absolute_url(base, href)));
    }
    if loose.is_none() && (found.contains(&wanted) || wanted.contains(&found)) {
      loose = Some(absolute_url(base, href));
    }
  }
  Ok(loose)
}

pub fn parse_fighter_page(html: &str, url: &str) -> Result<Value, SourceError> {
  let doc = Html::parse_document(html);
  let root = doc.root_element();

  let name = first_text(root, &sel("span.b-content__title-highlight")?);
  let nickname = first_text(root, &sel("p.b-content__Nickname")?);
  let record = first_text(root, &sel("span.b-content__title-record")?)
    .map(|r| r.trim_start_matches("Record:").trim().to_owned());

  let item = sel("li.b-list__box-list-item")?;
  let boxed = |css: &'static str| -> Result<Map<String, Value>, SourceError> {
    let mut map = Map::new();
    for container in doc.select(&sel(css)?) {
      for li in container.select(&item) {
        if let Some((label, value)) = label_value(&text_of(li)) {
          map.insert(label, Value::String(value));
        }
      }
    }
    Ok(map)
  };
  let attributes = boxed("div.b-list__info-box_style_small-width")?;
  let career_stats = boxed("div.b-list__info-box_style_middle-width")?;

  let rows = sel("table.b-fight-details__table tr.b-fight-details__table-row")?;
  let cells = sel("td")?;
  let para = sel("p")?;
  let mut fights = Vec::new();
  for row in doc.select(&rows) {
    let tds: Vec<_> = row.select(&cells).collect();
    if tds.len() < 10 {
      continue;
    }
    let nth_p = |td: usize, n: usize| {
      tds[td].select(&para).nth(n).map(text_of).unwrap_or_default()
    };
    fights.push(json!({
      "result":   text_of(tds[0]),
      "opponent": nth_p(1, 1),
      "event":    nth_p(6, 0),
      "method":   nth_p(7, 0),
      "round":    text_of(tds[8]),
      "time":     text_of(tds[9]),
    }));
  }

  Ok(json!({
    "name":          name,
    "nickname":      nickname,
    "record":        record,
    "url":           url,
    "attributes":    attributes,
    "career_stats":  career_stats,
    "fight_history": fights,
  }))
}

pub fn first_upcoming_url(html: &str, base: &str) -> Result<Option<String>, SourceError> {
  let doc = Html::parse_document(html);
  let link = sel("table.b-statistics__table-events tr.b-statistics__table-row a[href]")?;
  Ok(
    doc
      .select(&link)
      .find_map(|a| a.value().attr("href"))
      .map(|href| absolute_url(base, href)),
  )
}

/// Parse an event detail page. Returns `None` when the page has no name or no
/// parseable fights.
pub fn parse_event_page(html: &str) -> Result<Option<NewEvent>, SourceError> {
  let doc = Html::parse_document(html);
  let root = doc.root_element();

  let Some(name) = first_text(root, &sel("span.b-content__title-highlight")?) else {
    return Ok(None);
  };

  let mut date = None;
  let mut location = None;
  for li in doc.select(&sel("li.b-list__box-list-item")?) {
    match label_value(&text_of(li)) {
      Some((label, value)) if label == "Date" && !value.is_empty() => date = Some(value),
      Some((label, value)) if label == "Location" && !value.is_empty() => location = Some(value),
      _ => {}
    }
  }

  let rows = sel("tbody.b-fight-details__table-body tr.b-fight-details__table-row")?;
  let cells = sel("td")?;
  let fighter_link = sel("a.b-link")?;
  let mut fight_card = Vec::new();
  for row in doc.select(&rows) {
    let tds: Vec<_> = row.select(&cells).collect();
    let Some(fighters) = tds.get(1) else { continue };
    let names: Vec<String> = fighters.select(&fighter_link).map(text_of).collect();
    let [a, b] = names.as_slice() else { continue };
    if a.is_empty() || b.is_empty() {
      continue;
    }
    let mut pair = FightPair::new(a.as_str(), b.as_str());
    pair.weight_class = tds.get(6).map(|td| text_of(*td)).filter(|w| !w.is_empty());
    fight_card.push(pair);
  }

  if fight_card.is_empty() {
    return Ok(None);
  }
  Ok(Some(NewEvent { name: normalize_name(&name), date, location, fight_card }))
}

#[cfg(test)]
mod tests {
  use super::*;

  const SEARCH: &str = r#"
    <table class="b-statistics__table"><tbody>
      <tr class="b-statistics__table-row"><th>First</th><th>Last</th></tr>
      <tr class="b-statistics__table-row">
        <td><a href="http://ufcstats.com/fighter-details/aaa">Jon</a></td>
        <td><a href="http://ufcstats.com/fighter-details/aaa">Jonesy</a></td>
      </tr>
      <tr class="b-statistics__table-row">
        <td><a href="http://ufcstats.com/fighter-details/07f72a2a7591b409">Jon</a></td>
        <td><a href="http://ufcstats.com/fighter-details/07f72a2a7591b409">Jones</a></td>
      </tr>
    </tbody></table>"#;

  const FIGHTER: &str = r#"
    <h2 class="b-content__title">
      <span class="b-content__title-highlight"> Jon Jones </span>
      <span class="b-content__title-record"> Record: 27-1-0 (1 NC) </span>
    </h2>
    <p class="b-content__Nickname"> Bones </p>
    <div class="b-list__info-box b-list__info-box_style_small-width">
      <ul>
        <li class="b-list__box-list-item"><i>Height:</i> 6' 4" </li>
        <li class="b-list__box-list-item"><i>Reach:</i> 84" </li>
        <li class="b-list__box-list-item"><i>STANCE:</i> Orthodox </li>
        <li class="b-list__box-list-item"><i>DOB:</i> Jul 19, 1987 </li>
      </ul>
    </div>
    <div class="b-list__info-box b-list__info-box_style_middle-width">
      <ul>
        <li class="b-list__box-list-item"><i>SLpM:</i> 4.29 </li>
        <li class="b-list__box-list-item"><i>Str. Acc.:</i> 57% </li>
      </ul>
    </div>
    <table class="b-fight-details__table"><tbody>
      <tr class="b-fight-details__table-row">
        <td>win</td>
        <td><p>Jon Jones</p><p>Stipe Miocic</p></td>
        <td>0</td><td>0</td><td>0</td><td>0</td>
        <td><p>UFC 309: Jones vs. Miocic</p><p>Nov. 16, 2024</p></td>
        <td><p>KO/TKO</p><p>Spinning Back Kick</p></td>
        <td>3</td>
        <td>4:29</td>
      </tr>
    </tbody></table>"#;

  const EVENT: &str = r##"
    <span class="b-content__title-highlight"> UFC 309: Jones vs. Miocic </span>
    <ul>
      <li class="b-list__box-list-item"><i>Date:</i> November 16, 2024 </li>
      <li class="b-list__box-list-item"><i>Location:</i> New York City, New York, USA </li>
    </ul>
    <table><tbody class="b-fight-details__table-body">
      <tr class="b-fight-details__table-row">
        <td></td>
        <td><p><a class="b-link" href="#">Jon Jones</a></p><p><a class="b-link" href="#">Stipe Miocic</a></p></td>
        <td></td><td></td><td></td><td></td>
        <td> Heavyweight </td>
      </tr>
      <tr class="b-fight-details__table-row">
        <td></td>
        <td><p><a class="b-link" href="#">Charles Oliveira</a></p><p><a class="b-link" href="#">Michael Chandler</a></p></td>
      </tr>
      <tr class="b-fight-details__table-row"><td></td><td>TBA</td></tr>
    </tbody></table>"##;

  #[test]
  fn search_prefers_exact_full_name() {
    let url = find_fighter_url(SEARCH, "jon  jones", "http://ufcstats.com").unwrap();
    assert_eq!(url.as_deref(), Some("http://ufcstats.com/fighter-details/07f72a2a7591b409"));
    assert_eq!(find_fighter_url(SEARCH, "Khabib", "http://ufcstats.com").unwrap(), None);
  }

  #[test]
  fn fighter_page_payload() {
    let url = "http://ufcstats.com/fighter-details/07f72a2a7591b409";
    let p = parse_fighter_page(FIGHTER, url).unwrap();
    assert_eq!(p["name"], "Jon Jones");
    assert_eq!(p["nickname"], "Bones");
    assert_eq!(p["record"], "27-1-0 (1 NC)");
    assert_eq!(p["attributes"]["Height"], "6' 4\"");
    assert_eq!(p["attributes"]["Stance"], "Orthodox");
    assert_eq!(p["career_stats"]["SLpM"], "4.29");
    assert_eq!(p["fight_history"][0]["opponent"], "Stipe Miocic");
    assert_eq!(p["fight_history"][0]["method"], "KO/TKO");
    assert_eq!(p["fight_history"][0]["time"], "4:29");
    assert_eq!(Source::Stats.external_id(&p).as_deref(), Some("07f72a2a7591b409"));
  }

  #[test]
  fn event_page() {
    let event = parse_event_page(EVENT).unwrap().unwrap();
    assert_eq!(event.name, "UFC 309: Jones vs. Miocic");
    assert_eq!(event.date.as_deref(), Some("November 16, 2024"));
    assert_eq!(event.location.as_deref(), Some("New York City, New York, USA"));
    assert_eq!(event.fight_card.len(), 2);
    assert_eq!(event.fight_card[0].weight_class.as_deref(), Some("Heavyweight"));
    assert_eq!(event.fight_card[1].fighter_b, "Michael Chandler");
  }

  #[test]
  fn event_page_without_fights_is_none() {
    let html = r#"<span class="b-content__title-highlight">UFC 999</span>"#;
    assert!(parse_event_page(html).unwrap().is_none());
  }

  #[test]
  fn upcoming_listing() {
    let html = r#"
      <table class="b-statistics__table-events"><tbody>
        <tr class="b-statistics__table-row"><td></td></tr>
        <tr class="b-statistics__table-row">
          <td><a href="http://ufcstats.com/event-details/abc">UFC 310</a></td>
        </tr>
      </tbody></table>"#;
    assert_eq!(
      first_upcoming_url(html, "http://ufcstats.com").unwrap().as_deref(),
      Some("http://ufcstats.com/event-details/abc")
    );
  }
}
