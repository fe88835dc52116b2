//! Odds attachment: look each card pair up in the odds-market payload.

use octagon_core::{
  event::{FightPair, name_key},
  odds::{FightOdds, MatchupOdds, OddsEvent},
  source::{OddsFeed, Sources},
  store::FightStore,
};

use crate::Pipeline;

/// Price both sides of `pair` from the first market whose outcomes name
/// both fighters exactly (case-insensitive, whitespace-normalised).
fn find_odds(pair: &FightPair, events: &[OddsEvent]) -> Option<FightOdds> {
  let (a, b) = (name_key(&pair.fighter_a), name_key(&pair.fighter_b));
  events
    .iter()
    .flat_map(|e| &e.bookmakers)
    .flat_map(|bookmaker| bookmaker.markets.iter().map(move |m| (bookmaker, m)))
    .find_map(|(bookmaker, market)| {
      let price = |key: &str| {
        market
          .outcomes
          .iter()
          .find(|o| name_key(&o.name) == key)
          .map(|o| o.price)
      };
      Some(FightOdds {
        price_a:   price(a.as_str())?,
        price_b:   price(b.as_str())?,
        bookmaker: bookmaker.title.clone(),
      })
    })
}

/// One entry per pair, in card order.
pub fn match_odds(card: &[FightPair], events: &[OddsEvent]) -> Vec<MatchupOdds> {
  card
    .iter()
    .map(|pair| MatchupOdds {
      fighter_a: pair.fighter_a.clone(),
      fighter_b: pair.fighter_b.clone(),
      odds:      find_odds(pair, events),
    })
    .collect()
}

impl<S: FightStore, X: Sources> Pipeline<S, X> {
  /// Fetch the odds payload once and attach prices to every pair. If the
  /// payload cannot be fetched every pair gets `odds: None`.
  pub async fn attach_odds(&self, card: &[FightPair]) -> Vec<MatchupOdds> {
    let events = match self.sources.odds().upcoming().await {
      Ok(events) => events,
      Err(e) => {
        tracing::warn!(error = %e, "odds unavailable");
        Vec::new()
      }
    };
    match_odds(card, &events)
  }
}

#[cfg(test)]
mod tests {
  use octagon_core::odds::{Bookmaker, Market, Outcome};

  use super::*;

  fn event(book: &str, outcomes: &[(&str, f64)]) -> OddsEvent {
    OddsEvent {
      id:            String::new(),
      sport_title:   "MMA".into(),
      commence_time: "2025-11-16T03:00:00Z".into(),
      home_team:     None,
      away_team:     None,
      bookmakers:    vec![Bookmaker {
        key:     book.to_lowercase(),
        title:   book.into(),
        markets: vec![Market {
          key:      "h2h".into(),
          outcomes: outcomes
            .iter()
            .map(|(name, price)| Outcome { name: (*name).into(), price: *price })
            .collect(),
        }],
      }],
    }
  }

  #[test]
  fn outcomes_must_name_both_fighters() {
    let events = vec![event("Book", &[("A", -200.0), ("C", 170.0)])];
    let odds = match_odds(&[FightPair::new("A", "B")], &events);
    assert_eq!(odds.len(), 1);
    assert_eq!(odds[0].odds, None);
  }

  #[test]
  fn first_matching_market_wins_and_order_follows_the_pair() {
    let events = vec![
      event("Other", &[("Jon Jones", -600.0), ("Tom Aspinall", 400.0)]),
      event("DraftKings", &[("stipe miocic", 425.0), ("JON  JONES", -600.0)]),
      event("FanDuel", &[("Jon Jones", -550.0), ("Stipe Miocic", 400.0)]),
    ];
    let card = [
      FightPair::new("Jon Jones", "Stipe Miocic"),
      FightPair::new("Bones", "Stipe Miocic"),
    ];
    let odds = match_odds(&card, &events);

    assert_eq!(odds[0].odds, Some(FightOdds {
      price_a:   -600.0,
      price_b:   425.0,
      bookmaker: "DraftKings".into(),
    }));
    // No fuzzy matching on nicknames.
    assert_eq!(odds[1].odds, None);
  }
}
