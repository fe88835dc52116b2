//! Small helpers over `scraper` shared by the HTML sources.

use octagon_core::{SourceError, fighter::normalize_name};
use scraper::{ElementRef, Selector};

pub fn sel(css: &'static str) -> Result<Selector, SourceError> {
  Selector::parse(css).map_err(|e| SourceError::Parse(format!("selector {css:?}: {e:?}")))
}

/// Element text with whitespace collapsed.
pub fn text_of(el: ElementRef<'_>) -> String {
  normalize_name(&el.text().collect::<Vec<_>>().join(" "))
}

/// Text of the first match of `selector` under `el`, if any and non-empty.
pub fn first_text(el: ElementRef<'_>, selector: &Selector) -> Option<String> {
  el.select(selector).next().map(text_of).filter(|t| !t.is_empty())
}

/// Split `Label: value` into a canonical label and the value.
pub fn label_value(text: &str) -> Option<(String, String)> {
  let (label, value) = text.split_once(':')?;
  let label = canonical_label(label);
  (!label.is_empty()).then(|| (label, value.trim().to_owned()))
}

/// `STANCE` and `HEIGHT` become `Stance` and `Height`; mixed-case and short
/// labels (`DOB`, `SLpM`, `Str. Acc.`) are kept.
pub fn canonical_label(raw: &str) -> String {
  let label = normalize_name(raw.trim().trim_end_matches(':'));
  let shouting = label.len() > 3
    && label.chars().any(|c| c.is_alphabetic())
    && !label.chars().any(|c| c.is_lowercase());
  if !shouting {
    return label;
  }
  label
    .split(' ')
    .map(|word| {
      let mut chars = word.chars();
      match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
      }
    })
    .collect::<Vec<_>>()
    .join(" ")
}

/// Resolve a possibly relative `href` against `base`.
pub fn absolute_url(base: &str, href: &str) -> String {
  if href.starts_with("http://") || href.starts_with("https://") {
    href.to_owned()
  } else {
    format!("{}/{}", base.trim_end_matches('/'), href.trim_start_matches('/'))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn labels() {
    assert_eq!(canonical_label("STANCE:"), "Stance");
    assert_eq!(canonical_label("BIRTH DATE"), "Birth Date");
    assert_eq!(canonical_label("DOB"), "DOB");
    assert_eq!(canonical_label("Str. Acc."), "Str. Acc.");
    assert_eq!(
      label_value("Reach:  84\""),
      Some(("Reach".to_owned(), "84\"".to_owned()))
    );
    assert_eq!(label_value("no colon"), None);
  }

  #[test]
  fn urls() {
    assert_eq!(
      absolute_url("https://www.sherdog.com/", "/fighter/Jon-Jones-27944"),
      "https://www.sherdog.com/fighter/Jon-Jones-27944"
    );
    assert_eq!(absolute_url("http://a", "http://b/c"), "http://b/c");
  }
}
