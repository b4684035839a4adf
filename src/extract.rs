//! Source-independent helpers shared by the site scrapers: selector
//! plumbing, feature-list parsing, field normalisation.

use crate::error::ScrapeError;
use anyhow::{Context, Result};
use chrono::Local;
use indexmap::IndexMap;
use scraper::{ElementRef, Html, Selector};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Label of the feature that is superseded by the dedicated description section
const DESCRIPTION_FEATURE: &str = "Description";

pub fn selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::InvalidSelector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// All descendant text, trimmed
pub fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text carried by the element's own text nodes, ignoring child elements
pub fn direct_text(element: ElementRef) -> Option<String> {
    let text: String = element
        .children()
        .filter_map(|node| node.value().as_text())
        .map(|text| &**text)
        .collect();

    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

pub fn first_element<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = selector(css).ok()?;
    document.select(&selector).next()
}

/// Like `first_element`, but absence is a structural error
pub fn require_element<'a>(document: &'a Html, css: &str) -> Result<ElementRef<'a>, ScrapeError> {
    let selector = selector(css)?;
    document
        .select(&selector)
        .next()
        .ok_or_else(|| ScrapeError::MissingElement {
            selector: css.to_string(),
        })
}

/// `href` of a required link; a link without a target counts as missing
pub fn require_href(document: &Html, css: &str) -> Result<String, ScrapeError> {
    let link = require_element(document, css)?;
    link.value()
        .attr("href")
        .map(|href| href.to_string())
        .ok_or_else(|| ScrapeError::MissingElement {
            selector: format!("{}[href]", css),
        })
}

/// Turns a `MissingElement` failure into `None`; other errors still propagate
pub fn absent_if_missing<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if matches!(e.downcast_ref::<ScrapeError>(), Some(ScrapeError::MissingElement { .. })) => {
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

pub fn first_text(document: &Html, css: &str) -> Option<String> {
    first_element(document, css)
        .map(element_text)
        .filter(|text| !text.is_empty())
}

pub fn first_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    first_element(document, css)
        .and_then(|el| el.value().attr(attr))
        .map(|value| value.to_string())
}

/// Link target of every title element, in document order.
///
/// A title element is either the link itself or a heading wrapping it.
/// Duplicates are kept.
pub fn link_targets(document: &Html, title_css: &str) -> Result<Vec<String>> {
    let title_selector = selector(title_css)?;
    let link_selector = selector("a[href]")?;

    let mut urls = Vec::new();
    for (index, title) in document.select(&title_selector).enumerate() {
        let href = if title.value().name() == "a" {
            title.value().attr("href")
        } else {
            title
                .select(&link_selector)
                .next()
                .and_then(|link| link.value().attr("href"))
        };

        match href {
            Some(href) => urls.push(href.trim().to_string()),
            None => tracing::debug!("Title #{} has no link, skipping", index + 1),
        }
    }

    Ok(urls)
}

/// Highest numeric label among the pagination controls.
///
/// Labels can skip numbers ("1 2 … 5") and include "Next", so this is the
/// maximum label rather than a count of elements.
pub fn max_page_number(document: &Html, label_css: &str) -> Result<u32, ScrapeError> {
    let selector = selector(label_css)?;

    document
        .select(&selector)
        .filter_map(|label| element_text(label).parse::<u32>().ok())
        .max()
        .ok_or_else(|| ScrapeError::NoPageNumbers {
            selector: label_css.to_string(),
        })
}

/// Search URL without its query string or trailing slash
pub fn search_base(search_url: &str) -> &str {
    let without_query = search_url.split('?').next().unwrap_or(search_url);
    without_query.trim_end_matches('/')
}

/// Prefix site-relative URLs with `base_url`; absolute URLs pass through
pub fn absolute_url(base_url: &str, url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');

    if url.starts_with(base_url) || url.starts_with("https://") || url.starts_with("http://") {
        url.to_string()
    } else if url.starts_with('/') {
        format!("{}{}", base_url, url)
    } else {
        format!("{}/{}", base_url, url)
    }
}

/// Drop a fixed leading phrase and a fixed trailing phrase from a title
pub fn strip_title(title: &str, prefix: &str, suffix: &str) -> String {
    let title = title.trim();
    let title = title.strip_prefix(prefix).unwrap_or(title);
    let title = if suffix.is_empty() {
        title
    } else {
        title.strip_suffix(suffix).unwrap_or(title)
    };
    title.trim().to_string()
}

pub fn scraped_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Postal code from the page's JSON-LD metadata block.
///
/// `None` when there is no block or it carries no address; a block that is
/// not valid JSON is an error.
pub fn postal_code_from_json_ld(document: &Html) -> Result<Option<String>> {
    let Some(script) = first_element(document, r#"script[type="application/ld+json"]"#) else {
        return Ok(None);
    };

    let raw: String = script.text().collect();
    let data: serde_json::Value =
        serde_json::from_str(raw.trim()).context("Malformed JSON-LD block")?;

    Ok(data
        .get("address")
        .and_then(|address| address.get("postalCode"))
        .and_then(|code| code.as_str())
        .map(|code| code.to_string()))
}

/// Where the feature lists of a listing page live
#[derive(Debug, Clone, Copy)]
pub struct FeatureSelectors {
    /// Every feature-list container (a `<dl>`)
    pub list: &'static str,
    /// Label elements inside a container
    pub term: &'static str,
    /// Value element nested in the label's sibling, used when the sibling
    /// carries no text of its own
    pub nested_value: &'static str,
}

/// Parse all feature lists into snake_case name → value.
///
/// A label recurring within one listing has its values joined with `", "`
/// in encounter order. Labels without a usable value are skipped, and the
/// `Description` feature is dropped.
pub fn parse_features(document: &Html, selectors: &FeatureSelectors) -> Result<IndexMap<String, String>> {
    let list_selector = selector(selectors.list)?;
    let term_selector = selector(selectors.term)?;
    let nested_selector = selector(selectors.nested_value)?;

    let mut features: IndexMap<String, String> = IndexMap::new();

    for list in document.select(&list_selector) {
        for term in list.select(&term_selector) {
            let name = convert_to_snake_case(&element_text(term));
            if name.is_empty() {
                continue;
            }

            let Some(value) = feature_value(term, &nested_selector) else {
                tracing::trace!("Feature '{}' has no value, skipping", name);
                continue;
            };

            features
                .entry(name)
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }
    }

    features.shift_remove(&convert_to_snake_case(DESCRIPTION_FEATURE));
    Ok(features)
}

fn feature_value(term: ElementRef, nested: &Selector) -> Option<String> {
    let value_item = term.next_siblings().find_map(ElementRef::wrap)?;

    direct_text(value_item).or_else(|| {
        value_item
            .select(nested)
            .next()
            .map(element_text)
            .filter(|text| !text.is_empty())
    })
}

/// Normalise a label to snake_case.
///
/// Runs of whitespace and `-` become one `_`; existing underscores are kept
/// as they are. Words also split on lower→upper case changes, the end of an
/// acronym ("HTTPServer" → "http_server") and digit→upper transitions
/// ("1234String" → "1234_string"). Other symbols are kept, so snake_case
/// input comes back unchanged.
pub fn convert_to_snake_case(input: &str) -> String {
    let chars: Vec<char> = input.trim().chars().collect();
    let mut snake = String::with_capacity(chars.len() + 4);
    let mut separate = false;

    for (i, &c) in chars.iter().enumerate() {
        if c.is_whitespace() || c == '-' {
            separate = true;
            continue;
        }

        if c == '_' {
            snake.push('_');
            separate = false;
            continue;
        }

        if !separate && i > 0 {
            separate = is_word_boundary(chars[i - 1], c, chars.get(i + 1).copied());
        }

        if separate && !snake.is_empty() && !snake.ends_with('_') {
            snake.push('_');
        }
        separate = false;
        snake.extend(c.to_lowercase());
    }

    snake
}

fn is_word_boundary(prev: char, current: char, next: Option<char>) -> bool {
    (prev.is_lowercase() && current.is_uppercase())
        || (prev.is_ascii_digit() && current.is_uppercase())
        || (prev.is_uppercase() && current.is_uppercase() && next.is_some_and(char::is_lowercase))
}
