//! Bracket extraction from tournament-authority pages
//!
//! Each site renders its draw differently; the `atp` and `wta` modules
//! normalise their markup into one ordered slot sequence plus a seed map.

pub mod atp;
pub mod wta;

use crate::model::{SeedMap, Set, Slot, MAX_SETS};
use regex::Regex;
use scraper::ElementRef;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

static ALPHABET: LazyLock<Regex> = LazyLock::new(|| Regex::new("[a-zA-Z]").unwrap());

/// Site family a draw page belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    Atp,
    Wta,
}

impl Site {
    /// Determine the site family from a page URL (auto-detect by host)
    pub fn from_url(url: &str) -> Option<Site> {
        let parsed = url::Url::parse(url).ok()?;
        let host = parsed.host_str()?.trim_start_matches("www.");

        if host == "atptour.com" || host.ends_with(".atptour.com") {
            Some(Site::Atp)
        } else if host == "wtatennis.com" || host.ends_with(".wtatennis.com") {
            Some(Site::Wta)
        } else {
            None
        }
    }

    /// Selector the proxy must see rendered before it responds
    ///
    /// WTA fills in scores and winners client-side after the first HTML load.
    pub fn wait_for(self) -> Option<&'static str> {
        match self {
            Site::Atp => None,
            Site::Wta => Some(wta::SCORE_CELL),
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Site::Atp => write!(f, "atp"),
            Site::Wta => write!(f, "wta"),
        }
    }
}

/// Result of extracting one draw page
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Sorted by `(round, position)`, keys unique
    pub slots: Vec<Slot>,
    pub seeds: SeedMap,
}

/// Serializable view with a stable seed ordering
#[derive(Debug, Serialize)]
pub struct ExtractionReport<'a> {
    pub site: Site,
    pub expected: usize,
    pub scraped: usize,
    pub complete: bool,
    pub seeds: BTreeMap<&'a str, &'a str>,
    pub slots: &'a [Slot],
}

impl Extraction {
    pub fn report(&self, site: Site, expected: usize) -> ExtractionReport<'_> {
        ExtractionReport {
            site,
            expected,
            scraped: self.slots.len(),
            complete: self.slots.len() == expected,
            seeds: self
                .seeds
                .iter()
                .map(|(name, seed)| (name.as_str(), seed.as_str()))
                .collect(),
            slots: &self.slots,
        }
    }
}

/// Extract a draw page with the extractor for its site
pub fn extract(site: Site, html: &str, draw_id: &str) -> Extraction {
    match site {
        Site::Atp => atp::extract(html, draw_id),
        Site::Wta => wta::extract(html, draw_id),
    }
}

pub(crate) fn has_alphabet(s: &str) -> bool {
    ALPHABET.is_match(s)
}

/// Concatenated, trimmed text of an element
pub(crate) fn text_of(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Parse a games or tiebreak token; placeholders such as "-" yield None
fn parse_score(token: &str) -> Option<u32> {
    let token = token.trim();
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Non-empty text tokens of a score cell, in document order
fn score_tokens<'a>(cell: ElementRef<'a>) -> Vec<&'a str> {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect()
}

/// Scan a row's score cells into sets, stopping at the first blank cell
///
/// Sets always form a prefix: a placeholder in set N means sets N.. are absent.
pub(crate) fn scan_sets<'a>(cells: impl Iterator<Item = ElementRef<'a>>) -> Vec<Set> {
    let mut sets = Vec::new();

    for (i, cell) in cells.take(MAX_SETS).enumerate() {
        let tokens = score_tokens(cell);
        let Some(games) = tokens.first().and_then(|t| parse_score(t)) else {
            break;
        };
        let tiebreak = tokens.get(1).and_then(|t| parse_score(t)).unwrap_or(0);
        sets.push(Set::new(i as u32 + 1, games, tiebreak));
    }

    sets
}
