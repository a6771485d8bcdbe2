//! ATP draw pages
//!
//! One `.draw-content` container per round, each listing `.stats-item`
//! player entries two per match:
//!
//! ```text
//! .draw-content
//!   .stats-item
//!     .player-info > .name (a = player, span = seed) [+ .winner]
//!     .scores > .score-item (span = games [, span = tiebreak]) ...
//! ```
//!
//! The page embeds a non-participant `<template>` copy of a round container
//! first; it is skipped by ancestry. The champion is read from the `.winner`
//! marker in the last round container.

use super::{has_alphabet, scan_sets, text_of, Extraction};
use crate::model::{SeedMap, Slot, SlotKey};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static ROUND: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".draw-content").unwrap());
static ENTRY: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".stats-item").unwrap());
static NAME: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".name").unwrap());
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static SEED: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span").unwrap());
static SCORE: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".score-item").unwrap());
static WINNER: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".winner").unwrap());

pub fn extract(html: &str, draw_id: &str) -> Extraction {
    let doc = Html::parse_document(html);

    let rounds: Vec<ElementRef> = doc
        .select(&ROUND)
        .filter(|rc| !in_template(rc))
        .collect();

    let Some(last) = rounds.last() else {
        return Extraction::default();
    };

    let mut slots = Vec::new();
    let mut seeds = SeedMap::new();

    for (i, container) in rounds.iter().enumerate() {
        let round = i as u32 + 1;
        slots.extend(scan_round(*container, round, draw_id, &mut seeds));
    }

    let (name, seed) = champion(*last).unwrap_or_default();
    let champion_key = SlotKey::new(rounds.len() as u32 + 1, 1);
    slots.push(Slot::new(draw_id, champion_key, &name, &seed));

    Extraction { slots, seeds }
}

fn scan_round(container: ElementRef, round: u32, draw_id: &str, seeds: &mut SeedMap) -> Vec<Slot> {
    container
        .select(&ENTRY)
        .enumerate()
        .map(|(i, entry)| {
            let (name, seed) = entry
                .select(&NAME)
                .next()
                .map(player_name)
                .unwrap_or_default();

            if !name.is_empty() {
                seeds.insert(name.clone(), seed.clone());
            }

            let mut slot = Slot::new(draw_id, SlotKey::new(round, i as u32 + 1), &name, &seed);
            slot.sets = scan_sets(entry.select(&SCORE));
            slot
        })
        .collect()
}

/// Name and seed from a `.name` element; blank for byes and placeholders
fn player_name(el: ElementRef) -> (String, String) {
    let name = el.select(&LINK).next().map(text_of).unwrap_or_default();
    if !has_alphabet(&name) {
        return (String::new(), String::new());
    }

    let seed = el.select(&SEED).next().map(text_of).unwrap_or_default();
    (name, seed)
}

/// Player marked as winner in the final's container, if decided
fn champion(container: ElementRef) -> Option<(String, String)> {
    let winner = container.select(&WINNER).next()?;

    winner
        .prev_siblings()
        .chain(winner.next_siblings())
        .filter_map(ElementRef::wrap)
        .find(|el| NAME.matches(el))
        .map(player_name)
}

fn in_template(el: &ElementRef) -> bool {
    el.ancestors()
        .any(|n| n.value().as_element().is_some_and(|e| e.name() == "template"))
}
