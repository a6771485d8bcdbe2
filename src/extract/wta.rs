//! WTA draw pages
//!
//! Rounds are nested round container -> match table -> rows, one row per
//! player. The page never repeats a winner into the next round by itself:
//! the `is-winner` row marker and the score cells are the only reliable
//! signal, so winners are pushed forward into `(round + 1, ceil(position / 2))`
//! while scanning and later rows merge into those pre-created slots.

use super::{has_alphabet, scan_sets, text_of, Extraction};
use crate::model::{sort_slots, SeedMap, Slot, SlotKey};
use scraper::{ElementRef, Html, Selector};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Score cell selector, also what the proxy waits for before responding
pub const SCORE_CELL: &str = ".match-table__score-cell";

const WINNER_CLASS: &str = "is-winner";

static ROUND: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#".tournament-draw__tab[data-ui-tab="Singles"] .tournament-draw__round-container"#)
        .unwrap()
});
static MATCH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".tournament-draw__match-table").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tbody > tr").unwrap());
static FIRST_NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".match-table__player-fname").unwrap());
static LAST_NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".match-table__player-lname").unwrap());
static SEED: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".match-table__player-seed").unwrap());
static SCORE: LazyLock<Selector> = LazyLock::new(|| Selector::parse(SCORE_CELL).unwrap());

/// Slots under construction, keyed by position rather than appended
struct Bracket<'d> {
    draw_id: &'d str,
    slots: HashMap<SlotKey, Slot>,
    seeds: SeedMap,
}

impl<'d> Bracket<'d> {
    fn new(draw_id: &'d str) -> Self {
        Self {
            draw_id,
            slots: HashMap::new(),
            seeds: SeedMap::new(),
        }
    }

    /// Record a scanned row and return the player now holding that slot
    ///
    /// A slot pre-created by an earlier winner only takes the row's sets.
    fn add_row(&mut self, key: SlotKey, row: ElementRef) -> (String, String) {
        let (name, seed) = player_name(row);
        let sets = scan_sets(row.select(&SCORE));

        if !name.is_empty() {
            self.seeds.insert(name.clone(), seed.clone());
        }

        let slot = match self.slots.entry(key) {
            Entry::Occupied(e) => {
                let slot = e.into_mut();
                slot.sets = sets;
                slot
            }
            Entry::Vacant(e) => e.insert(Slot {
                sets,
                ..Slot::new(self.draw_id, key, &name, &seed)
            }),
        };

        (slot.name.clone(), slot.seed.clone())
    }

    /// Carry a match winner into the slot they advance to
    fn advance(&mut self, from: SlotKey, name: &str, seed: &str) {
        let to = from.advance();
        let slot = self.placeholder(to);
        slot.name = name.to_string();
        slot.seed = seed.to_string();
    }

    fn placeholder(&mut self, key: SlotKey) -> &mut Slot {
        let draw_id = self.draw_id;
        self.slots
            .entry(key)
            .or_insert_with(|| Slot::new(draw_id, key, "", ""))
    }

    fn finish(self) -> Extraction {
        let mut slots: Vec<Slot> = self.slots.into_values().collect();
        sort_slots(&mut slots);
        Extraction {
            slots,
            seeds: self.seeds,
        }
    }
}

pub fn extract(html: &str, draw_id: &str) -> Extraction {
    let doc = Html::parse_document(html);
    let rounds: Vec<ElementRef> = doc.select(&ROUND).collect();
    let mut bracket = Bracket::new(draw_id);

    for (i, container) in rounds.iter().enumerate() {
        let round = i as u32 + 1;
        let mut position = 0;

        for table in container.select(&MATCH) {
            for row in table.select(&ROW) {
                position += 1;
                let key = SlotKey::new(round, position);
                let (name, seed) = bracket.add_row(key, row);

                if is_winner(row) {
                    bracket.advance(key, &name, &seed);
                }
            }
        }

        if i + 1 == rounds.len() {
            bracket.placeholder(SlotKey::new(round + 1, 1));
        }
    }

    bracket.finish()
}

fn is_winner(row: ElementRef) -> bool {
    row.value().classes().any(|c| c == WINNER_CLASS)
}

/// Full name and seed of a row, blank when the row has no real player
fn player_name(row: ElementRef) -> (String, String) {
    let first = row
        .select(&FIRST_NAME)
        .next()
        .map(text_of)
        .unwrap_or_default()
        .replace('.', "");
    let last = row.select(&LAST_NAME).next().map(text_of).unwrap_or_default();
    let name = format!("{} {}", first, last).trim().to_string();

    if !has_alphabet(&name) {
        return (String::new(), String::new());
    }

    let seed = row.select(&SEED).next().map(text_of).unwrap_or_default();
    (name, seed)
}
