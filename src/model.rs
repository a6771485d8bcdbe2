//! Canonical bracket model: draws, slots, set scores
//!
//! Every extractor produces these types and the reconciler consumes them.
//! A slot is identified at scrape time by its `(round, position)` key since
//! scraped data has no persisted id.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Most sets a single match can have
pub const MAX_SETS: usize = 5;

/// `name -> seed` lookup collected while extracting one draw
pub type SeedMap = HashMap<String, String>;

/// Natural key of a slot within one draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub round: u32,
    pub position: u32,
}

impl SlotKey {
    pub fn new(round: u32, position: u32) -> Self {
        Self { round, position }
    }

    /// Slot the winner of this slot's match advances into
    pub fn advance(self) -> Self {
        Self {
            round: self.round + 1,
            position: self.position.div_ceil(2),
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}P{}", self.round, self.position)
    }
}

/// One set's score within a slot's match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Set {
    /// Empty until persisted
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Owning slot id, empty while the slot itself is not persisted
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub slot_id: String,
    pub number: u32,
    pub games: u32,
    /// 0 when no tiebreak was played
    pub tiebreak: u32,
}

impl Set {
    pub fn new(number: u32, games: u32, tiebreak: u32) -> Self {
        Self {
            number,
            games,
            tiebreak,
            ..Default::default()
        }
    }
}

/// One bracket position in one round of one draw
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Empty for slots that have not been created yet
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub draw_id: String,
    pub round: u32,
    pub position: u32,
    /// Empty means unknown or not yet played
    pub name: String,
    /// Display string such as "(3)", empty when unseeded or unknown
    pub seed: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sets: Vec<Set>,
}

impl Slot {
    pub fn new(draw_id: &str, key: SlotKey, name: &str, seed: &str) -> Self {
        Self {
            draw_id: draw_id.to_string(),
            round: key.round,
            position: key.position,
            name: name.to_string(),
            seed: seed.to_string(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> SlotKey {
        SlotKey::new(self.round, self.position)
    }

    pub fn is_blank(&self) -> bool {
        self.name.is_empty()
    }
}

/// A draw as listed by the persistence backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draw {
    pub id: String,
    pub name: String,
    pub event: String,
    pub year: i32,
    pub url: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub prediction_close: String,
    /// Number of round-1 slots
    pub size: u32,
}

impl Draw {
    /// Slots a complete scrape must contain: every round halves, plus the champion slot
    pub fn expected_slots(&self) -> usize {
        expected_slot_count(self.size)
    }
}

impl fmt::Display for Draw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} ({})", self.name, self.year, self.event, self.id)
    }
}

pub fn expected_slot_count(draw_size: u32) -> usize {
    (2 * draw_size as usize).saturating_sub(1)
}

/// Order slots by `(round, position)`
pub fn sort_slots(slots: &mut [Slot]) {
    slots.sort_by_key(Slot::key);
}
