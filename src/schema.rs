//! Backend record schema
//!
//! Wire shapes of the PocketBase collections the store talks to.

use crate::model::{Set, Slot, MAX_SETS};
use serde::{Deserialize, Serialize};

/// Body of `auth-with-password`
#[derive(Debug, Serialize)]
pub struct AuthRequest<'a> {
    pub identity: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: String,
}

/// One page of a record listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub total_items: i64,
    pub items: Vec<T>,
}

/// Row of the `slots_with_scores` view: a slot joined with up to five sets
///
/// Text columns are nullable in the view, so they decode as `Option`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotRecord {
    pub id: String,
    pub draw_id: String,
    pub round: u32,
    pub position: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub seed: Option<String>,
    #[serde(default)]
    pub set1_id: Option<String>,
    pub set1_games: Option<u32>,
    pub set1_tiebreak: Option<u32>,
    #[serde(default)]
    pub set2_id: Option<String>,
    pub set2_games: Option<u32>,
    pub set2_tiebreak: Option<u32>,
    #[serde(default)]
    pub set3_id: Option<String>,
    pub set3_games: Option<u32>,
    pub set3_tiebreak: Option<u32>,
    #[serde(default)]
    pub set4_id: Option<String>,
    pub set4_games: Option<u32>,
    pub set4_tiebreak: Option<u32>,
    #[serde(default)]
    pub set5_id: Option<String>,
    pub set5_games: Option<u32>,
    pub set5_tiebreak: Option<u32>,
}

/// `(id, games, tiebreak)` columns of one set
type SetColumns<'a> = (&'a str, Option<u32>, Option<u32>);

impl SlotRecord {
    fn set_columns(&self) -> [SetColumns<'_>; MAX_SETS] {
        [
            (self.set1_id.as_deref().unwrap_or(""), self.set1_games, self.set1_tiebreak),
            (self.set2_id.as_deref().unwrap_or(""), self.set2_games, self.set2_tiebreak),
            (self.set3_id.as_deref().unwrap_or(""), self.set3_games, self.set3_tiebreak),
            (self.set4_id.as_deref().unwrap_or(""), self.set4_games, self.set4_tiebreak),
            (self.set5_id.as_deref().unwrap_or(""), self.set5_games, self.set5_tiebreak),
        ]
    }

    /// Convert into a slot; sets end at the first column without games
    pub fn into_slot(self) -> Slot {
        let mut sets = Vec::new();
        for (i, (id, games, tiebreak)) in self.set_columns().into_iter().enumerate() {
            let Some(games) = games else {
                break;
            };
            sets.push(Set {
                id: id.to_string(),
                slot_id: self.id.clone(),
                number: i as u32 + 1,
                games,
                tiebreak: tiebreak.unwrap_or(0),
            });
        }

        Slot {
            id: self.id,
            draw_id: self.draw_id,
            round: self.round,
            position: self.position,
            name: self.name.unwrap_or_default(),
            seed: self.seed.unwrap_or_default(),
            sets,
        }
    }
}

/// Create/update body for `draw_slot`
#[derive(Debug, Serialize)]
pub struct SlotBody<'a> {
    pub draw_id: &'a str,
    pub round: u32,
    pub position: u32,
    pub name: &'a str,
    pub seed: &'a str,
}

impl<'a> From<&'a Slot> for SlotBody<'a> {
    fn from(slot: &'a Slot) -> Self {
        Self {
            draw_id: &slot.draw_id,
            round: slot.round,
            position: slot.position,
            name: &slot.name,
            seed: &slot.seed,
        }
    }
}

/// Create/update body for `set_score`
#[derive(Debug, Serialize)]
pub struct SetBody<'a> {
    pub draw_slot_id: &'a str,
    pub number: u32,
    pub games: u32,
    pub tiebreak: u32,
}

impl<'a> From<&'a Set> for SetBody<'a> {
    fn from(set: &'a Set) -> Self {
        Self {
            draw_slot_id: &set.slot_id,
            number: set.number,
            games: set.games,
            tiebreak: set.tiebreak,
        }
    }
}

/// Any created record; only the id matters
#[derive(Debug, Deserialize)]
pub struct CreatedRecord {
    pub id: String,
}
