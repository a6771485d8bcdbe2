//! Diff scraped bracket state against persisted state
//!
//! Produces the create/update operations needed to bring storage in line with
//! a fresh scrape. Nothing is ever deleted, and a blank scraped name never
//! overwrites a known one: blank means "no information", not "clear".

use crate::model::{SeedMap, Set, Slot, SlotKey};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// A set to create, tied to the slot that owns it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSet {
    /// Owning slot, used to resolve `set.slot_id` when the slot is also new
    pub slot: SlotKey,
    pub set: Set,
}

/// Operations computed for one draw
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub new_slots: Vec<Slot>,
    pub updated_slots: Vec<Slot>,
    pub new_sets: Vec<NewSet>,
    pub updated_sets: Vec<Set>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.new_slots.is_empty()
            && self.updated_slots.is_empty()
            && self.new_sets.is_empty()
            && self.updated_sets.is_empty()
    }
}

/// Compute the change-set taking `persisted` to `scraped`
///
/// Output is ordered by `(round, position)`; keys only present in `persisted`
/// are left untouched.
pub fn reconcile(scraped: &[Slot], persisted: &[Slot], seeds: &SeedMap) -> ChangeSet {
    let scraped_by_key: HashMap<SlotKey, &Slot> = scraped.iter().map(|s| (s.key(), s)).collect();
    let persisted_by_key: HashMap<SlotKey, &Slot> =
        persisted.iter().map(|s| (s.key(), s)).collect();

    let keys: BTreeSet<SlotKey> = scraped_by_key
        .keys()
        .chain(persisted_by_key.keys())
        .copied()
        .collect();

    let mut changes = ChangeSet::default();

    for key in keys {
        match (scraped_by_key.get(&key), persisted_by_key.get(&key)) {
            (Some(fresh), None) => add_slot(&mut changes, fresh),
            (Some(fresh), Some(current)) => merge_slot(&mut changes, fresh, current, seeds),
            // Positions that vanished from the page are never deleted
            (None, _) => {}
        }
    }

    changes
}

fn add_slot(changes: &mut ChangeSet, fresh: &Slot) {
    changes.new_slots.push(fresh.clone());
    changes
        .new_sets
        .extend(fresh.sets.iter().map(|set| NewSet {
            slot: fresh.key(),
            set: Set::new(set.number, set.games, set.tiebreak),
        }));
}

fn merge_slot(changes: &mut ChangeSet, fresh: &Slot, current: &Slot, seeds: &SeedMap) {
    // Scraper failure or unplayed match: keep whatever is stored
    if fresh.is_blank() {
        return;
    }

    merge_sets(changes, fresh, current);

    let seed = seeds.get(&fresh.name).map(String::as_str).unwrap_or("");
    if fresh.name == current.name && seed == current.seed {
        return;
    }

    changes.updated_slots.push(Slot {
        id: current.id.clone(),
        draw_id: current.draw_id.clone(),
        round: current.round,
        position: current.position,
        name: fresh.name.clone(),
        seed: seed.to_string(),
        sets: fresh.sets.clone(),
    });
}

/// Align scraped sets with stored ones by index
fn merge_sets(changes: &mut ChangeSet, fresh: &Slot, current: &Slot) {
    for (j, scraped) in fresh.sets.iter().enumerate() {
        let Some(stored) = current.sets.get(j) else {
            changes.new_sets.push(NewSet {
                slot: current.key(),
                set: Set {
                    slot_id: current.id.clone(),
                    ..Set::new(scraped.number, scraped.games, scraped.tiebreak)
                },
            });
            continue;
        };

        if stored.number != scraped.number {
            warn!(
                set_id = %stored.id,
                slot = %current.key(),
                stored = stored.number,
                scraped = scraped.number,
                "set numbers don't match, skipping"
            );
            continue;
        }

        if stored.games != scraped.games || stored.tiebreak != scraped.tiebreak {
            changes.updated_sets.push(Set {
                id: stored.id.clone(),
                slot_id: current.id.clone(),
                number: scraped.number,
                games: scraped.games,
                tiebreak: scraped.tiebreak,
            });
        }
    }
}
