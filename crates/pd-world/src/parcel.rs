//! Parcel beliefs.
//!
//! # Lifecycle
//!
//! A parcel enters the book on first sensing or when the teammate gossips it.
//! It leaves when its score decays below 1, or when it is absent from a
//! sensing update although its tile lies inside the observed radius (someone
//! else picked it up).  Scores only ever go down: a gossiped copy can lower a
//! known score but never raise it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use pd_core::{AgentId, ParcelId, Position};

/// A parcel as sensed or gossiped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    pub id:         ParcelId,
    pub position:   Position,
    pub score:      u32,
    pub carried_by: Option<AgentId>,
}

impl Parcel {
    pub fn new(id: ParcelId, position: Position, score: u32) -> Self {
        Self { id, position, score, carried_by: None }
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.carried_by.is_none()
    }
}

/// Every parcel the agent currently believes in, keyed by id.
///
/// A `BTreeMap` keeps iteration order stable so utility ties resolve the same
/// way on every tick.
#[derive(Clone, Debug, Default)]
pub struct ParcelBook {
    parcels: BTreeMap<ParcelId, Parcel>,
}

impl ParcelBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ParcelId) -> Option<&Parcel> {
        self.parcels.get(&id)
    }

    pub fn contains(&self, id: ParcelId) -> bool {
        self.parcels.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parcel> {
        self.parcels.values()
    }

    pub fn len(&self) -> usize {
        self.parcels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parcels.is_empty()
    }

    /// Free parcels, i.e. not carried by anyone.
    pub fn free(&self) -> impl Iterator<Item = &Parcel> {
        self.parcels.values().filter(|p| p.is_free())
    }

    /// The free parcel lying on `pos`, if any.
    pub fn free_at(&self, pos: Position) -> Option<&Parcel> {
        self.free().find(|p| p.position == pos)
    }

    /// Parcels carried by `agent`.
    pub fn carried_by(&self, agent: AgentId) -> impl Iterator<Item = &Parcel> {
        self.parcels
            .values()
            .filter(move |p| p.carried_by == Some(agent))
    }

    // ── Updates ───────────────────────────────────────────────────────────

    /// Apply one sensing update taken from `me` with sensing `radius`.
    ///
    /// Sensed parcels are inserted or overwritten.  Free parcels that should
    /// have been sensed (inside the radius) but were not are removed.
    pub fn observe(&mut self, sensed: &[Parcel], me: Position, radius: u32) {
        for parcel in sensed {
            self.parcels.insert(parcel.id, parcel.clone());
        }
        self.parcels.retain(|id, p| {
            let expected_in_view = p.is_free() && me.manhattan(p.position) <= radius;
            !expected_in_view || sensed.iter().any(|s| s.id == *id)
        });
    }

    /// Merge parcels gossiped by the teammate.  Unknown parcels are added;
    /// known ones keep the lower score.
    pub fn merge(&mut self, gossiped: &[Parcel]) {
        for parcel in gossiped {
            match self.parcels.get_mut(&parcel.id) {
                Some(known) => {
                    if parcel.score < known.score {
                        known.score = parcel.score;
                    }
                }
                None => {
                    self.parcels.insert(parcel.id, parcel.clone());
                }
            }
        }
    }

    /// Subtract `intervals` decay points from every parcel and drop those
    /// whose score falls below 1.  Returns the ids that were dropped.
    pub fn decay(&mut self, intervals: u32) -> Vec<ParcelId> {
        if intervals == 0 {
            return Vec::new();
        }
        let mut expired = Vec::new();
        self.parcels.retain(|id, p| {
            p.score = p.score.saturating_sub(intervals);
            if p.score < 1 {
                expired.push(*id);
                false
            } else {
                true
            }
        });
        expired
    }

    /// Record that `agent` picked up `ids`.
    pub fn mark_carried(&mut self, ids: &[ParcelId], agent: AgentId) {
        for id in ids {
            if let Some(p) = self.parcels.get_mut(id) {
                p.carried_by = Some(agent);
            }
        }
    }

    /// Record that `ids` were put down on `pos`.  Parcels put down on a
    /// delivery tile are scored and disappear.
    pub fn mark_dropped(&mut self, ids: &[ParcelId], pos: Position, delivered: bool) {
        for id in ids {
            if delivered {
                self.parcels.remove(id);
            } else if let Some(p) = self.parcels.get_mut(id) {
                p.carried_by = None;
                p.position = pos;
            }
        }
    }

    /// Move every parcel carried by `agent` to `pos`.
    pub fn move_carried(&mut self, agent: AgentId, pos: Position) {
        for p in self.parcels.values_mut() {
            if p.carried_by == Some(agent) {
                p.position = pos;
            }
        }
    }

    pub fn remove(&mut self, id: ParcelId) -> Option<Parcel> {
        self.parcels.remove(&id)
    }
}
