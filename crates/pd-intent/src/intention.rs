//! Intention identity and goals.

use std::fmt;

use pd_core::{IntentionKind, ParcelId, Position};
use pd_world::WorldModel;

use crate::explore_goal;

/// Identity of an intention: kind plus target parcel.  The scheduler's
/// completion channel is keyed by it.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct IntentionKey {
    pub kind:   IntentionKind,
    pub target: Option<ParcelId>,
}

impl IntentionKey {
    pub fn pickup(parcel: ParcelId) -> Self {
        Self { kind: IntentionKind::PickUp, target: Some(parcel) }
    }

    pub fn deliver() -> Self {
        Self { kind: IntentionKind::Deliver, target: None }
    }

    pub fn explore() -> Self {
        Self { kind: IntentionKind::Explore, target: None }
    }
}

impl fmt::Display for IntentionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            Some(p) => write!(f, "{}({})", self.kind, p.0),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Where an intention wants to go.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Goal {
    Tile(Position),
    /// Any of several tiles (e.g. every delivery tile).
    AnyOf(Vec<Position>),
}

impl Goal {
    pub fn positions(&self) -> &[Position] {
        match self {
            Goal::Tile(p) => std::slice::from_ref(p),
            Goal::AnyOf(ps) => ps,
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.positions().contains(&pos)
    }

    /// Manhattan distance from `from` to the nearest goal tile.
    pub fn distance_from(&self, from: Position) -> Option<u32> {
        self.positions().iter().map(|p| from.manhattan(*p)).min()
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum Phase {
    #[default]
    Idle,
    Planning,
    Executing,
    Reached,
    Stopped,
}

/// A candidate or running intention.
#[derive(Clone, Debug)]
pub struct Intention {
    pub key:   IntentionKey,
    /// `Idle` until first started.  The scheduler then records each phase
    /// of the run, and keeps the final one (`Reached` or `Stopped`) until
    /// the intention is started again.
    pub phase: Phase,
}

impl Intention {
    pub fn new(key: IntentionKey) -> Self {
        Self { key, phase: Phase::Idle }
    }

    #[inline]
    pub fn kind(&self) -> IntentionKind {
        self.key.kind
    }

    /// The goal in the current world, or `None` if the intention is stale.
    pub fn goal(&self, world: &WorldModel) -> Option<Goal> {
        resolve_goal(&self.key, world)
    }

    pub fn is_stale(&self, world: &WorldModel) -> bool {
        is_stale(&self.key, world)
    }
}

pub(crate) fn is_stale(key: &IntentionKey, world: &WorldModel) -> bool {
    match key.kind {
        IntentionKind::PickUp => !key
            .target
            .and_then(|id| world.parcels.get(id))
            .is_some_and(|p| p.is_free()),
        IntentionKind::Deliver => world.carried_count() == 0,
        IntentionKind::Explore => false,
    }
}

pub(crate) fn resolve_goal(key: &IntentionKey, world: &WorldModel) -> Option<Goal> {
    if is_stale(key, world) {
        return None;
    }
    match key.kind {
        IntentionKind::PickUp => key
            .target
            .and_then(|id| world.parcels.get(id))
            .map(|p| Goal::Tile(p.position)),
        IntentionKind::Deliver => {
            let tiles = world.map.deliveries().to_vec();
            (!tiles.is_empty()).then_some(Goal::AnyOf(tiles))
        }
        IntentionKind::Explore => explore_goal(world).map(Goal::Tile),
    }
}
