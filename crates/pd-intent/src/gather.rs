//! Parcels collected on the way to a pickup target.
//!
//! A pickup route also gathers every free parcel lying on it or one tile to
//! its side.  A side parcel costs a short trip: step out, pick up, step back.
//! Both the pickup utility and the executed plan are derived from the same
//! [`Stop`] list.
//!
//! ```text
//! route   a ─ b ─ c ─ T          stop at b, side tile s above b
//! plan    a ─ b ─ s ─ s ─ b ─ c ─ T
//!                 ↑   ↑   ↑
//!               out  pick back
//! ```

use std::collections::BTreeSet;

use pd_core::{ParcelId, Position};
use pd_path::{Action, Plan, Step};
use pd_world::WorldModel;

/// One extra pickup along a route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stop {
    /// Index of the route step the stop is made from.
    pub at:      usize,
    /// Tile holding the parcels: the route tile itself or a neighbour of it.
    pub tile:    Position,
    pub parcels: Vec<ParcelId>,
    pub score:   u32,
}

impl Stop {
    /// Whether reaching the stop leaves the route.
    pub fn is_side_trip(&self, route: &Plan) -> bool {
        route.get(self.at).is_some_and(|s| s.position != self.tile)
    }
}

/// Stops for free parcels on or beside `route`, in route order.
///
/// The target tile is left to the goal action.  Side tiles must be walkable
/// and free right now; the teammate's announced target is never gathered.
pub fn gather_stops(world: &WorldModel, route: &Plan, target: Position) -> Vec<Stop> {
    let on_route: BTreeSet<Position> = route.steps().iter().map(|s| s.position).collect();
    let claimed = world.teammate_target();
    let frame = world.forecast.frame(0);
    let mut seen = BTreeSet::from([target]);
    let mut stops = Vec::new();

    for (at, step) in route.steps().iter().enumerate() {
        let here = step.position;
        let sides = here
            .neighbors()
            .into_iter()
            .map(|(_, q)| q)
            .filter(|q| !on_route.contains(q) && world.map.is_walkable(*q) && frame.is_free_for(*q, world.me.id));
        for tile in std::iter::once(here).chain(sides) {
            if !seen.insert(tile) {
                continue;
            }
            let (parcels, score) = world
                .parcels
                .free()
                .filter(|p| p.position == tile && Some(p.id) != claimed)
                .fold((Vec::new(), 0), |(mut ids, total), p| {
                    ids.push(p.id);
                    (ids, total + p.score)
                });
            if !parcels.is_empty() {
                stops.push(Stop { at, tile, parcels, score });
            }
        }
    }
    stops
}

/// `route` with every stop spliced in after the step it is made from.
pub fn with_stops(route: &Plan, stops: &[Stop]) -> Plan {
    let mut steps = Vec::with_capacity(route.len() + 3 * stops.len());
    let mut pending = stops.iter().peekable();
    for (at, step) in route.steps().iter().enumerate() {
        steps.push(*step);
        while let Some(stop) = pending.next_if(|s| s.at == at) {
            match step.position.direction_to(stop.tile) {
                None => steps.push(Step::new(step.position, Action::PickUp)),
                Some(dir) => {
                    steps.push(Step::new(stop.tile, Action::from_direction(dir)));
                    steps.push(Step::new(stop.tile, Action::PickUp));
                    steps.push(Step::new(step.position, Action::from_direction(dir.opposite())));
                }
            }
        }
    }
    Plan::from_steps(steps)
}

/// Whether `plan[idx]` opens a side trip: out, pick up, back to `plan[idx - 1]`.
pub(crate) fn is_side_trip(plan: &Plan, idx: usize) -> bool {
    let Some(from) = idx.checked_sub(1).and_then(|i| plan.get(i)) else { return false };
    match (plan.get(idx), plan.get(idx + 1), plan.get(idx + 2)) {
        (Some(out), Some(pick), Some(back)) => {
            out.action.is_move()
                && pick.action == Action::PickUp
                && pick.position == out.position
                && back.action.is_move()
                && back.position == from.position
        }
        _ => false,
    }
}
