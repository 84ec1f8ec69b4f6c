//! Utility evaluation.
//!
//! # Formulas
//!
//! ```text
//! decay_units(d) = d / moves_per_decay + latency_ms / decay_interval_ms
//!
//! deliver = carried_total − rate · decay_units(h_here) · carried_count
//! pickup  = gain − rate · decay_units(route + h_target) · (|gathered| + carried_count)
//! explore = explore_utility
//! ```
//!
//! `gain` sums the target's score and every parcel the route gathers (see
//! [`gather`](crate::gather)); each side trip adds two hops to `route`.  A
//! third party closer to the target caps pickup at
//! `contested_factor · gain / (1 + advantage)`; a closer teammate makes it 0.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use pd_core::{GameConfig, IntentionKind, Position, UtilityParams};
use pd_path::{DistanceField, Pathfinder, SearchMode};
use pd_world::WorldModel;

use crate::gather::gather_stops;
use crate::intention::resolve_goal;
use crate::{Goal, IntentionKey};

// ── PlanningStats ─────────────────────────────────────────────────────────────

/// Empirical timing shared by the executor (writer) and scheduler (reader).
#[derive(Clone, Debug)]
pub struct PlanningStats {
    moves_per_decay:   f32,
    decay_interval_ms: f32,
    latency_ms:        f32,
    step_ms:           f32,
    smoothing:         f32,
}

pub type SharedStats = Arc<Mutex<PlanningStats>>;

impl PlanningStats {
    pub fn new(game: &GameConfig, params: &UtilityParams) -> Self {
        Self {
            moves_per_decay:   game.moves_per_decay(),
            decay_interval_ms: game.parcel_decay_interval_ms as f32,
            latency_ms:        params.initial_latency_ms,
            step_ms:           game.movement_ms as f32,
            smoothing:         params.latency_smoothing.clamp(0.0, 1.0),
        }
    }

    pub fn into_shared(self) -> SharedStats {
        Arc::new(Mutex::new(self))
    }

    /// Fold one planner call duration into the latency average.
    pub fn record_latency(&mut self, elapsed: Duration) {
        let ms = elapsed.as_secs_f32() * 1000.0;
        self.latency_ms += self.smoothing * (ms - self.latency_ms);
    }

    /// Fold one observed step duration into moves-per-decay.
    pub fn record_step(&mut self, elapsed: Duration) {
        let ms = elapsed.as_secs_f32() * 1000.0;
        self.step_ms += self.smoothing * (ms - self.step_ms);
        if self.decay_interval_ms > 0.0 && self.step_ms > 0.0 {
            self.moves_per_decay = self.decay_interval_ms / self.step_ms;
        }
    }

    pub fn moves_per_decay(&self) -> f32 {
        self.moves_per_decay
    }

    pub fn latency_ms(&self) -> f32 {
        self.latency_ms
    }

    /// Decay intervals expected to elapse over `hops` moves plus one planning
    /// round.  Zero when parcels never decay.
    pub fn decay_units(&self, hops: u32) -> f32 {
        if self.decay_interval_ms <= 0.0 || !self.moves_per_decay.is_finite() {
            return 0.0;
        }
        hops as f32 / self.moves_per_decay + self.latency_ms / self.decay_interval_ms
    }
}

// ── Evaluation ────────────────────────────────────────────────────────────────

/// One intention's worth on this tick.
#[derive(Clone, Debug)]
pub struct Evaluation {
    pub key:      IntentionKey,
    pub utility:  f32,
    pub goal:     Option<Goal>,
    /// Manhattan distance to the nearest goal tile (tie-break).
    pub distance: u32,
}

impl Evaluation {
    fn worthless(key: IntentionKey) -> Self {
        Self { key, utility: f32::NEG_INFINITY, goal: None, distance: u32::MAX }
    }
}

/// Evaluate `key` against the current world.
pub fn evaluate(key: &IntentionKey, world: &WorldModel, stats: &PlanningStats, params: &UtilityParams) -> Evaluation {
    let Some(here) = world.position() else { return Evaluation::worthless(*key) };
    if key.kind == IntentionKind::Deliver && world.carried_count() == 0 {
        return Evaluation { key: *key, utility: 0.0, goal: None, distance: u32::MAX };
    }
    let Some(goal) = resolve_goal(key, world) else { return Evaluation::worthless(*key) };
    let distance = goal.distance_from(here).unwrap_or(u32::MAX);

    let utility = match key.kind {
        IntentionKind::Deliver => deliver_utility(world, here, stats, params),
        IntentionKind::PickUp => match goal {
            Goal::Tile(target) => pickup_utility(world, here, target, stats, params),
            Goal::AnyOf(_) => f32::NEG_INFINITY,
        },
        IntentionKind::Explore => params.explore_utility,
    };
    Evaluation { key: *key, utility, goal: Some(goal), distance }
}

fn deliver_utility(world: &WorldModel, here: Position, stats: &PlanningStats, params: &UtilityParams) -> f32 {
    let count = world.carried_count();
    if count == 0 {
        return 0.0;
    }
    let Some(h) = world.map.heuristic(here) else { return f32::NEG_INFINITY };
    world.carried_total() as f32 - params.penalty_rate * stats.decay_units(h) * count as f32
}

fn pickup_utility(
    world:  &WorldModel,
    here:   Position,
    target: Position,
    stats:  &PlanningStats,
    params: &UtilityParams,
) -> f32 {
    let route = Pathfinder::new(0).find_path(world, here, &[target], SearchMode::ObstacleOnly);
    if route.is_trivial() && here != target {
        return f32::NEG_INFINITY;
    }
    let route_len = route.len().saturating_sub(1) as u32;

    let stops = gather_stops(world, &route, target);
    let trips = stops.iter().filter(|s| s.is_side_trip(&route)).count() as u32;
    let (at_target, target_score) = world
        .parcels
        .free()
        .filter(|p| p.position == target)
        .fold((0usize, 0u32), |(n, total), p| (n + 1, total + p.score));
    let gain = (target_score + stops.iter().map(|s| s.score).sum::<u32>()) as f32;
    let carried = at_target + stops.iter().map(|s| s.parcels.len()).sum::<usize>() + world.carried_count();
    let h_target = world.map.heuristic(target).unwrap_or(0);
    let hops = route_len + 2 * trips + h_target;
    let utility = gain - params.penalty_rate * stats.decay_units(hops) * carried as f32;

    // Contested target.  A teammate at the same distance wins when its id is
    // smaller, so exactly one of the pair backs off.
    let field = DistanceField::from_origin(&world.map, target);
    let mut capped = utility;
    for (id, pos) in world.agents.located() {
        let Some(theirs) = field.get(pos) else { continue };
        let teammate = world.is_teammate(id);
        let closer = theirs < route_len || (teammate && theirs == route_len && id < world.me.id);
        if !closer {
            continue;
        }
        if teammate {
            return 0.0;
        }
        let advantage = (route_len - theirs) as f32;
        capped = capped.min(params.contested_factor * gain / (1.0 + advantage));
    }
    capped
}

// ── Explore goal ──────────────────────────────────────────────────────────────

/// The farthest tile reachable from our position; ties go to the tile seen
/// longest ago, then to row-major order.  `None` when nothing else is
/// reachable.
pub fn explore_goal(world: &WorldModel) -> Option<Position> {
    let here = world.position()?;
    let field = DistanceField::from_origin(&world.map, here);
    field
        .reachable()
        .filter(|&(p, d)| d > 0 && world.forecast.frame(0).is_free_for(p, world.me.id))
        .max_by(|&(a, da), &(b, db)| {
            let seen = |p: Position| world.map.tile(p).map_or(0, |t| t.last_seen.0);
            da.cmp(&db)
                .then_with(|| seen(b).cmp(&seen(a)))
                .then_with(|| (b.y, b.x).cmp(&(a.y, a.x)))
        })
        .map(|(p, _)| p)
}
