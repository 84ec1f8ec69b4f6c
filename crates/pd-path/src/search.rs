//! Breadth-first search strategies.
//!
//! All three strategies share one BFS over an arena of nodes with parent
//! links.  They differ only in which tiles are enterable at a given step and
//! whether waiting is allowed.
//!
//! # Time-expanded search
//!
//! The search state is `(position, t, waits)`.  The time index used for the
//! visited set is capped at `H - 1` so the state space stays finite; beyond
//! the horizon the last forecast frame is reused.  Direction try-order
//! alternates between `Direction::ALL` and `Direction::ALT` on successive
//! levels.
//!
//! # Goal filtering
//!
//! A goal is accepted only when it is entered in a frame where it is free for
//! us.  A goal occupied now is therefore skipped by the goal test but may
//! still be reached in a later frame once the occupant has moved on.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use tracing::trace;

use pd_core::{AgentId, Direction, Position};
use pd_world::{Forecast, GridMap, WorldModel};

use crate::{Action, Plan, Step};

/// Which strategy (or chain of strategies) to run.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum SearchMode {
    /// Time-expanded, then present-state, then obstacle-only.
    #[default]
    Chain,
    /// Forecast-aware search; `max_len` bounds the number of steps.
    TimeExpanded { max_len: Option<usize> },
    /// Time-expanded search with `blocked` occupied in every frame.
    Detour { blocked: Position, max_len: usize },
    PresentState,
    ObstacleOnly,
}

/// Stateless BFS pathfinder.
#[derive(Copy, Clone, Debug)]
pub struct Pathfinder {
    max_waits: u32,
}

impl Pathfinder {
    /// `max_waits` bounds consecutive waits on one tile in time-expanded
    /// search.
    pub const fn new(max_waits: u32) -> Self {
        Self { max_waits }
    }

    /// Find a path from `start` to any of `goals`.
    ///
    /// Never fails: an unreachable goal, an empty goal set, or a start that
    /// already is a goal all yield a trivial plan.
    pub fn find_path(
        &self,
        world: &WorldModel,
        start: Position,
        goals: &[Position],
        mode:  SearchMode,
    ) -> Plan {
        let me = world.me.id;
        match mode {
            SearchMode::Chain => {
                let strategies = [
                    SearchMode::TimeExpanded { max_len: None },
                    SearchMode::PresentState,
                    SearchMode::ObstacleOnly,
                ];
                let mut plan = Plan::stay(start);
                for strategy in strategies {
                    plan = self.find_path(world, start, goals, strategy);
                    if !plan.is_trivial() {
                        break;
                    }
                }
                plan
            }
            SearchMode::TimeExpanded { max_len } => {
                let plan = self.time_expanded(&world.map, &world.forecast, me, start, goals, max_len);
                trace!(agent = %me, len = plan.len(), "time-expanded search");
                plan
            }
            SearchMode::Detour { blocked, max_len } => {
                let forecast = world.forecast.with_blocked(blocked, AgentId::INVALID);
                let plan = self.time_expanded(&world.map, &forecast, me, start, goals, Some(max_len));
                trace!(agent = %me, len = plan.len(), %blocked, "detour search");
                plan
            }
            SearchMode::PresentState => {
                let frame = world.forecast.frame(0);
                let plan = bfs(start, goals, |p| {
                    world.map.is_walkable(p) && frame.is_free_for(p, me)
                });
                trace!(agent = %me, len = plan.len(), "present-state search");
                plan
            }
            SearchMode::ObstacleOnly => {
                let plan = bfs(start, goals, |p| world.map.is_walkable(p));
                trace!(agent = %me, len = plan.len(), "obstacle-only search");
                plan
            }
        }
    }

    fn time_expanded(
        &self,
        map:      &GridMap,
        forecast: &Forecast,
        me:       AgentId,
        start:    Position,
        goals:    &[Position],
        max_len:  Option<usize>,
    ) -> Plan {
        if goals.is_empty() || goals.contains(&start) {
            return Plan::stay(start);
        }
        let cap = forecast.horizon().saturating_sub(1);

        let mut arena: Vec<Node> = vec![Node { step: Step::new(start, Action::None), parent: None, t: 0, waits: 0 }];
        let mut visited: FxHashSet<(Position, usize, u32)> = FxHashSet::default();
        visited.insert((start, 0, 0));
        let mut queue = VecDeque::from([0usize]);

        while let Some(idx) = queue.pop_front() {
            let Node { step, t, waits, .. } = arena[idx];
            if max_len.is_some_and(|m| t >= m) {
                continue;
            }
            let next_t = t + 1;
            let frame = forecast.frame(next_t);
            let order = if t % 2 == 0 { Direction::ALL } else { Direction::ALT };

            for dir in order {
                let next = step.position.step(dir);
                if !map.is_walkable(next) || !frame.is_free_for(next, me) {
                    continue;
                }
                if !visited.insert((next, next_t.min(cap), 0)) {
                    continue;
                }
                arena.push(Node {
                    step:   Step::new(next, Action::from_direction(dir)),
                    parent: Some(idx),
                    t:      next_t,
                    waits:  0,
                });
                let child = arena.len() - 1;
                if goals.contains(&next) {
                    return reconstruct(&arena, child);
                }
                queue.push_back(child);
            }

            if waits < self.max_waits && frame.is_free_for(step.position, me) {
                let key = (step.position, next_t.min(cap), waits + 1);
                if visited.insert(key) {
                    arena.push(Node {
                        step:   Step::new(step.position, Action::Wait),
                        parent: Some(idx),
                        t:      next_t,
                        waits:  waits + 1,
                    });
                    queue.push_back(arena.len() - 1);
                }
            }
        }
        Plan::stay(start)
    }
}

// ── BFS internals ─────────────────────────────────────────────────────────────

#[derive(Copy, Clone)]
struct Node {
    step:   Step,
    parent: Option<usize>,
    t:      usize,
    waits:  u32,
}

/// Untimed BFS where `enterable` decides which tiles may be stepped on.
fn bfs(start: Position, goals: &[Position], enterable: impl Fn(Position) -> bool) -> Plan {
    if goals.is_empty() || goals.contains(&start) {
        return Plan::stay(start);
    }
    let mut arena = vec![Node { step: Step::new(start, Action::None), parent: None, t: 0, waits: 0 }];
    let mut visited: FxHashSet<Position> = FxHashSet::default();
    visited.insert(start);
    let mut queue = VecDeque::from([0usize]);

    while let Some(idx) = queue.pop_front() {
        let Node { step, t, .. } = arena[idx];
        let order = if t % 2 == 0 { Direction::ALL } else { Direction::ALT };
        for dir in order {
            let next = step.position.step(dir);
            if !enterable(next) || !visited.insert(next) {
                continue;
            }
            arena.push(Node {
                step:   Step::new(next, Action::from_direction(dir)),
                parent: Some(idx),
                t:      t + 1,
                waits:  0,
            });
            let child = arena.len() - 1;
            if goals.contains(&next) {
                return reconstruct(&arena, child);
            }
            queue.push_back(child);
        }
    }
    Plan::stay(start)
}

fn reconstruct(arena: &[Node], mut idx: usize) -> Plan {
    let mut steps = Vec::new();
    loop {
        let node = arena[idx];
        steps.push(node.step);
        match node.parent {
            Some(p) => idx = p,
            None => break,
        }
    }
    steps.reverse();
    Plan::from_steps(steps)
}

// ── DistanceField ─────────────────────────────────────────────────────────────

/// Obstacle-only hop counts from one origin to every reachable tile.
#[derive(Clone, Debug)]
pub struct DistanceField {
    width: i32,
    dist:  Vec<Option<u32>>,
}

impl DistanceField {
    pub fn from_origin(map: &GridMap, origin: Position) -> Self {
        let width = map.width();
        let mut dist = vec![None; (width * map.height()).max(0) as usize];
        let index = |p: Position| (p.y * width + p.x) as usize;

        if map.is_walkable(origin) {
            dist[index(origin)] = Some(0);
            let mut queue = VecDeque::from([origin]);
            while let Some(p) = queue.pop_front() {
                let d = dist[index(p)].unwrap_or(0);
                for next in map.walkable_neighbors(p) {
                    let slot = &mut dist[index(next)];
                    if slot.is_none() {
                        *slot = Some(d + 1);
                        queue.push_back(next);
                    }
                }
            }
        }
        Self { width, dist }
    }

    /// Hops from the origin to `pos`; `None` if unreachable or outside.
    pub fn get(&self, pos: Position) -> Option<u32> {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width {
            return None;
        }
        self.dist.get((pos.y * self.width + pos.x) as usize).copied().flatten()
    }

    /// Every reachable tile with its distance.
    pub fn reachable(&self) -> impl Iterator<Item = (Position, u32)> + '_ {
        let width = self.width;
        self.dist.iter().enumerate().filter_map(move |(i, d)| {
            let i = i as i32;
            d.map(|d| (Position::new(i % width, i / width), d))
        })
    }
}
