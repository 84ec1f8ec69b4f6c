//! Beliefs about other agents.
//!
//! Each believed agent keeps a bounded history of observed positions, a
//! believed intention, and a projected trajectory over the forecast horizon.
//! A third-party agent that has not been sensed for `unseen_timeout` ticks
//! has its position cleared: it is never kept at a stale coordinate.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use pd_core::{AgentId, ParcelId, Position, Tick};

use crate::GridMap;

/// What we believe another agent is doing.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BelievedIntention {
    #[default]
    Still,
    Move,
    PickUp,
    Deliver,
}

/// One sensing report about another agent.  Coordinates may be fractional
/// while the agent is mid-move.
#[derive(Clone, Debug, PartialEq)]
pub struct SensedAgent {
    pub id:       AgentId,
    pub x:        f32,
    pub y:        f32,
    pub carrying: bool,
}

/// Belief about a single agent.
#[derive(Clone, Debug)]
pub struct AgentBelief {
    pub id: AgentId,

    /// Last known tile, `None` once decayed to unknown.
    pub position: Option<Position>,

    /// Most recent observed positions, oldest first, bounded length.
    pub history: VecDeque<Position>,

    pub carrying: bool,

    pub intention: BelievedIntention,

    /// Parcel the agent announced it is going for (teammate only).
    pub announced_target: Option<ParcelId>,

    /// Path the agent announced it is following (teammate only).  Element 0
    /// is where it stood when it announced.
    pub announced_path: Vec<Position>,

    pub last_seen: Tick,

    /// Predicted positions for steps `0..H`; element 0 is `position`.
    pub trajectory: Vec<Position>,
}

impl AgentBelief {
    fn new(id: AgentId, now: Tick) -> Self {
        Self {
            id,
            position:         None,
            history:          VecDeque::new(),
            carrying:         false,
            intention:        BelievedIntention::Still,
            announced_target: None,
            announced_path:   Vec::new(),
            last_seen:        now,
            trajectory:       Vec::new(),
        }
    }

    /// Direction of the most recent observed step, if the agent moved.
    fn last_step(&self) -> Option<pd_core::Direction> {
        let n = self.history.len();
        if n < 2 {
            return None;
        }
        self.history[n - 2].direction_to(self.history[n - 1])
    }

    /// Predicted position at future step `t`, holding the last prediction
    /// beyond the trajectory's end.
    pub fn predicted(&self, t: usize) -> Option<Position> {
        self.trajectory
            .get(t)
            .or_else(|| self.trajectory.last())
            .copied()
            .or(self.position)
    }
}

/// Beliefs about every agent other than ourselves.
#[derive(Clone, Debug)]
pub struct AgentBook {
    agents:      BTreeMap<AgentId, AgentBelief>,
    history_len: usize,
}

impl AgentBook {
    pub fn new(history_len: usize) -> Self {
        Self { agents: BTreeMap::new(), history_len: history_len.max(2) }
    }

    pub fn get(&self, id: AgentId) -> Option<&AgentBelief> {
        self.agents.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentBelief> {
        self.agents.values()
    }

    /// Agents with a known position.
    pub fn located(&self) -> impl Iterator<Item = (AgentId, Position)> + '_ {
        self.agents
            .values()
            .filter_map(|a| a.position.map(|p| (a.id, p)))
    }

    // ── Updates ───────────────────────────────────────────────────────────

    /// Record one batch of sensing reports at tick `now`.
    pub fn observe(&mut self, sensed: &[SensedAgent], now: Tick) {
        for s in sensed {
            let pos = Position::rounded(s.x, s.y);
            let belief = self
                .agents
                .entry(s.id)
                .or_insert_with(|| AgentBelief::new(s.id, now));

            let moved = belief.history.back().is_some_and(|&last| last != pos);
            if belief.history.back() != Some(&pos) {
                belief.history.push_back(pos);
                while belief.history.len() > self.history_len {
                    belief.history.pop_front();
                }
            }
            belief.position = Some(pos);
            belief.carrying = s.carrying;
            belief.last_seen = now;

            // An announced PickUp/Deliver stays authoritative until the
            // teammate announces something else.
            if !matches!(belief.intention, BelievedIntention::PickUp | BelievedIntention::Deliver) {
                belief.intention = if moved { BelievedIntention::Move } else { BelievedIntention::Still };
            }
        }
    }

    /// Place or move an agent from a gossiped position (teammate).
    pub fn set_position(&mut self, id: AgentId, pos: Position, now: Tick) {
        let carrying = self.get(id).is_some_and(|a| a.carrying);
        self.observe(&[SensedAgent { id, x: pos.x as f32, y: pos.y as f32, carrying }], now);
    }

    pub fn set_carrying(&mut self, id: AgentId, carrying: bool, now: Tick) {
        let belief = self.agents.entry(id).or_insert_with(|| AgentBelief::new(id, now));
        belief.carrying = carrying;
    }

    /// Record an intention announced over the coordination channel.
    pub fn announce(
        &mut self,
        id:        AgentId,
        intention: BelievedIntention,
        target:    Option<ParcelId>,
        now:       Tick,
    ) {
        let belief = self.agents.entry(id).or_insert_with(|| AgentBelief::new(id, now));
        belief.intention = intention;
        belief.announced_target = target;
    }

    /// Record a path announced over the coordination channel.
    pub fn announce_path(&mut self, id: AgentId, path: Vec<Position>, now: Tick) {
        let belief = self.agents.entry(id).or_insert_with(|| AgentBelief::new(id, now));
        belief.announced_path = path;
    }

    /// Clear the position of every agent except `exempt` that has not been
    /// sensed for more than `timeout` ticks.
    pub fn decay_unseen(&mut self, now: Tick, timeout: u64, exempt: Option<AgentId>) {
        for belief in self.agents.values_mut() {
            if Some(belief.id) == exempt {
                continue;
            }
            if belief.position.is_some() && now.since(belief.last_seen) > timeout {
                belief.position = None;
                belief.trajectory.clear();
                belief.intention = BelievedIntention::Still;
            }
        }
    }

    /// Recompute every trajectory for `horizon` steps.
    ///
    /// An announced path is followed from the agent's current position on
    /// it.  Otherwise a still agent stays put and a moving agent keeps its
    /// last step direction until the next tile is not walkable.
    pub fn project(&mut self, map: &GridMap, horizon: usize) {
        for belief in self.agents.values_mut() {
            belief.trajectory.clear();
            let Some(start) = belief.position else { continue };

            let announced_from = belief
                .announced_path
                .iter()
                .position(|&p| p == start);

            if let Some(i) = announced_from {
                let path = &belief.announced_path[i..];
                for t in 0..horizon {
                    let p = path.get(t).or_else(|| path.last()).copied().unwrap_or(start);
                    belief.trajectory.push(p);
                }
                continue;
            }

            let heading = match belief.intention {
                BelievedIntention::Still => None,
                _ => belief.last_step(),
            };
            let mut p = start;
            for _ in 0..horizon {
                belief.trajectory.push(p);
                if let Some(dir) = heading {
                    let next = p.step(dir);
                    if map.is_walkable(next) {
                        p = next;
                    }
                }
            }
        }
    }
}
