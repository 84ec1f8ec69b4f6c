//! `GridEnv` — a small in-process game server.
//!
//! Holds the ground truth (agent bodies, parcels, scores) behind one lock and
//! hands out a [`Connector`] per agent.  It exists so the agent can run end
//! to end without a network server.
//!
//! # Rules
//!
//! | Action    | Effect                                                          |
//! |-----------|-----------------------------------------------------------------|
//! | `move_to` | rejected off-map, onto obstacles and onto occupied tiles; on    |
//! |           | success the body moves at once and the call resolves after      |
//! |           | `movement_ms`                                                   |
//! | `pickup`  | every free parcel on the tile                                   |
//! | `putdown` | every carried parcel; on a delivery tile they are scored and    |
//! |           | removed                                                         |
//! | decay     | every `parcel_decay_interval_ms` each parcel (carried or not)   |
//! |           | loses one point; parcels at 0 disappear                         |

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use pd_core::{AgentId, AgentRng, Direction, GameConfig, ParcelId, Position};
use pd_world::{Connector, GridMap, GridMapBuilder, Parcel, SensedAgent, TileKind};

use crate::{Agent, AgentError, AgentResult};

/// One sensing snapshot for a single agent.
#[derive(Clone, Debug, PartialEq)]
pub struct Sensing {
    pub position: Position,
    pub score:    u32,
    pub parcels:  Vec<Parcel>,
    pub agents:   Vec<SensedAgent>,
}

#[derive(Clone, Debug)]
struct Body {
    position: Position,
    score:    u32,
}

#[derive(Debug)]
struct Ground {
    map:         GridMap,
    bodies:      BTreeMap<AgentId, Body>,
    parcels:     BTreeMap<ParcelId, Parcel>,
    next_parcel: u32,
}

impl Ground {
    fn occupied(&self, pos: Position) -> bool {
        self.bodies.values().any(|b| b.position == pos)
    }

    fn can_enter(&self, pos: Position) -> bool {
        self.map.is_walkable(pos) && !self.occupied(pos)
    }
}

/// Shared handle to the environment.  Cloning is cheap.
#[derive(Clone)]
pub struct GridEnv {
    ground: Arc<Mutex<Ground>>,
    game:   GameConfig,
}

impl GridEnv {
    pub fn new(map: GridMap, game: GameConfig) -> Self {
        let ground = Ground { map, bodies: BTreeMap::new(), parcels: BTreeMap::new(), next_parcel: 1 };
        Self { ground: Arc::new(Mutex::new(ground)), game }
    }

    /// Parse a text layout, top row first (see `GridMapBuilder::from_rows`).
    pub fn from_rows(rows: &[&str], game: GameConfig) -> AgentResult<Self> {
        Ok(Self::new(GridMapBuilder::from_rows(rows)?.build(), game))
    }

    pub fn game(&self) -> &GameConfig {
        &self.game
    }

    /// A copy of the static map, for building agents.
    pub fn map(&self) -> GridMap {
        self.ground.lock().map.clone()
    }

    // ── Population ────────────────────────────────────────────────────────

    /// Put `id` on `pos`, or move it there if already present.  Agents placed
    /// without a runtime act as passive blockers.
    pub fn place_agent(&self, id: AgentId, pos: Position) -> AgentResult<()> {
        let mut g = self.ground.lock();
        let here = g.bodies.get(&id).map(|b| b.position);
        if here != Some(pos) && !g.can_enter(pos) {
            return Err(AgentError::Blocked(pos));
        }
        let score = g.bodies.get(&id).map_or(0, |b| b.score);
        g.bodies.insert(id, Body { position: pos, score });
        for p in g.parcels.values_mut().filter(|p| p.carried_by == Some(id)) {
            p.position = pos;
        }
        Ok(())
    }

    pub fn remove_agent(&self, id: AgentId) {
        let mut g = self.ground.lock();
        g.bodies.remove(&id);
        g.parcels.retain(|_, p| p.carried_by != Some(id));
    }

    /// Drop a new parcel on `pos`.
    pub fn spawn_parcel(&self, pos: Position, score: u32) -> AgentResult<ParcelId> {
        let mut g = self.ground.lock();
        if !g.map.is_walkable(pos) {
            return Err(AgentError::Blocked(pos));
        }
        let id = ParcelId(g.next_parcel);
        g.next_parcel += 1;
        g.parcels.insert(id, Parcel::new(id, pos, score));
        trace!(parcel = %id, %pos, score, "parcel spawned");
        Ok(id)
    }

    /// Drop a parcel on a random spawnable tile (any walkable non-delivery
    /// tile if the map marks none).  `None` when no tile qualifies.
    pub fn spawn_random_parcel(&self, rng: &mut AgentRng, score: u32) -> Option<ParcelId> {
        let candidates: Vec<Position> = {
            let g = self.ground.lock();
            let kind_of = |p: Position| g.map.tile(p).map(|t| t.kind);
            let spawnable: Vec<Position> = g
                .map
                .walkable_positions()
                .filter(|&p| kind_of(p) == Some(TileKind::Spawnable))
                .collect();
            if spawnable.is_empty() {
                g.map.walkable_positions().filter(|&p| !g.map.is_delivery(p)).collect()
            } else {
                spawnable
            }
        };
        let pos = *rng.choose(&candidates)?;
        self.spawn_parcel(pos, score).ok()
    }

    // ── Ground truth queries ──────────────────────────────────────────────

    pub fn position(&self, id: AgentId) -> Option<Position> {
        self.ground.lock().bodies.get(&id).map(|b| b.position)
    }

    pub fn score(&self, id: AgentId) -> u32 {
        self.ground.lock().bodies.get(&id).map_or(0, |b| b.score)
    }

    pub fn parcel(&self, id: ParcelId) -> Option<Parcel> {
        self.ground.lock().parcels.get(&id).cloned()
    }

    /// What `id` can see from where it stands.
    pub fn sense(&self, id: AgentId) -> Option<Sensing> {
        let g = self.ground.lock();
        let me = g.bodies.get(&id)?;
        let parcels = g
            .parcels
            .values()
            .filter(|p| p.position.manhattan(me.position) <= self.game.parcels_observation_distance)
            .cloned()
            .collect();
        let agents = g
            .bodies
            .iter()
            .filter(|&(&other, b)| {
                other != id && b.position.manhattan(me.position) <= self.game.agents_observation_distance
            })
            .map(|(&other, b)| SensedAgent {
                id:       other,
                x:        b.position.x as f32,
                y:        b.position.y as f32,
                carrying: g.parcels.values().any(|p| p.carried_by == Some(other)),
            })
            .collect();
        Some(Sensing { position: me.position, score: me.score, parcels, agents })
    }

    // ── Clock ─────────────────────────────────────────────────────────────

    /// One decay interval: every parcel loses a point.
    pub fn decay_once(&self) {
        let mut g = self.ground.lock();
        g.parcels.retain(|_, p| {
            p.score = p.score.saturating_sub(1);
            p.score > 0
        });
    }

    /// Decay parcels every `parcel_decay_interval_ms` until `shutdown`.
    /// Returns at once when parcels never decay.
    pub async fn run_decay(self, shutdown: CancellationToken) {
        if self.game.parcel_decay_interval_ms == 0 {
            return;
        }
        let mut tick = interval(Duration::from_millis(self.game.parcel_decay_interval_ms));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tick.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tick.tick() => self.decay_once(),
            }
        }
    }

    // ── Sensing ───────────────────────────────────────────────────────────

    /// Deliver one sensing snapshot to `agent`.
    pub async fn feed(&self, agent: &Agent) {
        let Some(s) = self.sense(agent.id()) else { return };
        agent.on_you(s.position.x as f32, s.position.y as f32, s.score);
        agent.on_agents_sensing(&s.agents);
        agent.on_parcels_sensing(&s.parcels).await;
    }

    /// Feed `agent` twice per movement duration until `shutdown`.
    pub async fn pump(self, agent: Arc<Agent>, shutdown: CancellationToken) {
        let every = Duration::from_millis((self.game.movement_ms / 2).max(1));
        let mut tick = interval(every);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tick.tick() => self.feed(&agent).await,
            }
        }
        debug!(agent = %agent.id(), "sensing stopped");
    }

    pub fn connector(&self, id: AgentId) -> Arc<EnvConnector> {
        Arc::new(EnvConnector { env: self.clone(), id })
    }

    // ── Actions ───────────────────────────────────────────────────────────

    fn try_move(&self, id: AgentId, dir: Direction) -> bool {
        let mut g = self.ground.lock();
        let Some(from) = g.bodies.get(&id).map(|b| b.position) else { return false };
        let to = from.step(dir);
        if !g.can_enter(to) {
            trace!(agent = %id, %from, %to, "move rejected");
            return false;
        }
        if let Some(b) = g.bodies.get_mut(&id) {
            b.position = to;
        }
        for p in g.parcels.values_mut().filter(|p| p.carried_by == Some(id)) {
            p.position = to;
        }
        true
    }

    fn pickup(&self, id: AgentId) -> Vec<ParcelId> {
        let mut g = self.ground.lock();
        let Some(here) = g.bodies.get(&id).map(|b| b.position) else { return Vec::new() };
        let mut picked = Vec::new();
        for p in g.parcels.values_mut().filter(|p| p.is_free() && p.position == here) {
            p.carried_by = Some(id);
            picked.push(p.id);
        }
        picked
    }

    fn putdown(&self, id: AgentId) -> Vec<ParcelId> {
        let mut g = self.ground.lock();
        let Some(here) = g.bodies.get(&id).map(|b| b.position) else { return Vec::new() };
        let dropped: Vec<ParcelId> = g
            .parcels
            .values()
            .filter(|p| p.carried_by == Some(id))
            .map(|p| p.id)
            .collect();
        if g.map.is_delivery(here) {
            let gained: u32 = dropped.iter().filter_map(|pid| g.parcels.remove(pid)).map(|p| p.score).sum();
            if let Some(b) = g.bodies.get_mut(&id) {
                b.score += gained;
            }
            debug!(agent = %id, delivered = dropped.len(), gained, "delivery");
        } else {
            for pid in &dropped {
                if let Some(p) = g.parcels.get_mut(pid) {
                    p.carried_by = None;
                }
            }
        }
        dropped
    }
}

/// The [`Connector`] of one agent in a [`GridEnv`].
pub struct EnvConnector {
    env: GridEnv,
    id:  AgentId,
}

#[async_trait]
impl Connector for EnvConnector {
    async fn move_to(&self, dir: Direction) -> bool {
        if !self.env.try_move(self.id, dir) {
            return false;
        }
        sleep(Duration::from_millis(self.env.game.movement_ms)).await;
        true
    }

    async fn pickup(&self) -> Vec<ParcelId> {
        self.env.pickup(self.id)
    }

    async fn putdown(&self) -> Vec<ParcelId> {
        self.env.putdown(self.id)
    }

    fn game_config(&self) -> GameConfig {
        self.env.game.clone()
    }
}
