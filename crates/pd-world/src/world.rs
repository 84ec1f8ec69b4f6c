//! The owned world model and its sensing callbacks.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use pd_core::{AgentConfig, AgentId, GameConfig, ParcelId, Position, Tick};

use crate::{
    AgentBelief, AgentBook, BelievedIntention, Forecast, GridMap, Parcel, ParcelBook, SensedAgent,
};

/// The world model shared between the scheduler, the executor and the
/// recovery protocol.  Never hold a guard across an `.await`.
pub type SharedWorld = Arc<RwLock<WorldModel>>;

/// What the agent knows about itself.
#[derive(Clone, Debug)]
pub struct SelfState {
    pub id:       AgentId,
    pub position: Option<Position>,
    /// Points scored so far (sum of delivered parcel scores).
    pub score:    u32,
}

/// Everything one agent believes about the game.
#[derive(Clone, Debug)]
pub struct WorldModel {
    pub me:       SelfState,
    pub teammate: Option<AgentId>,
    pub map:      GridMap,
    pub parcels:  ParcelBook,
    pub agents:   AgentBook,
    pub forecast: Forecast,
    pub game:     GameConfig,
    pub now:      Tick,

    horizon:        usize,
    unseen_timeout: u64,
}

impl WorldModel {
    pub fn new(me: AgentId, map: GridMap, game: GameConfig, config: &AgentConfig) -> Self {
        let forecast = Forecast::static_only(&map, config.horizon);
        Self {
            me: SelfState { id: me, position: None, score: 0 },
            teammate: None,
            map,
            parcels: ParcelBook::new(),
            agents: AgentBook::new(config.history_len),
            forecast,
            game,
            now: Tick::ZERO,
            horizon: config.horizon,
            unseen_timeout: config.unseen_timeout_ticks,
        }
    }

    pub fn into_shared(self) -> SharedWorld {
        Arc::new(RwLock::new(self))
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    // ── Sensing callbacks ─────────────────────────────────────────────────

    /// Our own position and score as reported by the environment.
    pub fn on_you(&mut self, x: f32, y: f32, score: u32) {
        self.set_position(Position::rounded(x, y));
        self.me.score = score;
    }

    /// A new static map.  Beliefs are kept; dynamic tile fields are rebuilt.
    pub fn on_map(&mut self, map: GridMap) {
        self.map = map;
        self.refresh();
    }

    pub fn on_parcels_sensing(&mut self, sensed: &[Parcel]) {
        if let Some(me) = self.me.position {
            self.parcels
                .observe(sensed, me, self.game.parcels_observation_distance);
        } else {
            self.parcels.merge(sensed);
        }
        self.refresh();
    }

    pub fn on_agents_sensing(&mut self, sensed: &[SensedAgent]) {
        let others: Vec<SensedAgent> = sensed
            .iter()
            .filter(|s| s.id != self.me.id)
            .cloned()
            .collect();
        self.agents.observe(&others, self.now);
        self.refresh();
    }

    /// Advance the revision clock; unseen third parties decay to unknown.
    pub fn advance_tick(&mut self) -> Tick {
        self.now = self.now + 1;
        self.agents
            .decay_unseen(self.now, self.unseen_timeout, self.teammate);
        self.refresh();
        self.now
    }

    /// Apply `intervals` elapsed parcel-decay intervals.
    pub fn decay_parcels(&mut self, intervals: u32) {
        let expired = self.parcels.decay(intervals);
        if !expired.is_empty() {
            trace!(agent = %self.me.id, expired = expired.len(), "parcels expired");
            self.refresh();
        }
    }

    /// Rebuild dynamic tile fields and the forecast from current beliefs.
    pub fn refresh(&mut self) {
        self.map.clear_dynamic();

        let located: Vec<(AgentId, Position)> = self.agents.located().collect();
        for &(id, pos) in &located {
            if let Some(tile) = self.map.tile_mut(pos) {
                tile.agent = Some(id);
            }
            for dy in -2..=2i32 {
                for dx in -2..=2i32 {
                    if dx.abs() + dy.abs() > 2 {
                        continue;
                    }
                    if let Some(tile) = self.map.tile_mut(Position::new(pos.x + dx, pos.y + dy)) {
                        tile.agent_heat += 1.0;
                    }
                }
            }
        }
        for parcel in self.parcels.free() {
            if let Some(tile) = self.map.tile_mut(parcel.position) {
                tile.parcel = Some(parcel.id);
            }
        }
        if let Some(me) = self.me.position {
            self.map
                .mark_seen(me, self.game.parcels_observation_distance, self.now);
        }

        self.agents.project(&self.map, self.horizon);
        self.forecast = Forecast::build(&self.map, &self.agents, self.horizon);
    }

    // ── Queries ───────────────────────────────────────────────────────────

    #[inline]
    pub fn position(&self) -> Option<Position> {
        self.me.position
    }

    /// Move ourselves (optimistically after a successful step, or from
    /// sensing).  Carried parcels move along.
    pub fn set_position(&mut self, pos: Position) {
        self.me.position = Some(pos);
        self.parcels.move_carried(self.me.id, pos);
    }

    pub fn carried(&self) -> impl Iterator<Item = &Parcel> {
        self.parcels.carried_by(self.me.id)
    }

    pub fn carried_total(&self) -> u32 {
        self.carried().map(|p| p.score).sum()
    }

    pub fn carried_count(&self) -> usize {
        self.carried().count()
    }

    #[inline]
    pub fn is_teammate(&self, id: AgentId) -> bool {
        self.teammate == Some(id)
    }

    pub fn teammate_belief(&self) -> Option<&AgentBelief> {
        self.teammate.and_then(|id| self.agents.get(id))
    }

    /// The teammate's announced pickup target, if it announced one.
    pub fn teammate_target(&self) -> Option<ParcelId> {
        self.teammate_belief()
            .filter(|b| b.intention == BelievedIntention::PickUp)
            .and_then(|b| b.announced_target)
    }

    /// Agent believed to stand on `pos` right now.
    pub fn occupant(&self, pos: Position) -> Option<AgentId> {
        self.map.tile(pos).and_then(|t| t.agent)
    }

    // ── Action bookkeeping ────────────────────────────────────────────────

    /// Record parcels we just picked up.
    pub fn record_pickup(&mut self, ids: &[ParcelId]) {
        self.parcels.mark_carried(ids, self.me.id);
        self.refresh();
    }

    /// Record parcels we just put down.  Returns the points scored (non-zero
    /// only on a delivery tile).
    pub fn record_putdown(&mut self, ids: &[ParcelId]) -> u32 {
        let Some(pos) = self.me.position else { return 0 };
        let delivered = self.map.is_delivery(pos);
        let gained: u32 = if delivered {
            ids.iter()
                .filter_map(|id| self.parcels.get(*id))
                .map(|p| p.score)
                .sum()
        } else {
            0
        };
        self.parcels.mark_dropped(ids, pos, delivered);
        self.me.score += gained;
        self.refresh();
        gained
    }
}
