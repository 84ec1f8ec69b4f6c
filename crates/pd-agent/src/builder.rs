//! Fluent builder for constructing an [`Agent`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use pd_comm::{Comm, Mailbox, Transport};
use pd_core::{AgentConfig, AgentId, AgentObserver, NoopObserver, Position};
use pd_intent::{Executor, PlanningStats};
use pd_path::{GridPlanner, Planner};
use pd_recovery::Recovery;
use pd_sched::Scheduler;
use pd_world::{Connector, GridMap, WorldModel};

use crate::{Agent, AgentResult};

/// Fluent builder for [`Agent`].
///
/// # Required inputs
///
/// - [`AgentId`] — stable across the session; the smaller id of a pair
///   becomes the negotiation master
/// - [`GridMap`] — the static map
/// - a [`Connector`], passed to [`build`](Self::build); its `game_config()`
///   supplies movement and decay timing
///
/// # Optional inputs (have defaults)
///
/// | Method              | Default                                  |
/// |---------------------|------------------------------------------|
/// | `.config(c)`        | `AgentConfig::default()`                 |
/// | `.planner(p)`       | `GridPlanner::new(config.max_waits)`     |
/// | `.observer(o)`      | `NoopObserver`                           |
/// | `.link(t, inbox)`   | none: the agent plays solo               |
/// | `.position(p)`      | unknown until the first `on_you`         |
pub struct AgentBuilder {
    id:       AgentId,
    map:      GridMap,
    config:   AgentConfig,
    planner:  Option<Arc<dyn Planner>>,
    observer: Option<Arc<dyn AgentObserver>>,
    link:     Option<(Arc<dyn Transport>, Arc<Mailbox>)>,
    position: Option<Position>,
}

impl AgentBuilder {
    pub fn new(id: AgentId, map: GridMap) -> Self {
        Self {
            id,
            map,
            config:   AgentConfig::default(),
            planner:  None,
            observer: None,
            link:     None,
            position: None,
        }
    }

    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the built-in planner (e.g. with an external solver).
    pub fn planner(mut self, planner: Arc<dyn Planner>) -> Self {
        self.planner = Some(planner);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn AgentObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Connect to a teammate: `transport` sends, `inbox` receives.
    pub fn link(mut self, transport: Arc<dyn Transport>, inbox: Arc<Mailbox>) -> Self {
        self.link = Some((transport, inbox));
        self
    }

    pub fn position(mut self, pos: Position) -> Self {
        self.position = Some(pos);
        self
    }

    /// Validate the configuration and wire every component.
    pub fn build(self, connector: Arc<dyn Connector>) -> AgentResult<Agent> {
        self.config.validate()?;
        let config = self.config;
        let game = connector.game_config();
        let observer = self.observer.unwrap_or_else(|| Arc::new(NoopObserver) as Arc<dyn AgentObserver>);
        let planner = self
            .planner
            .unwrap_or_else(|| Arc::new(GridPlanner::new(config.max_waits)) as Arc<dyn Planner>);

        // ── World ─────────────────────────────────────────────────────────
        let mut world = WorldModel::new(self.id, self.map, game.clone(), &config);
        if let Some(pos) = self.position {
            world.set_position(pos);
        }
        world.refresh();
        let world = world.into_shared();

        // ── Comm and recovery ─────────────────────────────────────────────
        let timeout = Duration::from_millis(config.negotiation_timeout_ms);
        let comm = self
            .link
            .map(|(transport, inbox)| Arc::new(Comm::new(self.id, transport, inbox, timeout, observer.clone())));
        let recovery = Arc::new(Recovery::new(
            world.clone(),
            connector.clone(),
            planner.clone(),
            comm.clone(),
            config.clone(),
            observer.clone(),
        ));

        // ── Execution and scheduling ──────────────────────────────────────
        let stats = PlanningStats::new(&game, &config.utility).into_shared();
        let executor = Arc::new(Executor::new(
            world.clone(),
            connector,
            planner,
            recovery.clone(),
            config.clone(),
            stats.clone(),
            observer.clone(),
        ));
        let scheduler = Scheduler::new(world.clone(), executor, stats, config.clone(), observer)?;

        Ok(Agent {
            id: self.id,
            world,
            comm,
            recovery,
            scheduler: Mutex::new(scheduler),
            config,
        })
    }
}
