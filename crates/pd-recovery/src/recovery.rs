//! Recovery entry point.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::sleep;
use tracing::debug;

use pd_comm::{BeliefUpdate, Comm, Role};
use pd_core::{AgentConfig, AgentObserver, AgentRng, IntentionKind, Position};
use pd_path::{Plan, Planner, SearchMode};
use pd_world::{Connector, SharedWorld, tracked_move};

/// Everything recovery needs to act.  One per agent, shared by reference with
/// the executor.
pub struct Recovery {
    pub(crate) world:     SharedWorld,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) planner:   Arc<dyn Planner>,
    pub(crate) comm:      Option<Arc<Comm>>,
    pub(crate) config:    AgentConfig,
    pub(crate) observer:  Arc<dyn AgentObserver>,
    rng:                  Mutex<AgentRng>,
}

impl Recovery {
    pub fn new(
        world:     SharedWorld,
        connector: Arc<dyn Connector>,
        planner:   Arc<dyn Planner>,
        comm:      Option<Arc<Comm>>,
        config:    AgentConfig,
        observer:  Arc<dyn AgentObserver>,
    ) -> Self {
        let me = world.read().me.id;
        let rng = Mutex::new(AgentRng::new(config.seed, me));
        Self { world, connector, planner, comm, config, observer, rng }
    }

    pub fn comm(&self) -> Option<&Comm> {
        self.comm.as_deref()
    }

    /// Produce a patch for `plan` whose step `failed` could not be executed.
    ///
    /// Always terminates: every wait inside is bounded by configuration.
    pub async fn recover(&self, failed: usize, plan: &Plan, kind: IntentionKind) -> Plan {
        let Some(blocked) = plan.get(failed).map(|s| s.position) else {
            return Plan::empty();
        };
        let (me, here, occupant) = {
            let w = self.world.read();
            (w.me.id, w.position(), w.occupant(blocked))
        };
        let Some(here) = here else { return Plan::empty() };
        debug!(agent = %me, failed, %blocked, ?occupant, %kind, "recovery started");

        let patch = match (occupant, self.comm()) {
            (Some(id), Some(comm)) if comm.teammate() == Some(id) => match comm.role() {
                Some(Role::Master) => self.negotiate(comm, failed, plan, kind, here, blocked).await,
                _ => self.await_and_serve(comm, plan, failed).await,
            },
            _ => self.around_unknown(failed, plan, here, blocked).await,
        };

        debug!(agent = %me, len = patch.len(), "recovery finished");
        patch
    }

    /// Collaborator side of a standoff: wait for the master's request.
    async fn await_and_serve(&self, comm: &Comm, plan: &Plan, idx: usize) -> Plan {
        match comm.await_request(comm.timeout()).await {
            Some(incoming) => self.serve(incoming, plan, idx).await,
            None => Plan::empty(),
        }
    }

    /// Serve a request that arrived while executing, if any.  `None` when no
    /// request is pending or we are not the collaborator.
    pub async fn serve_pending(&self, plan: &Plan, idx: usize) -> Option<Plan> {
        let comm = self.comm()?;
        if comm.role() != Some(Role::Collaborator) {
            return None;
        }
        let incoming = comm.try_request().await?;
        Some(self.serve(incoming, plan, idx).await)
    }

    /// The blocker is not our teammate: wait a jittered moment, then resume,
    /// detour or give up.
    async fn around_unknown(&self, failed: usize, plan: &Plan, here: Position, blocked: Position) -> Plan {
        let wait_ms = self
            .rng
            .lock()
            .gen_range(self.config.unknown_wait_min_ms..=self.config.unknown_wait_max_ms);
        sleep(Duration::from_millis(wait_ms)).await;

        let cleared = self.world.read().occupant(blocked).is_none();
        if cleared {
            debug!(%blocked, wait_ms, "blocker left, resuming");
            return Plan::resume_from(here, plan.tail(failed));
        }

        let Some(rejoin) = plan.get(failed + 1).map(|s| s.position) else {
            return Plan::empty();
        };
        let mode = SearchMode::Detour { blocked, max_len: self.config.detour_max_len };
        let detour = self.planner.plan(&self.world, here, &[rejoin], mode).await;
        if detour.is_trivial() {
            debug!(%blocked, "no short detour");
            return Plan::empty();
        }
        debug!(%blocked, len = detour.len(), "detour");
        detour.then(plan.tail(failed + 2))
    }

    // ── Shared actions ────────────────────────────────────────────────────

    /// Step onto the adjacent tile `to` and tell the teammate.
    pub(crate) async fn step_to(&self, from: Position, to: Position) -> bool {
        let Some(dir) = from.direction_to(to) else { return false };
        match tracked_move(self.connector.as_ref(), &self.world, dir).await {
            Some(pos) => {
                if let Some(comm) = self.comm() {
                    comm.send_belief(BeliefUpdate::Position(pos)).await;
                }
                true
            }
            None => false,
        }
    }

    pub(crate) fn negotiation_timeout(&self) -> Duration {
        Duration::from_millis(self.config.negotiation_timeout_ms)
    }
}
