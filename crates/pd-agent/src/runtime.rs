//! The `Agent` runtime.
//!
//! Sensing callbacks write into the shared world model and return at once;
//! the scheduler picks the changes up on its next revision tick.  The
//! scheduler itself sits behind an async mutex so that callbacks (which only
//! need `&self`) can run from another task while [`Agent::run`] holds it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use pd_comm::{BeliefUpdate, Comm, Role};
use pd_core::{AgentConfig, AgentId};
use pd_intent::IntentionKey;
use pd_recovery::Recovery;
use pd_sched::Scheduler;
use pd_world::{GridMap, Parcel, SensedAgent, SharedWorld};

use crate::{AgentError, AgentResult};

pub struct Agent {
    pub(crate) id:        AgentId,
    pub(crate) world:     SharedWorld,
    pub(crate) comm:      Option<Arc<Comm>>,
    pub(crate) recovery:  Arc<Recovery>,
    pub(crate) scheduler: Mutex<Scheduler>,
    pub(crate) config:    AgentConfig,
}

impl Agent {
    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn world(&self) -> &SharedWorld {
        &self.world
    }

    pub fn comm(&self) -> Option<&Comm> {
        self.comm.as_deref()
    }

    pub fn recovery(&self) -> &Recovery {
        &self.recovery
    }

    // ── Sensing callbacks ─────────────────────────────────────────────────

    /// Our own position and score.  Coordinates are rounded to the nearest
    /// tile while a move is in progress.
    pub fn on_you(&self, x: f32, y: f32, score: u32) {
        let mut w = self.world.write();
        w.on_you(x, y, score);
        w.refresh();
    }

    pub fn on_map(&self, map: GridMap) {
        self.world.write().on_map(map);
    }

    /// Update parcel beliefs and share what we saw with the teammate.
    pub async fn on_parcels_sensing(&self, sensed: &[Parcel]) {
        self.world.write().on_parcels_sensing(sensed);
        if sensed.is_empty() {
            return;
        }
        if let Some(comm) = self.comm() {
            comm.send_belief(BeliefUpdate::Parcels(sensed.to_vec())).await;
        }
    }

    pub fn on_agents_sensing(&self, sensed: &[SensedAgent]) {
        self.world.write().on_agents_sensing(sensed);
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Handshake with the teammate, waiting at most `wait`.  Solo agents
    /// return `None` immediately.
    pub async fn connect(&self, wait: Duration) -> Option<Role> {
        let comm = self.comm()?;
        let role = comm.handshake(wait).await;
        match comm.peer() {
            Some((teammate, role)) => {
                self.world.write().teammate = Some(teammate);
                info!(agent = %self.id, %teammate, ?role, "teammate connected");
            }
            None => warn!(agent = %self.id, "no teammate answered, continuing alone"),
        }
        role
    }

    /// One scheduler revision outside the run loop.  Returns the intention
    /// running afterwards.
    pub async fn revise(&self) -> AgentResult<Option<IntentionKey>> {
        let mut sched = self.scheduler.lock().await;
        sched.revise().await?;
        Ok(sched.current())
    }

    /// Connect, then run the scheduler until `shutdown`.  The running
    /// intention is stopped and awaited before this returns.
    pub async fn run(&self, shutdown: CancellationToken) -> AgentResult<()> {
        if self.world.read().position().is_none() {
            return Err(AgentError::NotPlaced(self.id));
        }
        if self.comm.is_some() {
            self.connect(Duration::from_millis(self.config.negotiation_timeout_ms)).await;
        }
        let mut sched = self.scheduler.lock().await;
        sched.run(shutdown).await?;
        debug!(agent = %self.id, score = self.world.read().me.score, "agent stopped");
        Ok(())
    }
}
