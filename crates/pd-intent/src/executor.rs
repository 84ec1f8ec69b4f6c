//! The per-intention execution state machine.
//!
//! # Step loop
//!
//! ```text
//! plan ──► for each step:
//!            serve a pending teammate request (collaborator)
//!            stop flag / stale goal check
//!            act ──ok──► reset retries, maybe proactive replan
//!             │
//!             └─fail─► retry ≤ retry_limit ──► recovery patch ──► (empty) full replan
//! arrive ──► goal action (pickup / putdown)
//! ```
//!
//! Pickup plans carry the gathering stops of [`gather`](crate::gather).  A
//! blocked side trip is skipped rather than retried.
//!
//! Stop is cooperative.  While the planner runs, a poll loop checks the
//! token every `stop_poll_ms`; while executing, the token is checked every
//! `stop_check_every` steps.  An action in flight is never interrupted.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use pd_comm::BeliefUpdate;
use pd_core::{AgentConfig, AgentObserver, IntentionKind, Position, ReplanMode};
use pd_path::{Action, Plan, Planner, SearchMode, Step};
use pd_recovery::Recovery;
use pd_world::{Connector, SharedWorld, tracked_move, tracked_pickup, tracked_putdown};

use crate::gather::{gather_stops, is_side_trip, with_stops};
use crate::intention::{is_stale, resolve_goal};
use crate::{Goal, IntentionKey, Phase, SharedStats};

/// How one run of an intention ended.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Outcome {
    /// Goal reached and its action performed.
    Reached,
    /// The scheduler asked us to stop.
    Stopped,
    /// The goal no longer exists (parcel gone, nothing to deliver).
    Stale,
    /// No path to the goal.
    Unreachable,
}

/// Runs intentions one at a time for a single agent.
pub struct Executor {
    world:     SharedWorld,
    connector: Arc<dyn Connector>,
    planner:   Arc<dyn Planner>,
    recovery:  Arc<Recovery>,
    config:    AgentConfig,
    stats:     SharedStats,
    observer:  Arc<dyn AgentObserver>,
}

impl Executor {
    pub fn new(
        world:     SharedWorld,
        connector: Arc<dyn Connector>,
        planner:   Arc<dyn Planner>,
        recovery:  Arc<Recovery>,
        config:    AgentConfig,
        stats:     SharedStats,
        observer:  Arc<dyn AgentObserver>,
    ) -> Self {
        Self { world, connector, planner, recovery, config, stats, observer }
    }

    pub fn recovery(&self) -> &Recovery {
        &self.recovery
    }

    /// Run `key` to completion, publishing lifecycle changes on `phase`.
    pub async fn run(&self, key: IntentionKey, stop: &CancellationToken, phase: &watch::Sender<Phase>) -> Outcome {
        phase.send_replace(Phase::Planning);
        let outcome = self.drive(key, stop, phase).await;
        phase.send_replace(match outcome {
            Outcome::Reached => Phase::Reached,
            _ => Phase::Stopped,
        });
        debug!(intention = %key, ?outcome, "intention finished");
        outcome
    }

    async fn drive(&self, key: IntentionKey, stop: &CancellationToken, phase: &watch::Sender<Phase>) -> Outcome {
        let (mut plan, goal) = match self.plan_to(key, stop).await {
            Ok(planned) => planned,
            Err(outcome) => return outcome,
        };
        phase.send_replace(Phase::Executing);

        let stop_every = self.config.stop_check_every.max(1);
        let movement = Duration::from_millis(self.connector.game_config().movement_ms);
        let backoff = Duration::from_millis(self.config.retry_backoff_ms);
        let mut idx = 1;
        let mut retries = 0u32;
        let mut moves = 0u32;
        let mut steps = 0u32;

        loop {
            if idx >= plan.len() {
                let here = self.world.read().position();
                if here.is_some_and(|h| goal.contains(h)) {
                    return self.arrive(key).await;
                }
                trace!(intention = %key, "plan ended off goal");
                match self.plan_to(key, stop).await {
                    Ok((fresh, _)) => {
                        plan = fresh;
                        idx = 1;
                        continue;
                    }
                    Err(outcome) => return outcome,
                }
            }

            if let Some(patch) = self.recovery.serve_pending(&plan, idx).await {
                match self.adopt_or_replan(key, stop, patch).await {
                    Ok(next) => plan = next,
                    Err(outcome) => return outcome,
                }
                idx = 1;
                retries = 0;
                continue;
            }

            steps += 1;
            if steps % stop_every == 0 && stop.is_cancelled() {
                return Outcome::Stopped;
            }
            let stale = is_stale(&key, &self.world.read());
            if stale {
                return Outcome::Stale;
            }

            let step = plan.steps()[idx];
            match step.action {
                Action::None => idx += 1,
                Action::Wait => {
                    sleep(movement).await;
                    idx += 1;
                }
                Action::PickUp => {
                    let ids = tracked_pickup(self.connector.as_ref(), &self.world).await;
                    self.gossip_carrying().await;
                    debug!(intention = %key, picked = ids.len(), "pickup step");
                    idx += 1;
                }
                Action::PutDown => {
                    let (ids, gained) = tracked_putdown(self.connector.as_ref(), &self.world).await;
                    self.gossip_carrying().await;
                    debug!(intention = %key, dropped = ids.len(), gained, "putdown step");
                    idx += 1;
                }
                action => {
                    let Some(dir) = action.direction() else {
                        idx += 1;
                        continue;
                    };
                    let started = Instant::now();
                    match tracked_move(self.connector.as_ref(), &self.world, dir).await {
                        Some(pos) => {
                            self.stats.lock().record_step(started.elapsed());
                            if let Some(comm) = self.recovery.comm() {
                                comm.send_belief(BeliefUpdate::Position(pos)).await;
                            }
                            retries = 0;
                            idx += 1;
                            moves += 1;
                            let every = self.config.replan_every;
                            if every > 0 && moves % every == 0 && idx < plan.len() {
                                if let Some(next) = self.proactive_replan(key, stop, &plan, idx, pos).await {
                                    plan = next;
                                    idx = 1;
                                }
                            }
                        }
                        None if is_side_trip(&plan, idx) => {
                            debug!(intention = %key, idx, side = %step.position, "side trip blocked, skipped");
                            retries = 0;
                            idx += 3;
                        }
                        None => {
                            retries += 1;
                            if retries <= self.config.retry_limit {
                                trace!(intention = %key, idx, retries, "step failed, retrying");
                                sleep(backoff).await;
                                continue;
                            }
                            retries = 0;
                            debug!(intention = %key, idx, blocked = %step.position, "step keeps failing");
                            let patch = self.recovery.recover(idx, &plan, key.kind).await;
                            match self.adopt_or_replan(key, stop, patch).await {
                                Ok(next) => plan = next,
                                Err(outcome) => return outcome,
                            }
                            idx = 1;
                        }
                    }
                }
            }
        }
    }

    // ── Planning ──────────────────────────────────────────────────────────

    /// Plan from where we stand to the goal of `key`, polling `stop` while the
    /// planner runs.
    async fn plan_to(&self, key: IntentionKey, stop: &CancellationToken) -> Result<(Plan, Goal), Outcome> {
        let (here, goal) = {
            let w = self.world.read();
            (w.position(), resolve_goal(&key, &w))
        };
        let Some(goal) = goal else { return Err(Outcome::Stale) };
        let Some(here) = here else { return Err(Outcome::Unreachable) };
        if goal.contains(here) {
            return Ok((Plan::stay(here), goal));
        }

        let started = Instant::now();
        let plan = {
            let mut planning = self.planner.plan(&self.world, here, goal.positions(), SearchMode::Chain);
            let mut poll = interval(Duration::from_millis(self.config.stop_poll_ms));
            poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    plan = &mut planning => break plan,
                    _ = poll.tick() => {
                        if stop.is_cancelled() {
                            debug!(intention = %key, "stopped while planning");
                            return Err(Outcome::Stopped);
                        }
                    }
                }
            }
        };
        self.stats.lock().record_latency(started.elapsed());

        if plan.is_trivial() {
            debug!(intention = %key, %here, "no path to goal");
            return Err(Outcome::Unreachable);
        }
        let plan = match (key.kind, &goal) {
            (IntentionKind::PickUp, Goal::Tile(target)) => {
                let stops = gather_stops(&self.world.read(), &plan, *target);
                if !stops.is_empty() {
                    debug!(intention = %key, stops = stops.len(), "gathering on the way");
                }
                with_stops(&plan, &stops)
            }
            _ => plan,
        };
        self.publish(&plan).await;
        Ok((plan, goal))
    }

    /// Adopt a recovery patch, or replan fully when it is empty.
    async fn adopt_or_replan(&self, key: IntentionKey, stop: &CancellationToken, patch: Plan) -> Result<Plan, Outcome> {
        if !patch.is_trivial() {
            self.publish(&patch).await;
            return Ok(patch);
        }
        self.plan_to(key, stop).await.map(|(plan, _)| plan)
    }

    /// Hard or soft replan after `replan_every` moves.  `None` keeps the
    /// current plan.
    async fn proactive_replan(
        &self,
        key:  IntentionKey,
        stop: &CancellationToken,
        plan: &Plan,
        idx:  usize,
        here: Position,
    ) -> Option<Plan> {
        if !is_pure_path(plan.tail(idx)) {
            return None;
        }
        match self.config.replan_mode {
            ReplanMode::Off => None,
            ReplanMode::Hard => {
                trace!(intention = %key, "hard replan");
                self.plan_to(key, stop).await.ok().map(|(p, _)| p)
            }
            ReplanMode::Soft => {
                let end = plan.end()?;
                trace!(intention = %key, %end, "soft replan");
                let mode = SearchMode::TimeExpanded { max_len: None };
                let tail = self.planner.plan(&self.world, here, &[end], mode).await;
                if tail.is_trivial() {
                    return None;
                }
                self.publish(&tail).await;
                Some(tail)
            }
        }
    }

    /// Show `plan` to the observer and announce it to the teammate.
    async fn publish(&self, plan: &Plan) {
        let positions = plan.positions();
        let me = self.world.read().me.id;
        self.observer.on_plan(me, &positions);
        if let Some(comm) = self.recovery.comm() {
            comm.send_belief(BeliefUpdate::Path(positions)).await;
        }
    }

    // ── Goal actions ──────────────────────────────────────────────────────

    async fn arrive(&self, key: IntentionKey) -> Outcome {
        match key.kind {
            IntentionKind::PickUp => {
                let ids = tracked_pickup(self.connector.as_ref(), &self.world).await;
                if ids.is_empty() {
                    return Outcome::Stale;
                }
                self.gossip_carrying().await;
                info!(intention = %key, picked = ids.len(), "picked up");
                Outcome::Reached
            }
            IntentionKind::Deliver => {
                let (ids, gained) = tracked_putdown(self.connector.as_ref(), &self.world).await;
                if ids.is_empty() {
                    return Outcome::Stale;
                }
                self.gossip_carrying().await;
                info!(intention = %key, delivered = ids.len(), gained, "delivered");
                Outcome::Reached
            }
            IntentionKind::Explore => Outcome::Reached,
        }
    }

    async fn gossip_carrying(&self) {
        let Some(comm) = self.recovery.comm() else { return };
        let carrying = self.world.read().carried_count() > 0;
        comm.send_belief(BeliefUpdate::Carrying(carrying)).await;
    }
}

/// Only moves and waits: safe to replace with a fresh search.
fn is_pure_path(steps: &[Step]) -> bool {
    steps
        .iter()
        .all(|s| s.action.is_move() || matches!(s.action, Action::Wait | Action::None))
}
