//! The `Scheduler` and its revision loop.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use pd_comm::BeliefUpdate;
use pd_core::{AgentConfig, AgentId, AgentObserver, IntentionKind, ParcelId, Tick};
use pd_intent::{Evaluation, Executor, Intention, IntentionKey, Outcome, Phase, SharedStats, evaluate};
use pd_path::Plan;
use pd_world::{BelievedIntention, SharedWorld};

use crate::{SchedResult, absorb};

/// Utilities closer than this are a tie.
pub const TIE_EPSILON: f32 = 1e-3;

/// Revision ticks an unreachable intention sits out before it is evaluated
/// again.
const UNREACHABLE_COOLDOWN: u64 = 10;

// ── Selection ─────────────────────────────────────────────────────────────────

/// The intention to run: strictly greatest utility, ties to the nearer goal,
/// never a pickup of `teammate_target`.  Evaluations without a goal are
/// skipped.
pub fn select(evals: &[Evaluation], teammate_target: Option<ParcelId>) -> Option<&Evaluation> {
    let mut best: Option<&Evaluation> = None;
    for e in evals.iter().filter(|e| eligible(e, teammate_target)) {
        best = match best {
            None => Some(e),
            Some(b) if e.utility > b.utility + TIE_EPSILON => Some(e),
            Some(b) if (e.utility - b.utility).abs() <= TIE_EPSILON && e.distance < b.distance => Some(e),
            keep => keep,
        };
    }
    best
}

fn eligible(e: &Evaluation, teammate_target: Option<ParcelId>) -> bool {
    let claimed = e.key.kind == IntentionKind::PickUp && e.key.target.is_some() && e.key.target == teammate_target;
    e.goal.is_some() && e.utility.is_finite() && !claimed
}

// ── Running intention ─────────────────────────────────────────────────────────

struct Running {
    key:   IntentionKey,
    stop:  CancellationToken,
    phase: watch::Receiver<Phase>,
    done:  oneshot::Receiver<(IntentionKey, Outcome)>,
    task:  JoinHandle<()>,
}

enum Event {
    Shutdown,
    Finished(Option<(IntentionKey, Outcome)>),
    Tick,
}

async fn completion(current: &mut Option<Running>) -> Option<(IntentionKey, Outcome)> {
    match current {
        Some(run) => (&mut run.done).await.ok(),
        None => std::future::pending().await,
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// Owns the candidate intentions and the single running one.
pub struct Scheduler {
    me:         AgentId,
    world:      SharedWorld,
    executor:   Arc<Executor>,
    stats:      SharedStats,
    config:     AgentConfig,
    observer:   Arc<dyn AgentObserver>,
    intentions: BTreeMap<IntentionKey, Intention>,
    cooldown:   BTreeMap<IntentionKey, Tick>,
    current:    Option<Running>,
    decayed_to: Instant,
}

impl Scheduler {
    /// A scheduler with the deliver and explore intentions in place.
    pub fn new(
        world:    SharedWorld,
        executor: Arc<Executor>,
        stats:    SharedStats,
        config:   AgentConfig,
        observer: Arc<dyn AgentObserver>,
    ) -> SchedResult<Self> {
        config.validate()?;
        let me = world.read().me.id;
        let intentions = [IntentionKey::deliver(), IntentionKey::explore()]
            .into_iter()
            .map(|k| (k, Intention::new(k)))
            .collect();
        Ok(Self {
            me,
            world,
            executor,
            stats,
            config,
            observer,
            intentions,
            cooldown: BTreeMap::new(),
            current: None,
            decayed_to: Instant::now(),
        })
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn current(&self) -> Option<IntentionKey> {
        self.current.as_ref().map(|r| r.key)
    }

    /// Phase of the running intention, `Idle` when none runs.
    pub fn phase(&self) -> Phase {
        self.current.as_ref().map_or(Phase::Idle, |r| *r.phase.borrow())
    }

    pub fn intentions(&self) -> impl Iterator<Item = &Intention> {
        self.intentions.values()
    }

    // ── Loop ──────────────────────────────────────────────────────────────

    /// Revise every `revision_ms` until `shutdown`, then stop the running
    /// intention and wait for it.
    pub async fn run(&mut self, shutdown: CancellationToken) -> SchedResult<()> {
        let mut tick = interval(Duration::from_millis(self.config.revision_ms));
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.cancelled() => Event::Shutdown,
                done = completion(&mut self.current) => Event::Finished(done),
                _ = tick.tick() => Event::Tick,
            };
            match event {
                Event::Shutdown => break,
                Event::Finished(done) => self.on_finished(done).await?,
                Event::Tick => self.revise().await?,
            }
        }
        self.stop_current().await?;
        debug!(agent = %self.me, "scheduler stopped");
        Ok(())
    }

    /// One revision tick.
    pub async fn revise(&mut self) -> SchedResult<()> {
        let finished = self.current.as_mut().and_then(|r| r.done.try_recv().ok());
        if finished.is_some() {
            self.on_finished(finished).await?;
        }
        self.record_phase();
        self.absorb_and_age().await;
        self.sync_intentions();

        let (evals, teammate_target) = {
            let w = self.world.read();
            let stats = self.stats.lock().clone();
            let now = w.now;
            let evals: Vec<Evaluation> = self
                .intentions
                .keys()
                .filter(|k| !self.cooldown.get(k).is_some_and(|until| now < *until))
                .map(|k| evaluate(k, &w, &stats, &self.config.utility))
                .collect();
            (evals, w.teammate_target())
        };

        if self.current.is_none() {
            self.serve_while_idle().await;
        }

        let Some(best) = select(&evals, teammate_target).cloned() else {
            trace!(agent = %self.me, "nothing worth doing");
            return Ok(());
        };
        if let Some(run) = &self.current {
            if run.key == best.key {
                return Ok(());
            }
            let held = evals
                .iter()
                .find(|e| e.key == run.key)
                .filter(|e| eligible(e, teammate_target))
                .map_or(f32::NEG_INFINITY, |e| e.utility);
            let margin = self.config.utility.switch_margin.max(TIE_EPSILON);
            if best.utility <= held + margin {
                return Ok(());
            }
            info!(agent = %self.me, from = %run.key, to = %best.key, utility = best.utility, "switching intention");
            self.stop_current().await?;
        }
        self.start(&best).await;
        Ok(())
    }

    // ── Tick bookkeeping ──────────────────────────────────────────────────

    async fn absorb_and_age(&mut self) {
        let intervals = self.elapsed_decay_intervals();
        let (teammate, updates) = match self.executor.recovery().comm() {
            Some(comm) => {
                comm.poll_handshake().await;
                (comm.teammate(), comm.drain_beliefs())
            }
            None => (None, Vec::new()),
        };
        let mut w = self.world.write();
        if teammate.is_some() {
            w.teammate = teammate;
        }
        w.advance_tick();
        w.decay_parcels(intervals);
        absorb(&mut w, updates);
    }

    /// Whole parcel-decay intervals since the last call.
    fn elapsed_decay_intervals(&mut self) -> u32 {
        let every = self.world.read().game.parcel_decay_interval_ms;
        if every == 0 {
            return 0;
        }
        let n = self.decayed_to.elapsed().as_millis() as u64 / every;
        self.decayed_to += Duration::from_millis(n * every);
        n as u32
    }

    /// One pickup intention per known free parcel; pickups whose parcel is
    /// gone are dropped unless running.
    fn sync_intentions(&mut self) {
        let (free, now): (BTreeSet<ParcelId>, Tick) = {
            let w = self.world.read();
            (w.parcels.free().map(|p| p.id).collect(), w.now)
        };
        for &id in &free {
            let key = IntentionKey::pickup(id);
            self.intentions.entry(key).or_insert_with(|| Intention::new(key));
        }
        let running = self.current();
        self.intentions.retain(|k, _| {
            k.kind != IntentionKind::PickUp
                || Some(*k) == running
                || k.target.is_some_and(|t| free.contains(&t))
        });
        self.cooldown.retain(|_, until| *until > now);
    }

    async fn serve_while_idle(&self) {
        if let Some(patch) = self.executor.recovery().serve_pending(&Plan::empty(), 0).await {
            debug!(agent = %self.me, len = patch.len(), "served request while idle");
        }
    }

    // ── Start / stop ──────────────────────────────────────────────────────

    async fn start(&mut self, eval: &Evaluation) {
        let key = eval.key;
        self.announce(key).await;

        let (done_tx, done) = oneshot::channel();
        let (phase_tx, phase) = watch::channel(Phase::Idle);
        let stop = CancellationToken::new();
        let executor = self.executor.clone();
        let token = stop.clone();
        let task = tokio::spawn(async move {
            let outcome = executor.run(key, &token, &phase_tx).await;
            let _ = done_tx.send((key, outcome));
        });

        if let Some(i) = self.intentions.get_mut(&key) {
            i.phase = Phase::Planning;
        }
        self.observer.on_intention(self.me, &key.to_string(), eval.utility);
        info!(agent = %self.me, intention = %key, utility = eval.utility, "intention started");
        self.current = Some(Running { key, stop, phase, done, task });
    }

    /// Raise the stop flag and wait for the run's completion.  The next
    /// intention may only start after this returns.
    async fn stop_current(&mut self) -> SchedResult<()> {
        let Some(run) = self.current.take() else { return Ok(()) };
        run.stop.cancel();
        let done = run.done.await.ok();
        run.task.await?;
        self.settle(run.key, done.map_or(Outcome::Stopped, |(_, o)| o));
        Ok(())
    }

    async fn on_finished(&mut self, done: Option<(IntentionKey, Outcome)>) -> SchedResult<()> {
        let Some(run) = self.current.take() else { return Ok(()) };
        run.task.await?;
        self.settle(run.key, done.map_or(Outcome::Stopped, |(_, o)| o));
        Ok(())
    }

    /// Copy the running intention's published phase onto its record.
    fn record_phase(&mut self) {
        let Some(run) = &self.current else { return };
        let phase = *run.phase.borrow();
        if phase == Phase::Idle {
            return;
        }
        if let Some(i) = self.intentions.get_mut(&run.key) {
            i.phase = phase;
        }
    }

    /// Close a run.  Deliver and explore records are reused by later runs;
    /// until then they keep the phase their last run ended in.
    fn settle(&mut self, key: IntentionKey, outcome: Outcome) {
        debug!(agent = %self.me, intention = %key, ?outcome, "intention settled");
        if outcome == Outcome::Reached && key.kind == IntentionKind::PickUp {
            self.intentions.remove(&key);
            return;
        }
        if outcome == Outcome::Unreachable {
            let now = self.world.read().now;
            self.cooldown.insert(key, now.offset(UNREACHABLE_COOLDOWN));
        }
        if let Some(i) = self.intentions.get_mut(&key) {
            i.phase = if outcome == Outcome::Reached { Phase::Reached } else { Phase::Stopped };
        }
    }

    async fn announce(&self, key: IntentionKey) {
        let Some(comm) = self.executor.recovery().comm() else { return };
        let kind = match key.kind {
            IntentionKind::PickUp => BelievedIntention::PickUp,
            IntentionKind::Deliver => BelievedIntention::Deliver,
            IntentionKind::Explore => BelievedIntention::Move,
        };
        comm.send_belief(BeliefUpdate::Intention { kind, target: key.target }).await;
    }
}
