//! Unit tests for pd-intent.

#[cfg(test)]
mod helpers {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use pd_core::{AgentConfig, AgentId, AgentObserver, Direction, GameConfig, NoopObserver, ParcelId, Position, Tick};
    use pd_path::GridPlanner;
    use pd_recovery::Recovery;
    use pd_world::{Connector, GridMapBuilder, Parcel, SharedWorld, WorldModel};

    use crate::{Executor, PlanningStats};

    /// Accepts every move except the next `reject` ones and any in a
    /// `refuse`d direction.
    #[derive(Default)]
    pub struct Stub {
        pub moves:  Mutex<Vec<Direction>>,
        pub reject: AtomicU32,
        pub refuse: Mutex<Vec<Direction>>,
        /// Picked up wherever we stand.
        pub ground: Mutex<Vec<ParcelId>>,
        /// Picked up only on their tile; needs `at`.
        pub lying:  Mutex<Vec<(ParcelId, Position)>>,
        pub at:     Mutex<Option<Position>>,
        pub held:   Mutex<Vec<ParcelId>>,
    }

    #[async_trait]
    impl Connector for Stub {
        async fn move_to(&self, dir: Direction) -> bool {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if self.refuse.lock().contains(&dir) {
                return false;
            }
            let pending = self.reject.load(Ordering::Relaxed);
            if pending > 0 {
                self.reject.store(pending - 1, Ordering::Relaxed);
                return false;
            }
            self.moves.lock().push(dir);
            if let Some(at) = self.at.lock().as_mut() {
                *at = at.step(dir);
            }
            true
        }

        async fn pickup(&self) -> Vec<ParcelId> {
            let mut got: Vec<ParcelId> = self.ground.lock().drain(..).collect();
            if let Some(here) = *self.at.lock() {
                self.lying.lock().retain(|&(id, pos)| {
                    let take = pos == here;
                    if take {
                        got.push(id);
                    }
                    !take
                });
            }
            self.held.lock().extend(got.iter().copied());
            got
        }

        async fn putdown(&self) -> Vec<ParcelId> {
            self.held.lock().drain(..).collect()
        }

        fn game_config(&self) -> GameConfig {
            GameConfig::default()
        }
    }

    /// Records every published plan.
    #[derive(Default)]
    pub struct Plans(pub Mutex<Vec<Vec<Position>>>);

    impl AgentObserver for Plans {
        fn on_plan(&self, _agent: AgentId, plan: &[Position]) {
            self.0.lock().push(plan.to_vec());
        }
    }

    pub fn p(x: i32, y: i32) -> Position {
        Position::new(x, y)
    }

    pub fn config() -> AgentConfig {
        AgentConfig { retry_backoff_ms: 10, replan_every: 0, ..Default::default() }
    }

    /// One row, delivery at the left end.
    pub const ROW: [&str; 1] = ["D....."];

    /// One row of open tiles above [`ROW`].
    pub const SIDE: [&str; 2] = ["......", "D....."];

    pub fn world(rows: &[&str], at: Position) -> WorldModel {
        world_as(1, rows, at)
    }

    pub fn world_as(me: u32, rows: &[&str], at: Position) -> WorldModel {
        let map = GridMapBuilder::from_rows(rows).unwrap().build();
        let mut w = WorldModel::new(AgentId(me), map, GameConfig::default(), &config());
        w.set_position(at);
        w.refresh();
        w
    }

    pub fn drop_parcel(w: &mut WorldModel, id: u32, at: Position, score: u32) {
        w.on_parcels_sensing(&[Parcel::new(ParcelId(id), at, score)]);
    }

    pub fn place(w: &mut WorldModel, id: u32, at: Position) {
        w.agents.set_position(AgentId(id), at, Tick::ZERO);
        w.refresh();
    }

    pub fn stats() -> PlanningStats {
        PlanningStats::new(&GameConfig::default(), &AgentConfig::default().utility)
    }

    pub fn executor(world: SharedWorld) -> (Executor, Arc<Stub>) {
        executor_with(world, config(), Arc::new(NoopObserver))
    }

    pub fn executor_with(
        world:    SharedWorld,
        config:   AgentConfig,
        observer: Arc<dyn AgentObserver>,
    ) -> (Executor, Arc<Stub>) {
        let stub = Arc::new(Stub::default());
        let planner = Arc::new(GridPlanner::new(2));
        let recovery = Arc::new(Recovery::new(
            world.clone(),
            stub.clone(),
            planner.clone(),
            None,
            config.clone(),
            observer.clone(),
        ));
        let exec = Executor::new(world, stub.clone(), planner, recovery, config, stats().into_shared(), observer);
        (exec, stub)
    }
}

// ── Utility ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod utility {
    use std::time::Duration;

    use pd_core::{AgentId, GameConfig, ParcelId, UtilityParams};

    use super::helpers::{ROW, SIDE, drop_parcel, p, place, stats, world, world_as};
    use crate::{Goal, IntentionKey, PlanningStats, evaluate, explore_goal};

    fn pickup_utility(score: u32) -> f32 {
        let mut w = world(&ROW, p(5, 0));
        drop_parcel(&mut w, 1, p(2, 0), score);
        evaluate(&IntentionKey::pickup(ParcelId(1)), &w, &stats(), &UtilityParams::default()).utility
    }

    #[test]
    fn pickup_drops_strictly_with_parcel_score() {
        // 3 hops to the parcel, 2 more to delivery, 2 moves per decay point.
        assert_eq!(pickup_utility(10), 7.5);
        assert!(pickup_utility(9) < pickup_utility(10));
        assert!(pickup_utility(2) <= 0.0);
    }

    #[test]
    fn parcels_along_the_route_add_to_gain() {
        let mut w = world(&ROW, p(5, 0));
        w.on_parcels_sensing(&[
            pd_world::Parcel::new(ParcelId(1), p(2, 0), 10),
            pd_world::Parcel::new(ParcelId(2), p(4, 0), 4),
        ]);
        let e = evaluate(&IntentionKey::pickup(ParcelId(1)), &w, &stats(), &UtilityParams::default());
        // gain 14, two parcels to carry for 2.5 decay units each.
        assert_eq!(e.utility, 9.0);
        assert_eq!(e.goal, Some(Goal::Tile(p(2, 0))));
        assert_eq!(e.distance, 3);
    }

    #[test]
    fn closer_teammate_zeroes_pickup() {
        let mut w = world(&ROW, p(5, 0));
        drop_parcel(&mut w, 1, p(2, 0), 10);
        w.teammate = Some(AgentId(2));
        place(&mut w, 2, p(1, 0));
        let e = evaluate(&IntentionKey::pickup(ParcelId(1)), &w, &stats(), &UtilityParams::default());
        assert_eq!(e.utility, 0.0);
    }

    #[test]
    fn side_parcels_cost_a_round_trip() {
        let mut w = world(&SIDE, p(5, 0));
        w.on_parcels_sensing(&[
            pd_world::Parcel::new(ParcelId(1), p(2, 0), 10),
            pd_world::Parcel::new(ParcelId(2), p(4, 1), 4),
        ]);
        let e = evaluate(&IntentionKey::pickup(ParcelId(1)), &w, &stats(), &UtilityParams::default());
        // gain 14; 3 hops, 2 out and back, 2 to delivery: 3.5 units for two parcels.
        assert_eq!(e.utility, 7.0);
    }

    #[test]
    fn equal_distance_teammate_tie_goes_to_the_smaller_id() {
        let pickup = |me: u32, mate: u32| {
            let mut w = world_as(me, &["D......."], p(7, 0));
            drop_parcel(&mut w, 1, p(4, 0), 10);
            w.teammate = Some(AgentId(mate));
            place(&mut w, mate, p(1, 0));
            evaluate(&IntentionKey::pickup(ParcelId(1)), &w, &stats(), &UtilityParams::default()).utility
        };
        assert_eq!(pickup(1, 2), 6.5);
        assert_eq!(pickup(2, 1), 0.0);
    }

    #[test]
    fn closer_stranger_caps_pickup() {
        let mut w = world(&ROW, p(5, 0));
        drop_parcel(&mut w, 1, p(2, 0), 10);
        place(&mut w, 3, p(1, 0));
        let u = evaluate(&IntentionKey::pickup(ParcelId(1)), &w, &stats(), &UtilityParams::default()).utility;
        // contested_factor 0.1 · gain 10 / (1 + advantage 2)
        assert!(u > 0.0 && u < 0.34, "{u}");
    }

    #[test]
    fn farther_stranger_is_ignored() {
        let mut w = world(&["D......."], p(3, 0));
        drop_parcel(&mut w, 1, p(2, 0), 10);
        place(&mut w, 3, p(7, 0));
        let u = evaluate(&IntentionKey::pickup(ParcelId(1)), &w, &stats(), &UtilityParams::default()).utility;
        assert!(u > 5.0);
    }

    #[test]
    fn deliver_is_zero_when_empty_handed() {
        let w = world(&ROW, p(5, 0));
        let e = evaluate(&IntentionKey::deliver(), &w, &stats(), &UtilityParams::default());
        assert_eq!(e.utility, 0.0);
        assert!(e.goal.is_none());
    }

    #[test]
    fn deliver_counts_carried_score_minus_decay() {
        let mut w = world(&ROW, p(5, 0));
        drop_parcel(&mut w, 1, p(5, 0), 10);
        w.record_pickup(&[ParcelId(1)]);
        let e = evaluate(&IntentionKey::deliver(), &w, &stats(), &UtilityParams::default());
        assert_eq!(e.utility, 7.5);
        assert_eq!(e.distance, 5);
    }

    #[test]
    fn vanished_parcel_is_worthless() {
        let w = world(&ROW, p(5, 0));
        let e = evaluate(&IntentionKey::pickup(ParcelId(9)), &w, &stats(), &UtilityParams::default());
        assert_eq!(e.utility, f32::NEG_INFINITY);
    }

    #[test]
    fn explore_has_fixed_utility_and_goes_far() {
        let w = world(&["...", "...", "..."], p(0, 0));
        assert_eq!(explore_goal(&w), Some(p(2, 2)));
        let e = evaluate(&IntentionKey::explore(), &w, &stats(), &UtilityParams::default());
        assert_eq!(e.utility, UtilityParams::default().explore_utility);
    }

    #[test]
    fn stats_track_latency_and_steps() {
        let mut s = stats();
        assert_eq!(s.moves_per_decay(), 2.0);
        s.record_latency(Duration::from_millis(100));
        assert!((s.latency_ms() - 20.0).abs() < 1e-3);
        assert!(s.decay_units(4) > 2.0);

        let frozen = PlanningStats::new(
            &GameConfig { parcel_decay_interval_ms: 0, ..GameConfig::default() },
            &UtilityParams::default(),
        );
        assert_eq!(frozen.decay_units(100), 0.0);
    }
}

// ── Gathering ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod gather {
    use pd_core::{AgentId, ParcelId, Tick};
    use pd_path::{Action, Plan};
    use pd_world::{BelievedIntention, Parcel};

    use super::helpers::{SIDE, p, place, world};
    use crate::gather::is_side_trip;
    use crate::{gather_stops, with_stops};

    fn route() -> Plan {
        Plan::from_positions(&[p(5, 0), p(4, 0), p(3, 0), p(2, 0)])
    }

    #[test]
    fn stops_are_spliced_in_route_order() {
        let mut w = world(&SIDE, p(5, 0));
        w.on_parcels_sensing(&[
            Parcel::new(ParcelId(1), p(2, 0), 10),
            Parcel::new(ParcelId(2), p(4, 1), 4),
            Parcel::new(ParcelId(3), p(3, 0), 5),
        ]);
        let stops = gather_stops(&w, &route(), p(2, 0));
        let found: Vec<_> = stops.iter().map(|s| (s.at, s.tile, s.score)).collect();
        assert_eq!(found, vec![(1, p(4, 1), 4), (2, p(3, 0), 5)]);
        assert!(stops[0].is_side_trip(&route()));
        assert!(!stops[1].is_side_trip(&route()));

        let plan = with_stops(&route(), &stops);
        let actions: Vec<Action> = plan.steps().iter().map(|s| s.action).collect();
        use Action::*;
        assert_eq!(actions, vec![None, Left, Up, PickUp, Down, Left, PickUp, Left]);
        assert_eq!(plan.end(), Some(p(2, 0)));
        assert!(is_side_trip(&plan, 2));
        assert!(!is_side_trip(&plan, 1));
        assert!(!is_side_trip(&plan, 5));
    }

    #[test]
    fn occupied_or_claimed_tiles_are_left_alone() {
        let mut w = world(&SIDE, p(5, 0));
        w.on_parcels_sensing(&[
            Parcel::new(ParcelId(1), p(2, 0), 10),
            Parcel::new(ParcelId(2), p(4, 1), 4),
            Parcel::new(ParcelId(3), p(3, 1), 6),
        ]);
        place(&mut w, 7, p(4, 1));
        w.teammate = Some(AgentId(2));
        place(&mut w, 2, p(0, 1));
        w.agents.announce(AgentId(2), BelievedIntention::PickUp, Some(ParcelId(3)), Tick::ZERO);
        assert!(gather_stops(&w, &route(), p(2, 0)).is_empty());
    }
}

// ── Executor ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod executor {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use tokio::sync::watch;
    use tokio_util::sync::CancellationToken;

    use pd_core::{AgentConfig, Direction, ParcelId, Position, ReplanMode};
    use pd_world::Parcel;

    use super::helpers::{Plans, ROW, SIDE, config, drop_parcel, executor, executor_with, p, world};
    use crate::{IntentionKey, Outcome, Phase};

    #[tokio::test(start_paused = true)]
    async fn picks_up_then_delivers() {
        let mut w = world(&ROW, p(5, 0));
        drop_parcel(&mut w, 1, p(2, 0), 10);
        let w = w.into_shared();
        let (exec, stub) = executor(w.clone());
        stub.ground.lock().push(ParcelId(1));

        let (phase, watcher) = watch::channel(Phase::Idle);
        let stop = CancellationToken::new();
        assert_eq!(exec.run(IntentionKey::pickup(ParcelId(1)), &stop, &phase).await, Outcome::Reached);
        assert_eq!(*watcher.borrow(), Phase::Reached);
        assert_eq!(w.read().carried_count(), 1);
        assert_eq!(*stub.moves.lock(), vec![Direction::Left; 3]);

        assert_eq!(exec.run(IntentionKey::deliver(), &stop, &phase).await, Outcome::Reached);
        let g = w.read();
        assert_eq!(g.position(), Some(p(0, 0)));
        assert_eq!(g.me.score, 10);
        assert_eq!(g.carried_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_first_action_takes_none() {
        let w = world(&ROW, p(5, 0)).into_shared();
        let (exec, stub) = executor(w);
        let stop = CancellationToken::new();
        stop.cancel();
        let (phase, watcher) = watch::channel(Phase::Idle);
        assert_eq!(exec.run(IntentionKey::explore(), &stop, &phase).await, Outcome::Stopped);
        assert_eq!(*watcher.borrow(), Phase::Stopped);
        assert!(stub.moves.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn vanished_target_is_stale() {
        let w = world(&ROW, p(5, 0)).into_shared();
        let (exec, _) = executor(w);
        let (phase, _watcher) = watch::channel(Phase::Idle);
        let out = exec.run(IntentionKey::pickup(ParcelId(4)), &CancellationToken::new(), &phase).await;
        assert_eq!(out, Outcome::Stale);
    }

    #[tokio::test(start_paused = true)]
    async fn walled_off_target_is_unreachable() {
        let mut w = world(&[".#."], p(2, 0));
        drop_parcel(&mut w, 1, p(0, 0), 10);
        let (exec, stub) = executor(w.into_shared());
        let (phase, _watcher) = watch::channel(Phase::Idle);
        let out = exec.run(IntentionKey::pickup(ParcelId(1)), &CancellationToken::new(), &phase).await;
        assert_eq!(out, Outcome::Unreachable);
        assert!(stub.moves.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_is_retried() {
        let w = world(&ROW, p(3, 0)).into_shared();
        let (exec, stub) = executor(w.clone());
        stub.reject.store(2, Ordering::Relaxed);
        let (phase, _watcher) = watch::channel(Phase::Idle);
        let out = exec.run(IntentionKey::explore(), &CancellationToken::new(), &phase).await;
        assert_eq!(out, Outcome::Reached);
        assert_eq!(w.read().position(), Some(p(0, 0)));
        assert_eq!(stub.moves.lock().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn parcel_taken_midway_goes_stale() {
        let mut w = world(&ROW, p(5, 0));
        drop_parcel(&mut w, 1, p(0, 0), 10);
        let w = w.into_shared();
        let (exec, stub) = executor(w.clone());
        stub.ground.lock().push(ParcelId(1));

        let (phase, mut watcher) = watch::channel(Phase::Idle);
        let stop = CancellationToken::new();
        let run = exec.run(IntentionKey::pickup(ParcelId(1)), &stop, &phase);
        let thief = async {
            watcher.wait_for(|ph| *ph == Phase::Executing).await.unwrap();
            w.write().parcels.remove(ParcelId(1));
        };
        let (out, _) = tokio::join!(run, thief);
        assert_eq!(out, Outcome::Stale);
    }

    fn side_parcel_world() -> pd_world::SharedWorld {
        let mut w = world(&SIDE, p(5, 0));
        w.on_parcels_sensing(&[
            Parcel::new(ParcelId(1), p(2, 0), 10),
            Parcel::new(ParcelId(2), p(4, 1), 4),
        ]);
        w.into_shared()
    }

    #[tokio::test(start_paused = true)]
    async fn side_parcel_is_collected_on_the_way() {
        let w = side_parcel_world();
        let (exec, stub) = executor(w.clone());
        *stub.at.lock() = Some(p(5, 0));
        stub.lying.lock().extend([(ParcelId(1), p(2, 0)), (ParcelId(2), p(4, 1))]);

        let (phase, _watcher) = watch::channel(Phase::Idle);
        let out = exec.run(IntentionKey::pickup(ParcelId(1)), &CancellationToken::new(), &phase).await;
        assert_eq!(out, Outcome::Reached);
        let (l, u, d) = (Direction::Left, Direction::Up, Direction::Down);
        assert_eq!(*stub.moves.lock(), vec![l, u, d, l, l]);
        assert_eq!(*stub.held.lock(), vec![ParcelId(2), ParcelId(1)]);
        assert_eq!(w.read().carried_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_side_trip_is_skipped() {
        let w = side_parcel_world();
        let (exec, stub) = executor(w.clone());
        *stub.at.lock() = Some(p(5, 0));
        stub.lying.lock().push((ParcelId(1), p(2, 0)));
        stub.refuse.lock().push(Direction::Up);

        let (phase, _watcher) = watch::channel(Phase::Idle);
        let out = exec.run(IntentionKey::pickup(ParcelId(1)), &CancellationToken::new(), &phase).await;
        assert_eq!(out, Outcome::Reached);
        assert_eq!(*stub.moves.lock(), vec![Direction::Left; 3]);
        let g = w.read();
        assert_eq!(g.carried_count(), 1);
        assert!(g.parcels.get(ParcelId(2)).is_some_and(|x| x.is_free()));
    }

    /// Deliver one parcel down an 11-tile corridor, replanning every two
    /// moves.  Returns the start of every published plan.
    async fn corridor_delivery(mode: ReplanMode) -> Vec<Position> {
        let mut w = world(&["D.........."], p(10, 0));
        drop_parcel(&mut w, 1, p(10, 0), 10);
        w.record_pickup(&[ParcelId(1)]);
        let w = w.into_shared();
        let plans = Arc::new(Plans::default());
        let cfg = AgentConfig { replan_every: 2, replan_mode: mode, ..config() };
        let (exec, stub) = executor_with(w.clone(), cfg, plans.clone());
        stub.held.lock().push(ParcelId(1));

        let (phase, _watcher) = watch::channel(Phase::Idle);
        let out = exec.run(IntentionKey::deliver(), &CancellationToken::new(), &phase).await;
        assert_eq!(out, Outcome::Reached);
        assert_eq!(*stub.moves.lock(), vec![Direction::Left; 10]);
        assert_eq!(w.read().me.score, 10);

        let published = plans.0.lock().clone();
        assert!(published.iter().all(|plan| plan.last() == Some(&p(0, 0))));
        published.iter().filter_map(|plan| plan.first().copied()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn hard_replan_recomputes_from_where_we_stand() {
        let starts = corridor_delivery(ReplanMode::Hard).await;
        assert_eq!(starts, vec![p(10, 0), p(8, 0), p(6, 0), p(4, 0), p(2, 0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn soft_replan_recomputes_the_tail() {
        let starts = corridor_delivery(ReplanMode::Soft).await;
        assert_eq!(starts, vec![p(10, 0), p(8, 0), p(6, 0), p(4, 0), p(2, 0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn replan_off_keeps_the_first_plan() {
        let starts = corridor_delivery(ReplanMode::Off).await;
        assert_eq!(starts, vec![p(10, 0)]);
    }
}
