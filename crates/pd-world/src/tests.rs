//! Unit tests for pd-world.

#[cfg(test)]
mod helpers {
    use pd_core::{AgentConfig, AgentId, GameConfig};

    use crate::{GridMap, GridMapBuilder, WorldModel};

    /// 5×3 corridor map:
    ///
    /// ```text
    /// y=2  D . . . S
    /// y=1  . # # # .
    /// y=0  S . . . D
    /// ```
    pub fn ring_map() -> GridMap {
        GridMapBuilder::from_rows(&["D...S", ".###.", "S...D"])
            .unwrap()
            .build()
    }

    pub fn world(me: u32) -> WorldModel {
        let config = AgentConfig { horizon: 6, unseen_timeout_ticks: 3, ..Default::default() };
        WorldModel::new(AgentId(me), ring_map(), GameConfig::default(), &config)
    }
}

#[cfg(test)]
mod map {
    use pd_core::Position;

    use super::helpers::ring_map;
    use crate::{GridMapBuilder, TileKind, WorldError};

    #[test]
    fn rows_are_read_top_down() {
        let map = ring_map();
        assert_eq!(map.width(), 5);
        assert_eq!(map.height(), 3);
        assert!(map.is_delivery(Position::new(0, 2)));
        assert!(map.is_delivery(Position::new(4, 0)));
        assert_eq!(map.tile(Position::new(0, 0)).map(|t| t.kind), Some(TileKind::Spawnable));
        assert!(!map.is_walkable(Position::new(2, 1)));
    }

    #[test]
    fn heuristic_is_bfs_distance_to_nearest_delivery() {
        let map = ring_map();
        assert_eq!(map.heuristic(Position::new(0, 2)), Some(0));
        assert_eq!(map.heuristic(Position::new(0, 0)), Some(2));
        assert_eq!(map.heuristic(Position::new(2, 0)), Some(2));
        assert_eq!(map.closest_delivery(Position::new(3, 0)), Some(Position::new(4, 0)));
        assert_eq!(map.heuristic(Position::new(2, 1)), None);
    }

    #[test]
    fn unreachable_tiles_have_no_heuristic() {
        let map = GridMapBuilder::from_rows(&["D#."]).unwrap().build();
        assert_eq!(map.heuristic(Position::new(2, 0)), None);
        assert_eq!(map.closest_delivery(Position::new(2, 0)), None);
    }

    #[test]
    fn ragged_layout_is_rejected() {
        let err = GridMapBuilder::from_rows(&["D..", ".."]).err();
        assert!(matches!(err, Some(WorldError::InvalidLayout(_))));
    }

    #[test]
    fn set_outside_is_an_error() {
        let mut b = GridMapBuilder::new(2, 2);
        assert!(b.set(Position::new(1, 1), TileKind::Delivery).is_ok());
        assert!(matches!(
            b.set(Position::new(2, 0), TileKind::Delivery),
            Err(WorldError::OutOfBounds(_))
        ));
    }

    #[test]
    fn neighbors_skip_obstacles_and_edges() {
        let map = ring_map();
        let mut n: Vec<_> = map.walkable_neighbors(Position::new(1, 0)).collect();
        n.sort_by_key(|p| (p.x, p.y));
        assert_eq!(n, vec![Position::new(0, 0), Position::new(2, 0)]);
        assert_eq!(map.walkable_positions().count(), 12);
    }
}

#[cfg(test)]
mod parcels {
    use pd_core::{AgentId, ParcelId, Position};

    use crate::{Parcel, ParcelBook};

    fn p(id: u32, x: i32, y: i32, score: u32) -> Parcel {
        Parcel::new(ParcelId(id), Position::new(x, y), score)
    }

    #[test]
    fn observe_drops_parcels_missing_from_view() {
        let mut book = ParcelBook::new();
        book.observe(&[p(1, 1, 0, 10), p(2, 9, 9, 10)], Position::new(0, 0), 5);
        assert_eq!(book.len(), 2);

        // Parcel 1 should be visible but is gone; parcel 2 is out of range.
        book.observe(&[], Position::new(0, 0), 5);
        assert!(!book.contains(ParcelId(1)));
        assert!(book.contains(ParcelId(2)));
    }

    #[test]
    fn merge_keeps_lower_score() {
        let mut book = ParcelBook::new();
        book.merge(&[p(1, 0, 0, 10)]);
        book.merge(&[p(1, 0, 0, 7)]);
        book.merge(&[p(1, 0, 0, 9)]);
        assert_eq!(book.get(ParcelId(1)).map(|p| p.score), Some(7));
    }

    #[test]
    fn decay_removes_parcels_below_one() {
        let mut book = ParcelBook::new();
        book.merge(&[p(1, 0, 0, 2), p(2, 1, 0, 5)]);
        let expired = book.decay(2);
        assert_eq!(expired, vec![ParcelId(1)]);
        assert_eq!(book.get(ParcelId(2)).map(|p| p.score), Some(3));
        assert!(book.decay(0).is_empty());
    }

    #[test]
    fn carry_then_drop() {
        let me = AgentId(1);
        let mut book = ParcelBook::new();
        book.merge(&[p(1, 0, 0, 5), p(2, 0, 0, 5)]);
        book.mark_carried(&[ParcelId(1), ParcelId(2)], me);
        assert_eq!(book.carried_by(me).count(), 2);
        assert_eq!(book.free().count(), 0);

        book.move_carried(me, Position::new(3, 0));
        book.mark_dropped(&[ParcelId(1)], Position::new(3, 0), false);
        assert_eq!(book.free_at(Position::new(3, 0)).map(|p| p.id), Some(ParcelId(1)));

        book.mark_dropped(&[ParcelId(2)], Position::new(3, 0), true);
        assert!(!book.contains(ParcelId(2)));
    }
}

#[cfg(test)]
mod agents {
    use pd_core::{AgentId, Position, Tick};

    use super::helpers::ring_map;
    use crate::{AgentBook, BelievedIntention, SensedAgent};

    fn sensed(id: u32, x: f32, y: f32) -> SensedAgent {
        SensedAgent { id: AgentId(id), x, y, carrying: false }
    }

    #[test]
    fn movement_is_inferred_from_history() {
        let mut book = AgentBook::new(4);
        book.observe(&[sensed(2, 1.0, 0.0)], Tick(0));
        assert_eq!(book.get(AgentId(2)).map(|a| a.intention), Some(BelievedIntention::Still));
        book.observe(&[sensed(2, 2.0, 0.0)], Tick(1));
        assert_eq!(book.get(AgentId(2)).map(|a| a.intention), Some(BelievedIntention::Move));
    }

    #[test]
    fn history_is_bounded() {
        let mut book = AgentBook::new(2);
        for x in 0..4 {
            book.observe(&[sensed(2, x as f32, 0.0)], Tick(x as u64));
        }
        let a = book.get(AgentId(2)).unwrap();
        assert_eq!(a.history.len(), 2);
        assert_eq!(a.history.back(), Some(&Position::new(3, 0)));
    }

    #[test]
    fn projection_extrapolates_until_blocked() {
        let map = ring_map();
        let mut book = AgentBook::new(4);
        book.observe(&[sensed(2, 1.0, 0.0)], Tick(0));
        book.observe(&[sensed(2, 2.0, 0.0)], Tick(1));
        book.project(&map, 5);
        let a = book.get(AgentId(2)).unwrap();
        assert_eq!(a.predicted(0), Some(Position::new(2, 0)));
        assert_eq!(a.predicted(2), Some(Position::new(4, 0)));
        // Edge of the map: it stays.
        assert_eq!(a.predicted(4), Some(Position::new(4, 0)));
        assert_eq!(a.predicted(50), Some(Position::new(4, 0)));
    }

    #[test]
    fn announced_path_wins_over_extrapolation() {
        let map = ring_map();
        let mut book = AgentBook::new(4);
        book.observe(&[sensed(2, 0.0, 0.0)], Tick(0));
        book.announce_path(
            AgentId(2),
            vec![Position::new(0, 0), Position::new(0, 1), Position::new(0, 2)],
            Tick(0),
        );
        book.project(&map, 4);
        let a = book.get(AgentId(2)).unwrap();
        assert_eq!(a.trajectory, vec![
            Position::new(0, 0),
            Position::new(0, 1),
            Position::new(0, 2),
            Position::new(0, 2),
        ]);
    }

    #[test]
    fn unseen_agents_decay_unless_exempt() {
        let mut book = AgentBook::new(4);
        book.observe(&[sensed(2, 1.0, 0.0), sensed(3, 3.0, 0.0)], Tick(0));
        book.decay_unseen(Tick(10), 3, Some(AgentId(3)));
        assert_eq!(book.get(AgentId(2)).and_then(|a| a.position), None);
        assert_eq!(book.get(AgentId(3)).and_then(|a| a.position), Some(Position::new(3, 0)));
        assert_eq!(book.located().count(), 1);
    }

    #[test]
    fn announced_pickup_is_sticky() {
        let mut book = AgentBook::new(4);
        book.announce(AgentId(2), BelievedIntention::PickUp, None, Tick(0));
        book.observe(&[sensed(2, 1.0, 0.0)], Tick(1));
        book.observe(&[sensed(2, 2.0, 0.0)], Tick(2));
        assert_eq!(book.get(AgentId(2)).map(|a| a.intention), Some(BelievedIntention::PickUp));
    }
}

#[cfg(test)]
mod forecast {
    use pd_core::{AgentId, Position, Tick};

    use super::helpers::ring_map;
    use crate::{AgentBook, Forecast, Occupancy, SensedAgent};

    #[test]
    fn frames_follow_trajectories() {
        let map = ring_map();
        let mut book = AgentBook::new(4);
        let s = |x: f32| SensedAgent { id: AgentId(2), x, y: 0.0, carrying: false };
        book.observe(&[s(1.0)], Tick(0));
        book.observe(&[s(2.0)], Tick(1));
        book.project(&map, 3);
        let f = Forecast::build(&map, &book, 3);

        assert_eq!(f.horizon(), 3);
        assert_eq!(f.frame(0).at(Position::new(2, 0)), Occupancy::Agent(AgentId(2)));
        assert_eq!(f.frame(1).at(Position::new(3, 0)), Occupancy::Agent(AgentId(2)));
        assert_eq!(f.frame(1).at(Position::new(2, 0)), Occupancy::Free);
        // Past the horizon the last frame is reused.
        assert_eq!(f.frame(99).at(Position::new(4, 0)), Occupancy::Agent(AgentId(2)));
    }

    #[test]
    fn obstacles_and_outside_are_never_free() {
        let f = Forecast::static_only(&ring_map(), 2);
        assert_eq!(f.frame(0).at(Position::new(2, 1)), Occupancy::Obstacle);
        assert_eq!(f.frame(0).at(Position::new(-1, 0)), Occupancy::Obstacle);
        assert!(f.frame(0).is_free_for(Position::new(0, 0), AgentId(1)));
    }

    #[test]
    fn blocked_tile_is_occupied_in_every_frame() {
        let f = Forecast::static_only(&ring_map(), 3).with_blocked(Position::new(1, 0), AgentId(9));
        for t in 0..3 {
            assert!(!f.frame(t).is_free_for(Position::new(1, 0), AgentId(1)));
            assert!(f.frame(t).is_free_for(Position::new(1, 0), AgentId(9)));
        }
    }
}

#[cfg(test)]
mod world {
    use pd_core::{AgentId, ParcelId, Position};

    use super::helpers::world;
    use crate::{Parcel, SensedAgent};

    #[test]
    fn sensing_updates_tiles_and_forecast() {
        let mut w = world(1);
        w.on_you(0.0, 0.0, 0);
        w.on_parcels_sensing(&[Parcel::new(ParcelId(5), Position::new(2, 0), 10)]);
        w.on_agents_sensing(&[
            SensedAgent { id: AgentId(1), x: 0.0, y: 0.0, carrying: false },
            SensedAgent { id: AgentId(2), x: 4.0, y: 2.0, carrying: false },
        ]);

        assert_eq!(w.map.tile(Position::new(2, 0)).and_then(|t| t.parcel), Some(ParcelId(5)));
        assert_eq!(w.occupant(Position::new(4, 2)), Some(AgentId(2)));
        // Ourselves never appear in the agent book.
        assert!(w.agents.get(AgentId(1)).is_none());
        assert!(!w.forecast.frame(0).is_free_for(Position::new(4, 2), AgentId(1)));
        assert!(w.map.tile(Position::new(4, 1)).is_some_and(|t| t.agent_heat > 0.0));
    }

    #[test]
    fn carried_parcels_follow_us_and_score_on_delivery() {
        let mut w = world(1);
        w.on_you(3.0, 0.0, 0);
        w.on_parcels_sensing(&[Parcel::new(ParcelId(5), Position::new(3, 0), 10)]);
        w.record_pickup(&[ParcelId(5)]);
        assert_eq!(w.carried_total(), 10);

        w.set_position(Position::new(4, 0));
        assert_eq!(w.carried().next().map(|p| p.position), Some(Position::new(4, 0)));

        let gained = w.record_putdown(&[ParcelId(5)]);
        assert_eq!(gained, 10);
        assert_eq!(w.me.score, 10);
        assert_eq!(w.carried_count(), 0);
        assert!(w.parcels.is_empty());
    }

    #[test]
    fn putdown_off_delivery_leaves_a_free_parcel() {
        let mut w = world(1);
        w.on_you(1.0, 0.0, 0);
        w.on_parcels_sensing(&[Parcel::new(ParcelId(5), Position::new(1, 0), 10)]);
        w.record_pickup(&[ParcelId(5)]);
        assert_eq!(w.record_putdown(&[ParcelId(5)]), 0);
        assert!(w.parcels.free_at(Position::new(1, 0)).is_some());
    }

    #[test]
    fn teammate_survives_the_unseen_timeout() {
        let mut w = world(1);
        w.teammate = Some(AgentId(2));
        w.on_agents_sensing(&[
            SensedAgent { id: AgentId(2), x: 0.0, y: 2.0, carrying: false },
            SensedAgent { id: AgentId(3), x: 4.0, y: 2.0, carrying: false },
        ]);
        for _ in 0..5 {
            w.advance_tick();
        }
        assert!(w.teammate_belief().and_then(|b| b.position).is_some());
        assert_eq!(w.occupant(Position::new(4, 2)), None);
    }
}
