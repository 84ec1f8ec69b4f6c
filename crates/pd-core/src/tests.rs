//! Unit tests for pd-core primitives.

#[cfg(test)]
mod ids {
    use crate::{AgentId, ParcelId};

    #[test]
    fn ordering() {
        assert!(AgentId(0) < AgentId(1));
        assert!(ParcelId(100) > ParcelId(99));
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(AgentId::INVALID.0, u32::MAX);
        assert!(!ParcelId::default().is_valid());
        assert!(AgentId(3).is_valid());
    }

    #[test]
    fn display() {
        assert_eq!(AgentId(7).to_string(), "AgentId(7)");
    }
}

#[cfg(test)]
mod grid {
    use crate::{Direction, Position};

    #[test]
    fn rounding_snaps_mid_move_coordinates() {
        assert_eq!(Position::rounded(2.6, 3.0), Position::new(3, 3));
        assert_eq!(Position::rounded(2.4, 0.6), Position::new(2, 1));
    }

    #[test]
    fn manhattan_is_symmetric() {
        let a = Position::new(0, 0);
        let b = Position::new(3, -4);
        assert_eq!(a.manhattan(b), 7);
        assert_eq!(b.manhattan(a), 7);
    }

    #[test]
    fn step_and_direction_to_agree() {
        let p = Position::new(5, 5);
        for d in Direction::ALL {
            assert_eq!(p.direction_to(p.step(d)), Some(d));
            assert_eq!(p.step(d).step(d.opposite()), p);
        }
        assert_eq!(p.direction_to(Position::new(6, 6)), None);
    }

    #[test]
    fn alternate_order_is_a_permutation() {
        for d in Direction::ALL {
            assert!(Direction::ALT.contains(&d));
        }
        assert_ne!(Direction::ALL, Direction::ALT);
    }
}

#[cfg(test)]
mod time {
    use crate::Tick;

    #[test]
    fn tick_arithmetic() {
        let t = Tick(10);
        assert_eq!(t + 5, Tick(15));
        assert_eq!(t.offset(3), Tick(13));
        assert_eq!(Tick(15).since(Tick(10)), 5);
        assert_eq!(Tick(3).since(Tick(10)), 0);
    }
}

#[cfg(test)]
mod config {
    use crate::{AgentConfig, GameConfig, ReplanMode};

    #[test]
    fn defaults_validate() {
        assert!(AgentConfig::default().validate().is_ok());
    }

    #[test]
    fn json_partial_override() {
        let cfg = AgentConfig::from_json_str(
            r#"{ "retry_limit": 5, "replan_mode": "hard", "utility": { "explore_utility": 2.0 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.retry_limit, 5);
        assert_eq!(cfg.replan_mode, ReplanMode::Hard);
        assert_eq!(cfg.utility.explore_utility, 2.0);
        assert_eq!(cfg.utility.penalty_rate, 1.0);
    }

    #[test]
    fn inverted_wait_bounds_rejected() {
        let err = AgentConfig::from_json_str(
            r#"{ "unknown_wait_min_ms": 500, "unknown_wait_max_ms": 100 }"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn zero_horizon_rejected() {
        let cfg = AgentConfig { horizon: 0, ..AgentConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn negative_switch_margin_rejected() {
        let err = AgentConfig::from_json_str(r#"{ "utility": { "switch_margin": -1.0 } }"#);
        assert!(err.is_err());
        let cfg = AgentConfig::from_json_str(r#"{ "utility": { "switch_margin": 0.0 } }"#).unwrap();
        assert_eq!(cfg.utility.switch_margin, 0.0);
    }

    #[test]
    fn moves_per_decay() {
        let game = GameConfig { movement_ms: 250, parcel_decay_interval_ms: 1_000, ..GameConfig::default() };
        assert_eq!(game.moves_per_decay(), 4.0);
        let frozen = GameConfig { parcel_decay_interval_ms: 0, ..GameConfig::default() };
        assert!(frozen.moves_per_decay().is_infinite());
    }
}

#[cfg(test)]
mod rng {
    use crate::{AgentId, AgentRng};

    #[test]
    fn deterministic_same_seed() {
        let mut r1 = AgentRng::new(12345, AgentId(0));
        let mut r2 = AgentRng::new(12345, AgentId(0));
        for _ in 0..100 {
            let a: u64 = r1.gen_range(0..1_000_000);
            let b: u64 = r2.gen_range(0..1_000_000);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn gen_range_in_bounds() {
        let mut rng = AgentRng::new(0, AgentId(1));
        for _ in 0..1000 {
            let v = rng.gen_range(100u64..=400);
            assert!((100..=400).contains(&v));
        }
    }

    #[test]
    fn choose_stays_in_the_slice() {
        let mut rng = AgentRng::new(7, AgentId(2));
        let tiles = [3, 5, 8];
        for _ in 0..50 {
            assert!(rng.choose(&tiles).is_some_and(|t| tiles.contains(t)));
        }
        assert!(rng.choose::<u8>(&[]).is_none());
    }
}

#[cfg(test)]
mod kind {
    use crate::IntentionKind;

    #[test]
    fn labels() {
        assert_eq!(IntentionKind::PickUp.to_string(), "pickup");
        assert_eq!(serde_json::to_string(&IntentionKind::Deliver).unwrap(), "\"deliver\"");
    }
}
