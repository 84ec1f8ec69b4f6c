//! The pluggable planning seam.
//!
//! Intentions and recovery call planning through [`Planner`], so an external
//! solver can stand in for the built-in BFS without touching either.

use async_trait::async_trait;

use pd_core::Position;
use pd_world::SharedWorld;

use crate::{Pathfinder, Plan, SearchMode};

/// Something that can find a path.
///
/// # Locking
///
/// Implementations read the world through `world.read()` and must drop the
/// guard before any `.await`.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(
        &self,
        world: &SharedWorld,
        start: Position,
        goals: &[Position],
        mode:  SearchMode,
    ) -> Plan;
}

/// The built-in planner: runs [`Pathfinder`] synchronously under a read guard.
#[derive(Copy, Clone, Debug)]
pub struct GridPlanner {
    finder: Pathfinder,
}

impl GridPlanner {
    pub fn new(max_waits: u32) -> Self {
        Self { finder: Pathfinder::new(max_waits) }
    }

    pub fn pathfinder(&self) -> &Pathfinder {
        &self.finder
    }
}

#[async_trait]
impl Planner for GridPlanner {
    async fn plan(
        &self,
        world: &SharedWorld,
        start: Position,
        goals: &[Position],
        mode:  SearchMode,
    ) -> Plan {
        let guard = world.read();
        self.finder.find_path(&guard, start, goals, mode)
    }
}
