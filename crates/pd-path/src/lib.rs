//! `pd-path` — grid pathfinding.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                      |
//! |-------------|---------------------------------------------------------------|
//! | [`plan`]    | `Action`, `Step`, `Plan` (path + splice helpers)              |
//! | [`search`]  | `Pathfinder`, `SearchMode`, `DistanceField`                   |
//! | [`planner`] | `Planner` trait, `GridPlanner`                                |
//!
//! # Strategies
//!
//! | Mode           | Blocks on                              | Waits |
//! |----------------|----------------------------------------|-------|
//! | `TimeExpanded` | forecast frame `t` (obstacles, agents) | yes   |
//! | `PresentState` | obstacles + current agent positions    | no    |
//! | `ObstacleOnly` | static obstacles                       | no    |
//!
//! `SearchMode::Chain` tries them top to bottom and keeps the first
//! non-trivial result.

pub mod plan;
pub mod planner;
pub mod search;


pub use plan::{Action, Plan, Step};
pub use planner::{GridPlanner, Planner};
pub use search::{DistanceField, Pathfinder, SearchMode};
