//! `pd-intent` — intentions: what to do, how much it is worth, and doing it.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                  |
//! |---------------|-----------------------------------------------------------|
//! | [`intention`] | `Intention`, `IntentionKey`, `Goal`, `Phase`              |
//! | [`utility`]   | `PlanningStats`, `Evaluation`, `evaluate`, `explore_goal` |
//! | [`gather`]    | `Stop`, `gather_stops`, `with_stops` — parcels on the way |
//! | [`executor`]  | `Executor`, `Outcome` — the per-intention state machine   |
//!
//! # Lifecycle
//!
//! ```text
//! idle ──► planning ──► executing ──► reached
//!   ▲          │             │
//!   └──────────┴── stopped ◄─┘
//! ```
//!
//! Utilities are never cached: `evaluate` re-derives them from the world on
//! every scheduling tick.

pub mod executor;
pub mod gather;
pub mod intention;
pub mod utility;

#[cfg(test)]
mod tests;

pub use executor::{Executor, Outcome};
pub use gather::{Stop, gather_stops, with_stops};
pub use intention::{Goal, Intention, IntentionKey, Phase};
pub use utility::{Evaluation, PlanningStats, SharedStats, evaluate, explore_goal};
