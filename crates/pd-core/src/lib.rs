//! `pd-core` — foundational types for the `pd` parcel-delivery agent.
//!
//! This crate is a dependency of every other `pd-*` crate.  It intentionally
//! has no `pd-*` dependencies and minimal external ones.
//!
//! # What lives here
//!
//! | Module        | Contents                                                |
//! |---------------|---------------------------------------------------------|
//! | [`ids`]       | `AgentId`, `ParcelId`                                   |
//! | [`grid`]      | `Position`, `Direction`, Manhattan distance             |
//! | [`time`]      | `Tick`                                                  |
//! | [`kind`]      | `IntentionKind` (pickup / deliver / explore)            |
//! | [`rng`]       | `AgentRng` (per-agent, deterministic)                   |
//! | [`config`]    | `AgentConfig`, `GameConfig`, `UtilityParams`            |
//! | [`observer`]  | `AgentObserver` — fire-and-forget visualization hooks   |
//! | [`error`]     | `CoreError`, `CoreResult`                               |

pub mod config;
pub mod error;
pub mod grid;
pub mod ids;
pub mod kind;
pub mod observer;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{AgentConfig, GameConfig, ReplanMode, UtilityParams};
pub use error::{CoreError, CoreResult};
pub use grid::{Direction, Position};
pub use ids::{AgentId, ParcelId};
pub use kind::IntentionKind;
pub use observer::{AgentObserver, NoopObserver, Traffic};
pub use rng::AgentRng;
pub use time::Tick;
