//! `pd-world` — the agent's world model.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                    |
//! |---------------|-------------------------------------------------------------|
//! | [`tile`]      | `TileKind`, `Tile` (static + dynamic fields)                |
//! | [`map`]       | `GridMap`, `GridMapBuilder` (BFS delivery heuristic)        |
//! | [`parcel`]    | `Parcel`, `ParcelBook` (sensing, gossip merge, decay)       |
//! | [`agent`]     | `AgentBelief`, `AgentBook`, `BelievedIntention`             |
//! | [`forecast`]  | `Frame`, `Forecast` — predicted occupancy per future step   |
//! | [`world`]     | `WorldModel`, `SharedWorld`, sensing callbacks              |
//! | [`connector`] | `Connector` — the environment's atomic actions              |
//! | [`error`]     | `WorldError`, `WorldResult<T>`                              |
//!
//! # Ownership
//!
//! There are no ambient statics: one `WorldModel` is owned per agent and
//! shared as [`SharedWorld`] (`Arc<RwLock<_>>`).  Readers take a short read
//! guard, copy what they need and drop it before any `.await`.

pub mod agent;
pub mod connector;
pub mod error;
pub mod forecast;
pub mod map;
pub mod parcel;
pub mod tile;
pub mod world;

#[cfg(test)]
mod tests;

pub use agent::{AgentBelief, AgentBook, BelievedIntention, SensedAgent};
pub use connector::{Connector, tracked_move, tracked_pickup, tracked_putdown};
pub use error::{WorldError, WorldResult};
pub use forecast::{Forecast, Frame, Occupancy};
pub use map::{GridMap, GridMapBuilder};
pub use parcel::{Parcel, ParcelBook};
pub use tile::{Tile, TileKind};
pub use world::{SelfState, SharedWorld, WorldModel};
