//! `pd-recovery` — getting unstuck.
//!
//! Invoked by the executor when a plan step keeps failing.  Produces a
//! *patch*: a plan whose element 0 is where the agent now stands.  An empty
//! patch means "unrecoverable, replan".
//!
//! # Crate layout
//!
//! | Module        | Contents                                                    |
//! |---------------|-------------------------------------------------------------|
//! | [`recovery`]  | `Recovery` — entry point, unknown-agent wait and detour     |
//! | [`negotiate`] | master side: standoff assessment, tactic choice, package swap |
//! | [`respond`]   | responder side: executing a requested tactic                |
//! | [`side`]      | free side-tile selection                                    |
//!
//! # Decision flow
//!
//! ```text
//! blocked tile occupant
//!   ├─ not the teammate → wait (jittered) → clear? resume : detour ∨ replan
//!   └─ teammate
//!        ├─ collaborator → await request → respond
//!        └─ master → package swap (if someone delivers)
//!                  → pickUp → goForward → moveOutAndPickUp
//!                  → swap → moveOut → waitForOther
//! ```

pub mod negotiate;
pub mod recovery;
pub mod respond;
pub mod side;


pub use recovery::Recovery;
pub use side::side_tile;
