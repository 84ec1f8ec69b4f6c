//! `pd-sched` — picks the current intention and switches safely.
//!
//! # Crate layout
//!
//! | Module        | Contents                                              |
//! |---------------|-------------------------------------------------------|
//! | [`scheduler`] | `Scheduler` (revision loop), `select`                 |
//! | [`gossip`]    | `absorb` — teammate beliefs into the world model      |
//! | [`error`]     | `SchedError`, `SchedResult<T>`                        |
//!
//! # Revision tick
//!
//! ```text
//! every revision_ms:
//!   ① world clock, parcel decay, teammate gossip
//!   ② sync candidates  — one pickup per known free parcel, plus deliver/explore
//!   ③ evaluate all     — utilities re-derived, never cached
//!   ④ select           — greatest utility (ties → nearer goal), skipping the
//!                        teammate's announced pickup target
//!   ⑤ switch           — stop current, await its (key, outcome), then start
//! ```
//!
//! Only one intention ever dispatches actions: the next one is spawned after
//! the previous run has sent its completion.

pub mod error;
pub mod gossip;
pub mod scheduler;


pub use error::{SchedError, SchedResult};
pub use gossip::absorb;
pub use scheduler::{Scheduler, TIE_EPSILON, select};
