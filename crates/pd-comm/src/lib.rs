//! `pd-comm` — teammate communication.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                    |
//! |---------------|-------------------------------------------------------------|
//! | [`ring`]      | `RingBuffer<T>` — bounded, overwrite-oldest, loss counter   |
//! | [`message`]   | `Envelope`, `Message`, `ChannelKind`, `Tactic`, `Reply`     |
//! | [`transport`] | `Transport` trait, `Mailbox`, `LocalLink`                   |
//! | [`comm`]      | `Comm` (handshake, requests, gossip, hold), `Role`          |
//! | [`error`]     | `CommError`, `CommResult<T>`                                |

pub mod comm;
pub mod error;
pub mod message;
pub mod ring;
pub mod transport;


pub use comm::{Comm, IncomingRequest, Role};
pub use error::{CommError, CommResult};
pub use message::{BeliefUpdate, ChannelKind, Envelope, Message, Reply, Request, Tactic};
pub use ring::{RING_CAPACITY, RingBuffer};
pub use transport::{LocalLink, Mailbox, Transport};
