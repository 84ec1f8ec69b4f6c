//! Wire messages.
//!
//! Every message travels in an [`Envelope`] and belongs to exactly one
//! [`ChannelKind`].  The JSON form (`to_json` / `from_json`) is the wire
//! format; the in-process transport round-trips through it too.

use std::fmt;

use serde::{Deserialize, Serialize};

use pd_core::{AgentId, ParcelId, Position};
use pd_world::{BelievedIntention, Parcel};

use crate::CommResult;

/// Logical channels, one ring buffer each.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ChannelKind {
    Handshake,
    Belief,
    Request,
    Response,
    Hold,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 5] = [
        ChannelKind::Handshake,
        ChannelKind::Belief,
        ChannelKind::Request,
        ChannelKind::Response,
        ChannelKind::Hold,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// What the requester asks the responder to do.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tactic {
    /// Step to a free side tile, hold, then return.
    MoveOut,
    /// Back off one step so the requester can pass, then resume.
    Swap,
    /// Advance one step along your own plan.
    GoForward,
    /// Pick up the parcel on your tile.
    PickUp,
    /// Clear the way with your own recovery; release the requester when done.
    WaitForOther,
    /// Step onto the side tile holding a parcel and pick it up.
    MoveOutAndPickUp,
    /// Put your parcels down and step aside.
    DropAndStepAside,
    /// Move onto the requester's former tile and pick up what lies there.
    TakeParcels,
}

impl Tactic {
    pub fn as_str(self) -> &'static str {
        match self {
            Tactic::MoveOut => "moveOut",
            Tactic::Swap => "swap",
            Tactic::GoForward => "goForward",
            Tactic::PickUp => "pickUp",
            Tactic::WaitForOther => "waitForOther",
            Tactic::MoveOutAndPickUp => "moveOutAndPickUp",
            Tactic::DropAndStepAside => "dropAndStepAside",
            Tactic::TakeParcels => "takeParcels",
        }
    }
}

impl fmt::Display for Tactic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A negotiation request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub tactic:    Tactic,
    /// Where the requester stands.
    pub requester: Position,
    /// The tile the requester needs (usually the responder's tile).
    pub target:    Position,
    /// Tiles the responder must not step onto (the requester's route).
    pub avoid:     Vec<Position>,
}

/// Response to a request.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reply {
    /// The responder performed its first clearing action.
    Ok,
    /// The responder could not comply.
    Failed,
    /// Timed out or superseded; unwind to a full replan.
    Resync,
}

/// Belief gossip payloads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeliefUpdate {
    Parcels(Vec<Parcel>),
    Intention { kind: BelievedIntention, target: Option<ParcelId> },
    Position(Position),
    Carrying(bool),
    Path(Vec<Position>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Hello,
    HelloAck,
    Belief { update: BeliefUpdate },
    Request { id: u64, request: Request },
    Response { id: u64, reply: Reply },
    Release,
}

impl Message {
    pub fn channel(&self) -> ChannelKind {
        match self {
            Message::Hello | Message::HelloAck => ChannelKind::Handshake,
            Message::Belief { .. } => ChannelKind::Belief,
            Message::Request { .. } => ChannelKind::Request,
            Message::Response { .. } => ChannelKind::Response,
            Message::Release => ChannelKind::Hold,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub from: AgentId,
    /// Per-sender monotonic sequence number.
    pub seq:  u64,
    pub body: Message,
}

impl Envelope {
    pub fn to_json(&self) -> CommResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(s: &str) -> CommResult<Self> {
        Ok(serde_json::from_str(s)?)
    }
}
