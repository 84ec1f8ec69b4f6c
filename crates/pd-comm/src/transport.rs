//! Transports and per-agent mailboxes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;

use crate::ring::RING_CAPACITY;
use crate::{ChannelKind, CommError, CommResult, Envelope, RingBuffer};

/// One ring buffer per channel.
pub struct Mailbox {
    channels: [RingBuffer<Envelope>; 5],
}

impl Mailbox {
    pub fn new(capacity: usize) -> Self {
        Self { channels: std::array::from_fn(|_| RingBuffer::new(capacity)) }
    }

    /// File `envelope` under its channel.
    pub fn deliver(&self, envelope: Envelope) {
        self.channel(envelope.body.channel()).push(envelope);
    }

    pub fn channel(&self, kind: ChannelKind) -> &RingBuffer<Envelope> {
        &self.channels[kind.index()]
    }

    /// Total entries lost to overwrites across all channels.
    pub fn lost(&self) -> u64 {
        self.channels.iter().map(|c| c.lost()).sum()
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new(RING_CAPACITY)
    }
}

/// Outbound half of a link to the teammate.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, envelope: Envelope) -> CommResult<()>;
}

/// In-process transport between two agents of the same process.
///
/// Messages are encoded to JSON and decoded into the peer's mailbox, so the
/// wire form is exercised end to end.
pub struct LocalLink {
    inbox: Arc<Mailbox>,
    peer:  Weak<Mailbox>,
    up:    Arc<AtomicBool>,
}

impl LocalLink {
    /// Two connected endpoints.
    pub fn pair() -> (LocalLink, LocalLink) {
        let a = Arc::new(Mailbox::default());
        let b = Arc::new(Mailbox::default());
        let up = Arc::new(AtomicBool::new(true));
        (
            LocalLink { inbox: a.clone(), peer: Arc::downgrade(&b), up: up.clone() },
            LocalLink { inbox: b, peer: Arc::downgrade(&a), up },
        )
    }

    /// The mailbox this endpoint receives into.
    pub fn inbox(&self) -> Arc<Mailbox> {
        self.inbox.clone()
    }

    /// Cut the link in both directions; later sends are silently dropped.
    pub fn sever(&self) {
        self.up.store(false, Ordering::Release);
    }
}

#[async_trait]
impl Transport for LocalLink {
    async fn send(&self, envelope: Envelope) -> CommResult<()> {
        let peer = self.peer.upgrade().ok_or(CommError::Closed)?;
        if !self.up.load(Ordering::Acquire) {
            return Ok(());
        }
        let wire = envelope.to_json()?;
        peer.deliver(Envelope::from_json(&wire)?);
        Ok(())
    }
}
