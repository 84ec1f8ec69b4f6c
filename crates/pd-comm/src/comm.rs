//! The communication substrate shared by the scheduler and recovery.
//!
//! # Conversations
//!
//! | Call                      | Channel    | Bound                           |
//! |---------------------------|------------|---------------------------------|
//! | `handshake`               | Handshake  | caller-supplied wait            |
//! | `send_request`            | Request → Response | `negotiation_timeout`   |
//! | `await_request`           | Request    | caller-supplied wait            |
//! | `answer_request`          | Response   | fire-and-forget                 |
//! | `send_belief` / `drain_beliefs` | Belief | fire-and-forget             |
//! | `release` / `await_release` | Hold     | caller-supplied wait            |
//!
//! Every wait is bounded; expiry resolves to a sentinel (`Reply::Resync`,
//! `None`, `false`), never an error.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, warn};

use pd_core::{AgentId, AgentObserver, Traffic};

use crate::{BeliefUpdate, ChannelKind, Envelope, Mailbox, Message, Reply, Request, Transport};

/// Negotiation role, fixed once per session.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Role {
    /// Initiates negotiation.
    Master,
    /// Waits for and answers requests.
    Collaborator,
}

impl Role {
    /// Deterministic tie-break: the smaller id is master.
    pub fn between(me: AgentId, peer: AgentId) -> Role {
        if me < peer { Role::Master } else { Role::Collaborator }
    }
}

/// A request received from the teammate, not yet answered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingRequest {
    pub id:      u64,
    pub from:    AgentId,
    pub request: Request,
}

pub struct Comm {
    me:        AgentId,
    transport: Arc<dyn Transport>,
    inbox:     Arc<Mailbox>,
    seq:       AtomicU64,
    peer:      OnceLock<(AgentId, Role)>,
    timeout:   Duration,
    observer:  Arc<dyn AgentObserver>,
}

impl Comm {
    pub fn new(
        me:        AgentId,
        transport: Arc<dyn Transport>,
        inbox:     Arc<Mailbox>,
        timeout:   Duration,
        observer:  Arc<dyn AgentObserver>,
    ) -> Self {
        Self {
            me,
            transport,
            inbox,
            seq: AtomicU64::new(1),
            peer: OnceLock::new(),
            timeout,
            observer,
        }
    }

    pub fn me(&self) -> AgentId {
        self.me
    }

    /// The teammate and our role, once the handshake has completed.
    pub fn peer(&self) -> Option<(AgentId, Role)> {
        self.peer.get().copied()
    }

    pub fn role(&self) -> Option<Role> {
        self.peer().map(|(_, r)| r)
    }

    pub fn teammate(&self) -> Option<AgentId> {
        self.peer().map(|(id, _)| id)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn inbox(&self) -> &Mailbox {
        &self.inbox
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    async fn send(&self, body: Message) -> bool {
        let envelope = Envelope { from: self.me, seq: self.next_seq(), body };
        match self.transport.send(envelope).await {
            Ok(()) => true,
            Err(e) => {
                warn!(agent = %self.me, error = %e, "send failed");
                false
            }
        }
    }

    // ── Handshake ─────────────────────────────────────────────────────────

    /// Announce ourselves and wait up to `wait` for the teammate.
    ///
    /// Idempotent: a fixed role is never changed, duplicate hellos are
    /// acknowledged again, and the role depends only on the two ids.
    pub async fn handshake(&self, wait: Duration) -> Option<Role> {
        if let Some(role) = self.role() {
            return Some(role);
        }
        self.send(Message::Hello).await;

        let deadline = Instant::now() + wait;
        let channel = self.inbox.channel(ChannelKind::Handshake);
        while self.role().is_none() {
            let Ok(envelope) = timeout_at(deadline, channel.recv()).await else { break };
            self.on_handshake(envelope).await;
        }
        self.role()
    }

    /// Answer hellos that arrived since the last call, without waiting.
    pub async fn poll_handshake(&self) {
        for envelope in self.inbox.channel(ChannelKind::Handshake).drain() {
            self.on_handshake(envelope).await;
        }
    }

    async fn on_handshake(&self, envelope: Envelope) {
        if envelope.from == self.me {
            return;
        }
        if self.peer.get().is_none() {
            let role = Role::between(self.me, envelope.from);
            if self.peer.set((envelope.from, role)).is_ok() {
                debug!(agent = %self.me, peer = %envelope.from, ?role, "role fixed");
            }
        }
        if envelope.body == Message::Hello {
            self.send(Message::HelloAck).await;
        }
    }

    // ── Request / response ────────────────────────────────────────────────

    /// Send `request` and wait for its response.  Expiry, a closed transport
    /// or an unknown teammate all resolve to `Reply::Resync`.
    pub async fn send_request(&self, request: Request) -> Reply {
        let id = self.next_seq();
        let label = request.tactic.as_str();
        if !self.send(Message::Request { id, request }).await {
            return Reply::Resync;
        }
        self.observer.on_negotiation(self.me, Traffic::Sent, label);
        debug!(agent = %self.me, id, tactic = label, "request sent");

        let responses = self.inbox.channel(ChannelKind::Response);
        let matched = timeout(self.timeout, async {
            loop {
                let envelope = responses.recv().await;
                match envelope.body {
                    Message::Response { id: rid, reply } if rid == id => return reply,
                    // Late answer to an expired request.
                    _ => continue,
                }
            }
        })
        .await;

        let reply = matched.unwrap_or_else(|_| {
            debug!(agent = %self.me, id, tactic = label, "request expired");
            Reply::Resync
        });
        self.observer
            .on_negotiation(self.me, Traffic::Received, &format!("{label}: {reply:?}"));
        reply
    }

    /// Wait up to `wait` for a request.
    ///
    /// All buffered requests but the most recent are answered with
    /// `Reply::Resync`; the most recent is returned for the caller to answer.
    pub async fn await_request(&self, wait: Duration) -> Option<IncomingRequest> {
        let requests = self.inbox.channel(ChannelKind::Request);
        let first = if requests.is_empty() {
            Some(timeout(wait, requests.recv()).await.ok()?)
        } else {
            None
        };
        self.take_latest_request(first).await
    }

    /// Non-blocking variant of [`await_request`](Self::await_request).
    pub async fn try_request(&self) -> Option<IncomingRequest> {
        self.take_latest_request(None).await
    }

    async fn take_latest_request(&self, first: Option<Envelope>) -> Option<IncomingRequest> {
        let buffered = self.inbox.channel(ChannelKind::Request).drain();
        let mut pending: Vec<IncomingRequest> = first
            .into_iter()
            .chain(buffered)
            .filter_map(|e| match e.body {
                Message::Request { id, request } => Some(IncomingRequest { id, from: e.from, request }),
                _ => None,
            })
            .collect();
        let latest = pending.pop()?;
        for stale in pending {
            debug!(agent = %self.me, id = stale.id, "superseded request, resync");
            self.answer_request(stale.id, Reply::Resync).await;
        }
        self.observer
            .on_negotiation(self.me, Traffic::Received, latest.request.tactic.as_str());
        Some(latest)
    }

    pub async fn answer_request(&self, id: u64, reply: Reply) {
        self.send(Message::Response { id, reply }).await;
        self.observer
            .on_negotiation(self.me, Traffic::Sent, &format!("reply {id}: {reply:?}"));
    }

    // ── Beliefs ───────────────────────────────────────────────────────────

    pub async fn send_belief(&self, update: BeliefUpdate) {
        self.send(Message::Belief { update }).await;
    }

    /// Everything gossiped since the last drain, oldest first.
    pub fn drain_beliefs(&self) -> Vec<(AgentId, BeliefUpdate)> {
        self.inbox
            .channel(ChannelKind::Belief)
            .drain()
            .into_iter()
            .filter_map(|e| match e.body {
                Message::Belief { update } => Some((e.from, update)),
                _ => None,
            })
            .collect()
    }

    // ── Hold ──────────────────────────────────────────────────────────────

    /// Tell a holding teammate it may resume.
    pub async fn release(&self) {
        self.send(Message::Release).await;
    }

    /// Wait up to `wait` for a release.  `false` on expiry.
    pub async fn await_release(&self, wait: Duration) -> bool {
        let hold = self.inbox.channel(ChannelKind::Hold);
        timeout(wait, hold.recv()).await.is_ok()
    }

    /// Discard stale releases before a new hold.
    pub fn clear_hold(&self) {
        self.inbox.channel(ChannelKind::Hold).drain();
    }
}
