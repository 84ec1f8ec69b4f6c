//! Master side of a standoff with the teammate.
//!
//! The master assesses the standoff once, under a single read guard, then
//! picks the first applicable tactic:
//!
//! | Order | Tactic              | When                                                   |
//! |-------|---------------------|--------------------------------------------------------|
//! | 1     | package swap        | either agent is delivering                             |
//! | 2     | `pickUp`            | a parcel lies under the teammate and it announced it   |
//! | 3     | `goForward`         | the teammate's forecast next tile is free              |
//! | 4     | `moveOutAndPickUp`  | the teammate has a free side tile holding a parcel     |
//! | 5     | `swap`              | the teammate is mid-pickup/delivery with a side tile   |
//! | 6     | `moveOut`           | the teammate has a free side tile                      |
//! | 7     | `waitForOther`      | otherwise                                              |
//!
//! # Package swap
//!
//! The agent with the longer hop distance to a delivery tile (`L`) hands its
//! parcels to the closer one (`C`); on a tie the master keeps carrying.  If
//! `L` can step aside it puts its parcels down and does so, and `C` moves in
//! and picks them up.  Otherwise, if `C` can step aside, `L` is let through.
//! Otherwise the swap fails and the caller replans.

use tracing::debug;

use pd_comm::{Comm, Reply, Request, Tactic};
use pd_core::{IntentionKind, Position};
use pd_path::{Action, Plan};
use pd_world::{BelievedIntention, tracked_putdown};

use crate::side::{side_tile, side_tile_with_parcel};
use crate::Recovery;

/// How many upcoming tiles of our route the teammate is asked to keep off.
const AVOID_LOOKAHEAD: usize = 4;

/// Everything the master needs to choose a tactic.
#[derive(Clone, Debug)]
pub(crate) struct Standoff {
    pub here:              Position,
    /// The teammate's tile (the one we could not enter).
    pub theirs:            Position,
    pub my_route:          Vec<Position>,
    pub we_deliver:        bool,
    pub they_deliver:      bool,
    pub my_distance:       u32,
    pub their_distance:    u32,
    pub my_side:           Option<Position>,
    pub their_side:        Option<Position>,
    pub their_side_parcel: Option<Position>,
    pub their_next:        Option<Position>,
    pub parcel_under_them: bool,
    pub they_pick_it:      bool,
    pub they_busy:         bool,
}

impl Recovery {
    pub(crate) fn assess(
        &self,
        failed: usize,
        plan:   &Plan,
        kind:   IntentionKind,
        here:   Position,
        theirs: Position,
    ) -> Option<Standoff> {
        let w = self.world.read();
        let mate = w.teammate_belief()?;

        let my_route: Vec<Position> = plan
            .tail(failed)
            .iter()
            .take(AVOID_LOOKAHEAD)
            .map(|s| s.position)
            .collect();
        let mut their_avoid = my_route.clone();
        their_avoid.push(here);
        let mut my_avoid: Vec<Position> = mate.trajectory.iter().take(AVOID_LOOKAHEAD).copied().collect();
        my_avoid.push(theirs);

        let their_next = mate
            .predicted(1)
            .filter(|&p| p != theirs && p != here && w.forecast.frame(0).is_free_for(p, mate.id));
        let parcel_under = w.parcels.free_at(theirs).map(|p| p.id);

        Some(Standoff {
            here,
            theirs,
            we_deliver: kind == IntentionKind::Deliver && w.carried_count() > 0,
            they_deliver: mate.carrying || mate.intention == BelievedIntention::Deliver,
            my_distance: w.map.heuristic(here).unwrap_or(u32::MAX),
            their_distance: w.map.heuristic(theirs).unwrap_or(u32::MAX),
            my_side: side_tile(&w, here, w.me.id, &my_avoid),
            their_side: side_tile(&w, theirs, mate.id, &their_avoid),
            their_side_parcel: side_tile_with_parcel(&w, theirs, mate.id, &their_avoid),
            their_next,
            parcel_under_them: parcel_under.is_some(),
            they_pick_it: mate.intention == BelievedIntention::PickUp
                && parcel_under.is_some()
                && mate.announced_target == parcel_under,
            they_busy: matches!(mate.intention, BelievedIntention::PickUp | BelievedIntention::Deliver),
            my_route,
        })
    }

    pub(crate) async fn negotiate(
        &self,
        comm:   &Comm,
        failed: usize,
        plan:   &Plan,
        kind:   IntentionKind,
        here:   Position,
        theirs: Position,
    ) -> Plan {
        let Some(s) = self.assess(failed, plan, kind, here, theirs) else {
            return Plan::empty();
        };
        let resume = || Plan::resume_from(here, plan.tail(failed));

        if s.we_deliver || s.they_deliver {
            return self.package_swap(comm, &s, failed, plan).await;
        }

        let tactic = if s.parcel_under_them && s.they_pick_it {
            Tactic::PickUp
        } else if s.their_next.is_some() {
            Tactic::GoForward
        } else if s.their_side_parcel.is_some() {
            Tactic::MoveOutAndPickUp
        } else if s.they_busy && s.their_side.is_some() {
            Tactic::Swap
        } else if s.their_side.is_some() {
            Tactic::MoveOut
        } else {
            Tactic::WaitForOther
        };

        comm.clear_hold();
        match self.ask(comm, tactic, &s).await {
            Reply::Ok if tactic == Tactic::WaitForOther => {
                if comm.await_release(self.negotiation_timeout()).await {
                    resume()
                } else {
                    Plan::empty()
                }
            }
            Reply::Ok => resume(),
            Reply::Failed | Reply::Resync => Plan::empty(),
        }
    }

    async fn ask(&self, comm: &Comm, tactic: Tactic, s: &Standoff) -> Reply {
        debug!(agent = %comm.me(), %tactic, theirs = %s.theirs, "requesting");
        let request = Request {
            tactic,
            requester: s.here,
            target:    s.theirs,
            avoid:     s.my_route.clone(),
        };
        comm.send_request(request).await
    }

    async fn package_swap(&self, comm: &Comm, s: &Standoff, failed: usize, plan: &Plan) -> Plan {
        let i_am_longer = s.my_distance > s.their_distance;
        debug!(
            agent = %comm.me(),
            mine = s.my_distance,
            theirs = s.their_distance,
            i_am_longer,
            "package swap"
        );

        if i_am_longer {
            if let Some(side) = s.my_side {
                // Hand over: drop here, step aside, let the teammate take them.
                tracked_putdown(self.connector.as_ref(), &self.world).await;
                if !self.step_to(s.here, side).await {
                    return Plan::empty();
                }
                let request = Request {
                    tactic:    Tactic::TakeParcels,
                    requester: side,
                    target:    s.here,
                    avoid:     vec![side],
                };
                comm.send_request(request).await;
                return Plan::empty();
            }
            if s.their_side.is_some() {
                return match self.ask(comm, Tactic::Swap, s).await {
                    Reply::Ok => Plan::resume_from(s.here, plan.tail(failed)),
                    _ => Plan::empty(),
                };
            }
            return Plan::empty();
        }

        if s.their_side.is_some() {
            return match self.ask(comm, Tactic::DropAndStepAside, s).await {
                Reply::Ok => Plan::resume_from(s.here, &plan.steps()[failed..=failed])
                    .then_action(Action::PickUp)
                    .then(plan.tail(failed + 1)),
                _ => Plan::empty(),
            };
        }
        if let Some(side) = s.my_side {
            if self.step_to(s.here, side).await {
                self.ask(comm, Tactic::GoForward, s).await;
            }
        }
        Plan::empty()
    }
}
