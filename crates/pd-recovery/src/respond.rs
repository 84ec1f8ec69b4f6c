//! Responder side: carry out a tactic the master asked for.
//!
//! The reply is sent right after the first clearing action so the master can
//! step immediately.  The returned patch follows the usual convention: back
//! on the original tile or advanced along our own plan → resume; displaced →
//! empty (replan).

use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use pd_comm::{Comm, IncomingRequest, Reply, Tactic};
use pd_core::Position;
use pd_path::Plan;
use pd_world::{tracked_pickup, tracked_putdown};

use crate::side::{side_tile, side_tile_with_parcel};
use crate::Recovery;

impl Recovery {
    /// Execute `incoming` given our own `plan`, whose next step is `idx`.
    pub async fn serve(&self, incoming: IncomingRequest, plan: &Plan, idx: usize) -> Plan {
        let Some(comm) = self.comm() else { return Plan::empty() };
        let request = &incoming.request;
        let mut avoid = request.avoid.clone();
        avoid.push(request.requester);

        let here = self.world.read().position();
        let Some(here) = here else {
            comm.answer_request(incoming.id, Reply::Failed).await;
            return Plan::empty();
        };
        debug!(agent = %comm.me(), tactic = %request.tactic, %here, "serving");
        let resume = || Plan::resume_from(here, plan.tail(idx));

        match request.tactic {
            Tactic::MoveOut => {
                let Some(side) = self.my_side(here, &avoid) else {
                    return self.refuse(comm, &incoming, resume()).await;
                };
                if !self.step_to(here, side).await {
                    return self.refuse(comm, &incoming, resume()).await;
                }
                comm.answer_request(incoming.id, Reply::Ok).await;
                sleep(Duration::from_millis(self.config.move_out_hold_ms)).await;
                if self.step_to(side, here).await { resume() } else { Plan::empty() }
            }

            Tactic::Swap => {
                // `plan[idx - 1]` is where we stand; one step back is before it.
                let back = idx
                    .checked_sub(2)
                    .and_then(|i| plan.get(i))
                    .map(|s| s.position)
                    .filter(|&p| p != here && !avoid.contains(&p) && self.is_free_for_me(p))
                    .or_else(|| self.my_side(here, &avoid));
                let Some(back) = back else {
                    return self.refuse(comm, &incoming, resume()).await;
                };
                if !self.step_to(here, back).await {
                    return self.refuse(comm, &incoming, resume()).await;
                }
                comm.answer_request(incoming.id, Reply::Ok).await;
                Plan::empty()
            }

            Tactic::GoForward => {
                let next = plan
                    .get(idx)
                    .filter(|s| s.action.is_move())
                    .map(|s| s.position)
                    .filter(|&p| p != request.requester);
                let Some(next) = next else {
                    return self.refuse(comm, &incoming, resume()).await;
                };
                if !self.step_to(here, next).await {
                    return self.refuse(comm, &incoming, resume()).await;
                }
                comm.answer_request(incoming.id, Reply::Ok).await;
                Plan::resume_from(next, plan.tail(idx + 1))
            }

            Tactic::PickUp => {
                let picked = tracked_pickup(self.connector.as_ref(), &self.world).await;
                let reply = if picked.is_empty() { Reply::Failed } else { Reply::Ok };
                comm.answer_request(incoming.id, reply).await;
                resume()
            }

            Tactic::MoveOutAndPickUp => {
                let target = {
                    let w = self.world.read();
                    side_tile_with_parcel(&w, here, w.me.id, &avoid)
                };
                let Some(target) = target else {
                    return self.refuse(comm, &incoming, resume()).await;
                };
                if !self.step_to(here, target).await {
                    return self.refuse(comm, &incoming, resume()).await;
                }
                tracked_pickup(self.connector.as_ref(), &self.world).await;
                comm.answer_request(incoming.id, Reply::Ok).await;
                Plan::empty()
            }

            Tactic::WaitForOther => {
                comm.answer_request(incoming.id, Reply::Ok).await;
                let moved = match self.my_side(here, &avoid) {
                    Some(side) => self.step_to(here, side).await,
                    None => false,
                };
                comm.release().await;
                if moved { Plan::empty() } else { resume() }
            }

            Tactic::DropAndStepAside => {
                let Some(side) = self.my_side(here, &avoid) else {
                    return self.refuse(comm, &incoming, resume()).await;
                };
                tracked_putdown(self.connector.as_ref(), &self.world).await;
                if !self.step_to(here, side).await {
                    return self.refuse(comm, &incoming, Plan::empty()).await;
                }
                comm.answer_request(incoming.id, Reply::Ok).await;
                Plan::empty()
            }

            Tactic::TakeParcels => {
                if !self.step_to(here, request.target).await {
                    return self.refuse(comm, &incoming, resume()).await;
                }
                tracked_pickup(self.connector.as_ref(), &self.world).await;
                comm.answer_request(incoming.id, Reply::Ok).await;
                Plan::empty()
            }
        }
    }

    async fn refuse(&self, comm: &Comm, incoming: &IncomingRequest, patch: Plan) -> Plan {
        debug!(agent = %comm.me(), tactic = %incoming.request.tactic, "cannot comply");
        comm.answer_request(incoming.id, Reply::Failed).await;
        patch
    }

    fn my_side(&self, here: Position, avoid: &[Position]) -> Option<Position> {
        let w = self.world.read();
        side_tile(&w, here, w.me.id, avoid)
    }

    fn is_free_for_me(&self, pos: Position) -> bool {
        let w = self.world.read();
        w.map.is_walkable(pos) && w.forecast.frame(0).is_free_for(pos, w.me.id)
    }
}
