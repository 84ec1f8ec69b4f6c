//! An [`AgentObserver`] that writes events to `tracing`.

use tracing::{debug, info};

use pd_core::{AgentId, AgentObserver, Position, Traffic};

/// Plans at `debug`, intentions and negotiation traffic at `info`, all under
/// the `pd::observe` target so they can be filtered apart from the
/// runtime's own logs.
pub struct TracingObserver;

impl AgentObserver for TracingObserver {
    fn on_plan(&self, agent: AgentId, plan: &[Position]) {
        let end = plan.last().copied();
        debug!(target: "pd::observe", %agent, steps = plan.len().saturating_sub(1), ?end, "plan");
    }

    fn on_intention(&self, agent: AgentId, label: &str, utility: f32) {
        info!(target: "pd::observe", %agent, intention = label, utility, "intention");
    }

    fn on_negotiation(&self, agent: AgentId, traffic: Traffic, content: &str) {
        info!(target: "pd::observe", %agent, ?traffic, content, "negotiation");
    }
}
