//! Visualization / logging hooks.
//!
//! Emission is best-effort: every method returns `()` and has a no-op
//! default, so an observer can never fail or stall the execution engine.
//!
//! # Example — plan printer
//!
//! ```rust
//! use pd_core::{AgentId, AgentObserver, Position};
//!
//! struct PlanPrinter;
//!
//! impl AgentObserver for PlanPrinter {
//!     fn on_plan(&self, agent: AgentId, plan: &[Position]) {
//!         println!("{agent}: {} steps", plan.len());
//!     }
//! }
//! ```

use crate::{AgentId, Position};

/// Direction of a negotiation message relative to the observing agent.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Traffic {
    Sent,
    Received,
}

/// Callbacks invoked by the agent runtime.  Implementations must be cheap;
/// they run inline on the control task.
pub trait AgentObserver: Send + Sync {
    /// A new plan was adopted (positions only, element 0 is the start).
    fn on_plan(&self, _agent: AgentId, _plan: &[Position]) {}

    /// The scheduler made `label` the current intention.
    fn on_intention(&self, _agent: AgentId, _label: &str, _utility: f32) {}

    /// A negotiation message was sent or received.
    fn on_negotiation(&self, _agent: AgentId, _traffic: Traffic, _content: &str) {}
}

/// An [`AgentObserver`] that does nothing.
pub struct NoopObserver;

impl AgentObserver for NoopObserver {}
