use thiserror::Error;

use pd_core::{AgentId, CoreError, Position};
use pd_sched::SchedError;
use pd_world::WorldError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent configuration error: {0}")]
    Config(#[from] CoreError),

    #[error("map error: {0}")]
    World(#[from] WorldError),

    #[error("scheduler error: {0}")]
    Sched(#[from] SchedError),

    #[error("{0} has no position; place it before running")]
    NotPlaced(AgentId),

    #[error("tile {0} cannot hold an agent")]
    Blocked(Position),
}

pub type AgentResult<T> = Result<T, AgentError>;
