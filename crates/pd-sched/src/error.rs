use thiserror::Error;

use pd_core::CoreError;

#[derive(Debug, Error)]
pub enum SchedError {
    #[error("scheduler configuration error: {0}")]
    Config(#[from] CoreError),

    #[error("intention task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type SchedResult<T> = Result<T, SchedError>;
