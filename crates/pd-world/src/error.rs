//! World-model error type.

use thiserror::Error;

use pd_core::Position;

/// Errors produced while building the world model.  Runtime belief updates
/// never fail.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("invalid map layout: {0}")]
    InvalidLayout(String),

    #[error("tile {0} lies outside the map")]
    OutOfBounds(Position),
}

pub type WorldResult<T> = Result<T, WorldError>;
