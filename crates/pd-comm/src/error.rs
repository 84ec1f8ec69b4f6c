//! Error types for pd-comm.
//!
//! Only transport setup and wire decoding fail with `Err`.  Timeouts and
//! desynchronisation are values (`Reply::Resync`), never errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommError {
    #[error("transport closed: the peer endpoint is gone")]
    Closed,

    #[error("malformed message: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type CommResult<T> = Result<T, CommError>;
