//! Error types for the mutual exclusion protocol.
//!
//! The protocol itself never fails a request, it only delays it. What can fail is usage
//! (asking twice) and bootstrapping (wiring the transport in the wrong order).

use thiserror::Error;

use crate::order::Timestamp;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A request was made while a prior cycle of the same process is still outstanding.
    #[error("process {pid} already has an outstanding request {active}")]
    InvalidState { pid: usize, active: Timestamp },

    /// A subscriber joined after the first publish and may have missed a request.
    #[error("subscription created after {published} message(s) were published")]
    LateSubscription { published: usize },

    /// Process id outside `0..n_procs`.
    #[error("unknown process {pid}, cluster has {n_procs} process(es)")]
    UnknownProcess { pid: usize, n_procs: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
