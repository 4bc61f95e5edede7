//! Distributed mutual exclusion over a multicast log, after Lamport's request queue algorithm.
//!
//! The requirements are
//! 1. Mutual Exclusion - a process occupies only when its request heads its queue and every
//! peer has been heard from at a later logical time.
//! 2. No Starvation - requests are granted in the total order of their timestamps, so any
//! request is eventually the minimum everywhere.

pub mod cluster;
pub mod driver;
pub mod ledger;
pub mod machine;
pub mod message;
pub mod process;
pub mod received_time;
pub mod request_queue;
pub mod transport;

pub use cluster::Cluster;
pub use driver::Driver;
pub use ledger::{Ledger, LedgerEvent};
pub use machine::{MutexCore, Phase, Step};
pub use message::{Message, MessageKind, Recipient};
pub use process::Process;
pub use received_time::ReceivedTime;
pub use request_queue::RequestQueue;
pub use transport::{LogSubscription, MulticastLog, Subscription, Transport};

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::order::Timestamp;

/// The shared resource being protected.
///
/// The protocol calls `occupy` then `release` exactly once per grant, and never calls
/// `occupy` for a second process before the holder's `release` returned, so implementations
/// need no locking of their own for exclusivity.
pub trait Resource: Send + Sync + 'static {
    fn occupy(&self, token: Timestamp);
    fn release(&self, token: Timestamp);
}

// State is consistent at every unlock point, so a panic elsewhere does not invalidate it
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
