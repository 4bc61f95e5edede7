//! Lamport's distributed mutual exclusion over a multicast log.
//!
//! - [`order`]: logical clock and the total-order request timestamp
//! - [`sync`]: request queue, peer knowledge, message protocol and the processes running it
//! - [`config`]: hold policy and cluster configuration

pub mod config;
pub mod error;
pub mod order;
pub mod sync;

pub use error::{Error, Result};
