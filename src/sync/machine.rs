//! Pure protocol state of one process - no I/O, no threads, no locks
//!
//! [`MutexCore`] consumes delivered messages and produces the messages to publish plus
//! grant decisions. [`Process`](super::Process) wraps it in a lock and drives it from
//! a transport, tests drive it directly.

use tracing::{debug, trace, warn};

use super::{Message, MessageKind, ReceivedTime, RequestQueue};
use crate::error::{Error, Result};
use crate::order::{LamportClock, Timestamp};

/// Externally visible phase of a process
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Requesting,
    Occupying,
}

/// What the caller has to do after feeding the core an event
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Step {
    /// Publish this on the transport
    pub outgoing: Option<Message>,
    /// The grant rule fired: occupy the resource with this token, then call `release`
    pub grant: Option<Timestamp>,
}

#[derive(Clone, Debug)]
pub struct MutexCore {
    pid: usize,
    clock: LamportClock,
    queue: RequestQueue,
    received: ReceivedTime,
    occupying: bool,
    active: Option<Timestamp>,
}

impl MutexCore {
    pub fn new(pid: usize, n_procs: usize) -> Self {
        Self {
            pid,
            clock: LamportClock::new(),
            queue: RequestQueue::new(),
            received: ReceivedTime::new(pid, n_procs),
            occupying: false,
            active: None,
        }
    }

    /// Start a new cycle: stamp a request, enqueue it and produce the REQUEST broadcast.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] while a previous cycle has not been released.
    pub fn request(&mut self) -> Result<(Timestamp, Step)> {
        if let Some(active) = self.active {
            return Err(Error::InvalidState {
                pid: self.pid,
                active,
            });
        }
        let now = self.clock.tick();
        let ts = Timestamp::new(now, self.pid);
        let msg = Message::request(self.pid, now, ts);
        self.queue.push(ts);
        self.active = Some(ts);
        debug!(pid = self.pid, %ts, "request");
        // zero peers, or knowledge already sufficient
        let step = Step {
            outgoing: Some(msg),
            grant: self.try_grant(),
        };
        Ok((ts, step))
    }

    /// React to a message observed on the shared log.
    pub fn handle(&mut self, msg: &Message) -> Step {
        if !msg.is_for(self.pid) {
            return Step::default();
        }
        trace!(pid = self.pid, %msg, "handle");
        self.clock.update(msg.clock);
        self.received.update(msg.sender, msg.clock);

        let outgoing = match (msg.kind, msg.payload) {
            (MessageKind::Request, Some(ts)) => {
                self.queue.push(ts);
                let now = self.clock.tick();
                Some(Message::ack(self.pid, msg.sender, now))
            }
            (MessageKind::Release, Some(ts)) => {
                if !self.queue.remove(&ts) {
                    warn!(pid = self.pid, %ts, "release for a request not in queue");
                }
                None
            }
            (MessageKind::Ack, _) => None,
            (kind, None) => {
                warn!(pid = self.pid, ?kind, "message without timestamp, ignoring payload");
                None
            }
        };
        Step {
            outgoing,
            grant: self.try_grant(),
        }
    }

    /// Evaluate the grant rule, marking the process occupying when it holds.
    pub fn try_grant(&mut self) -> Option<Timestamp> {
        if self.occupying {
            return None;
        }
        let ts = self.active?;
        if self.queue.min() != Some(&ts) {
            return None;
        }
        // every peer has advanced past ts, so none can still hold an unseen smaller request
        if self.received.min().is_some_and(|min| ts.time() >= min) {
            return None;
        }
        self.occupying = true;
        debug!(pid = self.pid, %ts, clock = self.clock.now(), "granted");
        Some(ts)
    }

    /// Finish the cycle after the resource was released, producing the RELEASE broadcast.
    ///
    /// Returns `None` if the process is not occupying.
    pub fn release(&mut self) -> Option<Message> {
        if !self.occupying {
            return None;
        }
        let ts = self.active.take()?;
        self.queue.remove(&ts);
        let now = self.clock.tick();
        self.occupying = false;
        debug!(pid = self.pid, %ts, clock = now, "released");
        Some(Message::release(self.pid, now, ts))
    }

    pub fn pid(&self) -> usize {
        self.pid
    }
    pub fn clock(&self) -> u64 {
        self.clock.now()
    }
    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }
    pub fn received(&self) -> &ReceivedTime {
        &self.received
    }
    pub fn active(&self) -> Option<Timestamp> {
        self.active
    }
    pub fn is_occupying(&self) -> bool {
        self.occupying
    }
    pub fn phase(&self) -> Phase {
        match (self.active, self.occupying) {
            (_, true) => Phase::Occupying,
            (Some(_), false) => Phase::Requesting,
            (None, false) => Phase::Idle,
        }
    }
}
