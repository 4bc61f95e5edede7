//! Multicast transport contract and the in-process shared log implementing it.

use std::sync::{mpsc, Arc, Mutex};

use tracing::{debug, trace};

use super::{lock, Message};
use crate::error::{Error, Result};

/// Point-to-multipoint delivery every process relies on.
///
/// Every message published after a subscription was created must be delivered to that
/// subscription, and all subscriptions observe the same global publish order.
pub trait Transport: Send + Sync + 'static {
    type Subscription: Subscription;
    fn publish(&self, msg: Message);
    /// # Errors
    ///
    /// Implementations must refuse subscriptions that could have missed a message,
    /// see [`Error::LateSubscription`].
    fn subscribe(&self) -> Result<Self::Subscription>;
}

/// Blocking, order-preserving pull side of a [`Transport`].
pub trait Subscription: Send + 'static {
    /// Blocks for the next message, `None` once the transport is closed and drained.
    fn recv(&mut self) -> Option<Message>;
}

/// Shared log fanning every published message out to one unbounded channel per subscriber.
///
/// Publishing happens under a single lock, which gives every subscriber the same order.
#[derive(Clone, Default)]
pub struct MulticastLog {
    inner: Arc<Mutex<LogState>>,
}

#[derive(Default)]
struct LogState {
    subscribers: Vec<mpsc::Sender<Message>>,
    published: usize,
    closed: bool,
}

impl MulticastLog {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn published(&self) -> usize {
        lock(&self.inner).published
    }
    pub fn subscribers(&self) -> usize {
        lock(&self.inner).subscribers.len()
    }
    /// Ends every subscription once it has drained what was already delivered.
    /// Later publishes are dropped.
    pub fn close(&self) {
        let mut state = lock(&self.inner);
        if !state.closed {
            debug!(published = state.published, "closing multicast log");
        }
        state.closed = true;
        state.subscribers.clear();
    }
}

impl Transport for MulticastLog {
    type Subscription = LogSubscription;

    fn publish(&self, msg: Message) {
        let mut state = lock(&self.inner);
        if state.closed {
            trace!(%msg, "dropping publish on closed log");
            return;
        }
        state.published += 1;
        trace!(%msg, seq = state.published, "publish");
        // a subscriber that hung up is simply forgotten
        state.subscribers.retain(|tx| tx.send(msg.clone()).is_ok());
    }

    fn subscribe(&self) -> Result<LogSubscription> {
        let mut state = lock(&self.inner);
        if state.published > 0 {
            return Err(Error::LateSubscription {
                published: state.published,
            });
        }
        let (tx, rx) = mpsc::channel();
        if !state.closed {
            state.subscribers.push(tx);
        }
        Ok(LogSubscription { rx })
    }
}

pub struct LogSubscription {
    rx: mpsc::Receiver<Message>,
}

impl LogSubscription {
    /// Next message if one is already delivered
    pub fn try_recv(&mut self) -> Option<Message> {
        self.rx.try_recv().ok()
    }
}

impl Subscription for LogSubscription {
    fn recv(&mut self) -> Option<Message> {
        self.rx.recv().ok()
    }
}
