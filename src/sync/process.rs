use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, trace};

use super::{lock, Message, MutexCore, Phase, Resource, Step, Subscription, Transport};
use crate::config::HoldPolicy;
use crate::error::Result;
use crate::order::Timestamp;

/// One participant of the protocol.
///
/// A listener thread pulls the process's own subscription and feeds the core. Every
/// state change together with the message it publishes happens under the core lock, so
/// a local `request` and incoming messages never interleave. The resource itself is held
/// on a separate thread, outside that lock, so peers keep getting acknowledged meanwhile.
pub struct Process<T: Transport, R: Resource> {
    shared: Arc<Shared<T, R>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

struct Shared<T, R> {
    pid: usize,
    core: Mutex<MutexCore>,
    // signalled whenever a cycle completes
    idle: Condvar,
    transport: T,
    resource: Arc<R>,
    hold: HoldPolicy,
    holder: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Transport, R: Resource> Process<T, R> {
    /// Subscribe to `transport` and start listening.
    ///
    /// Every process of a run must be spawned before any of them requests.
    ///
    /// The listener runs until the transport is closed, dropping the `Process` does not
    /// stop it. Close the transport and [`join`](Self::join) to shut a process down.
    ///
    /// # Errors
    ///
    /// Fails if the transport refuses the subscription, see
    /// [`Error::LateSubscription`](crate::error::Error::LateSubscription).
    pub fn spawn(
        pid: usize,
        n_procs: usize,
        transport: T,
        resource: Arc<R>,
        hold: HoldPolicy,
    ) -> Result<Self> {
        let subscription = transport.subscribe()?;
        let core = MutexCore::new(pid, n_procs);
        debug!(pid, clock = core.clock(), "process created");
        let shared = Arc::new(Shared {
            pid,
            core: Mutex::new(core),
            idle: Condvar::new(),
            transport,
            resource,
            hold,
            holder: Mutex::new(None),
        });
        let listener = thread::spawn({
            let shared = Arc::clone(&shared);
            move || shared.listen(subscription)
        });
        Ok(Self {
            shared,
            listener: Mutex::new(Some(listener)),
        })
    }

    /// Request the resource, blocking first until any previous cycle of this process has
    /// been granted and released.
    ///
    /// Returns once the request is broadcast, the grant happens asynchronously.
    ///
    /// # Errors
    ///
    /// Never fails in practice, the wait rules out an outstanding request.
    pub fn request(&self) -> Result<Timestamp> {
        let core = lock(&self.shared.core);
        let mut core = self
            .shared
            .idle
            .wait_while(core, |c| c.active().is_some())
            .unwrap_or_else(PoisonError::into_inner);
        let (ts, step) = core.request()?;
        self.shared.apply(step);
        Ok(ts)
    }

    /// Request the resource without waiting on a previous cycle.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`](crate::error::Error::InvalidState) while the previous cycle
    /// is still requesting or occupying.
    pub fn try_request(&self) -> Result<Timestamp> {
        let mut core = lock(&self.shared.core);
        let (ts, step) = core.request()?;
        self.shared.apply(step);
        Ok(ts)
    }

    /// Block until no request of this process is outstanding.
    pub fn wait_idle(&self) {
        let core = lock(&self.shared.core);
        drop(
            self.shared
                .idle
                .wait_while(core, |c| c.active().is_some())
                .unwrap_or_else(PoisonError::into_inner),
        );
    }

    pub fn pid(&self) -> usize {
        self.shared.pid
    }
    pub fn phase(&self) -> Phase {
        lock(&self.shared.core).phase()
    }
    pub fn clock(&self) -> u64 {
        lock(&self.shared.core).clock()
    }
    pub fn active(&self) -> Option<Timestamp> {
        lock(&self.shared.core).active()
    }
    /// Copy of the protocol state, for inspection
    pub fn snapshot(&self) -> MutexCore {
        lock(&self.shared.core).clone()
    }

    /// Wait for the listener and any hold in progress to finish.
    ///
    /// The listener only stops once the transport is closed.
    pub fn join(&self) {
        let listener = lock(&self.listener).take();
        if let Some(th) = listener {
            if th.join().is_err() {
                error!(pid = self.pid(), "listener panicked");
            }
        }
        self.shared.join_holder();
    }
}

impl<T: Transport, R: Resource> Shared<T, R> {
    fn listen(self: Arc<Self>, mut subscription: T::Subscription) {
        while let Some(msg) = subscription.recv() {
            self.on_message(&msg);
        }
        debug!(pid = self.pid, "transport closed, listener stopped");
    }

    fn on_message(self: &Arc<Self>, msg: &Message) {
        if !msg.is_for(self.pid) {
            trace!(pid = self.pid, %msg, "not for us");
            return;
        }
        let mut core = lock(&self.core);
        let step = core.handle(msg);
        self.apply(step);
    }

    // Caller holds the core lock
    fn apply(self: &Arc<Self>, step: Step) {
        if let Some(out) = step.outgoing {
            self.transport.publish(out);
        }
        if let Some(ts) = step.grant {
            self.start_hold(ts);
        }
    }

    fn start_hold(self: &Arc<Self>, ts: Timestamp) {
        let shared = Arc::clone(self);
        let th = thread::spawn(move || shared.hold_then_release(ts));
        // the previous hold finished its cycle before this grant could happen
        if let Some(prev) = lock(&self.holder).replace(th) {
            if prev.join().is_err() {
                error!(pid = self.pid, "hold thread panicked");
            }
        }
    }

    fn hold_then_release(&self, ts: Timestamp) {
        self.resource.occupy(ts);
        let hold = self.hold.duration(&mut rand::thread_rng());
        if !hold.is_zero() {
            thread::sleep(hold);
        }
        self.resource.release(ts);

        let mut core = lock(&self.core);
        if let Some(msg) = core.release() {
            self.transport.publish(msg);
        }
        drop(core);
        self.idle.notify_all();
    }

    fn join_holder(&self) {
        let holder = lock(&self.holder).take();
        if let Some(th) = holder {
            if th.join().is_err() {
                error!(pid = self.pid, "hold thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::config::HoldPolicy;
    use crate::error::Error;
    use crate::order::Timestamp;
    use crate::sync::{Ledger, MulticastLog, Phase, Process, Transport};

    fn spawn_all(
        n: usize,
        hold: HoldPolicy,
    ) -> (MulticastLog, Arc<Ledger>, Vec<Process<MulticastLog, Ledger>>) {
        let log = MulticastLog::new();
        let ledger = Arc::new(Ledger::new());
        let ps = (0..n)
            .map(|i| Process::spawn(i, n, log.clone(), ledger.clone(), hold).unwrap())
            .collect();
        (log, ledger, ps)
    }

    #[test]
    fn single_process_cycle() {
        let (log, ledger, ps) = spawn_all(1, HoldPolicy::Immediate);
        assert_eq!(ps[0].request().unwrap(), Timestamp::new(1, 0));
        ps[0].wait_idle();
        assert_eq!(ledger.grants(), vec![Timestamp::new(1, 0)]);
        assert_eq!(ps[0].phase(), Phase::Idle);
        assert_eq!(ps[0].clock(), 2);
        log.close();
        ps[0].join();
    }

    #[test]
    fn try_request_while_outstanding() {
        let (log, ledger, ps) = spawn_all(2, HoldPolicy::Fixed(Duration::from_millis(200)));
        let ts = ps[0].try_request().unwrap();
        assert_eq!(
            ps[0].try_request(),
            Err(Error::InvalidState { pid: 0, active: ts })
        );
        ps[0].wait_idle();
        assert_eq!(ledger.grants(), vec![ts]);
        log.close();
        ps.iter().for_each(Process::join);
    }

    #[test]
    fn request_blocks_until_previous_cycle_released() {
        let (log, ledger, ps) = spawn_all(2, HoldPolicy::Fixed(Duration::from_millis(100)));
        let ps = Arc::new(ps);
        let first = ps[1].request().unwrap();

        let th = std::thread::spawn({
            let ps = ps.clone();
            move || ps[1].request().unwrap()
        });
        std::thread::sleep(Duration::from_millis(20));
        assert!(!th.is_finished());

        let second = th.join().unwrap();
        assert!(first < second);
        ps[1].wait_idle();
        assert_eq!(ledger.grants(), vec![first, second]);
        assert_eq!(ledger.violations(), 0);
        log.close();
        ps.iter().for_each(Process::join);
    }

    #[test]
    fn acks_while_holding() {
        let (log, ledger, ps) = spawn_all(2, HoldPolicy::Fixed(Duration::from_millis(300)));
        let first = ps[0].request().unwrap();
        // wait until P0 is inside the resource
        while ledger.holder().is_none() {
            std::thread::sleep(Duration::from_millis(5));
        }
        let second = ps[1].request().unwrap();
        std::thread::sleep(Duration::from_millis(50));
        // P0's listener acknowledged P1 although the resource is still held
        assert!(ps[1].snapshot().received().get(0).unwrap() > second.time());
        assert_eq!(ps[1].phase(), Phase::Requesting);

        ps[1].wait_idle();
        assert_eq!(ledger.grants(), vec![first, second]);
        assert_eq!(ledger.violations(), 0);
        log.close();
        ps.iter().for_each(Process::join);
    }

    struct Faulty;

    impl crate::sync::Resource for Faulty {
        fn occupy(&self, token: Timestamp) {
            panic!("cannot occupy {token}");
        }
        fn release(&self, _token: Timestamp) {}
    }

    #[test]
    fn join_survives_panicking_hold() {
        let log = MulticastLog::new();
        let hold = HoldPolicy::Immediate;
        let p = Process::spawn(0, 1, log.clone(), Arc::new(Faulty), hold).unwrap();
        p.request().unwrap();
        std::thread::sleep(Duration::from_millis(50));
        // the cycle never completes, but joining must not propagate the panic
        assert_eq!(p.phase(), Phase::Occupying);
        log.close();
        p.join();
    }

    #[test]
    fn spawn_after_publish_fails() {
        let log = MulticastLog::new();
        let ledger = Arc::new(Ledger::new());
        log.publish(crate::sync::Message::ack(0, 1, 1));
        let err = Process::spawn(0, 2, log.clone(), ledger, HoldPolicy::Immediate).err();
        assert_eq!(err, Some(Error::LateSubscription { published: 1 }));
    }
}
