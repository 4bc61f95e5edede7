//! Self-driving acquisition loop layered on top of a [`Process`].
//!
//! A driver is handed a budget of acquisitions and keeps requesting while budget remains.
//! How long each acquisition holds is the process's [`HoldPolicy`](crate::config::HoldPolicy).

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

use super::{lock, Process, Resource, Transport};

pub struct Driver {
    pid: usize,
    state: Arc<(Mutex<Budget>, Condvar)>,
    // whether the driven process has a request outstanding
    busy: Box<dyn Fn() -> bool + Send + Sync>,
    handle: Option<JoinHandle<()>>,
}

#[derive(Debug, Default)]
struct Budget {
    // acquisitions not started yet
    pending: usize,
    // started but not released yet
    in_flight: usize,
    completed: usize,
    stopped: bool,
}

impl Driver {
    pub fn spawn<T: Transport, R: Resource>(process: Arc<Process<T, R>>) -> Self {
        let pid = process.pid();
        let state = Arc::new((Mutex::new(Budget::default()), Condvar::new()));
        let busy = Box::new({
            let process = Arc::clone(&process);
            move || process.active().is_some()
        });
        let handle = thread::spawn({
            let state = Arc::clone(&state);
            move || run(&process, &state)
        });
        Self {
            pid,
            state,
            busy,
            handle: Some(handle),
        }
    }

    /// Allow `n` more acquisitions
    pub fn add_occupy_times(&self, n: usize) {
        let (budget, cvar) = &*self.state;
        lock(budget).pending += n;
        cvar.notify_all();
    }

    /// Whether budget remains and the process has no request outstanding
    pub fn needs_resource(&self) -> bool {
        lock(&self.state.0).pending > 0 && !(self.busy)()
    }

    pub fn completed(&self) -> usize {
        lock(&self.state.0).completed
    }

    /// Block until the whole budget has been acquired and released.
    pub fn wait_done(&self) {
        let (budget, cvar) = &*self.state;
        drop(
            cvar.wait_while(lock(budget), |b| b.pending + b.in_flight > 0)
                .unwrap_or_else(PoisonError::into_inner),
        );
    }

    /// Stop after the acquisition in flight, dropping any remaining budget.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let (budget, cvar) = &*self.state;
        lock(budget).stopped = true;
        cvar.notify_all();
        if let Some(th) = self.handle.take() {
            if th.join().is_err() {
                error!(pid = self.pid, "driver panicked");
            }
        }
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<T: Transport, R: Resource>(process: &Process<T, R>, state: &(Mutex<Budget>, Condvar)) {
    let (budget, cvar) = state;
    loop {
        {
            let mut b = cvar
                .wait_while(lock(budget), |b| b.pending == 0 && !b.stopped)
                .unwrap_or_else(PoisonError::into_inner);
            if b.stopped {
                break;
            }
            b.pending -= 1;
            b.in_flight += 1;
        }

        match process.request() {
            Ok(ts) => {
                debug!(pid = process.pid(), %ts, "driver requested");
                process.wait_idle();
            }
            Err(e) => error!(pid = process.pid(), error = %e, "driver request failed"),
        }

        let mut b = lock(budget);
        b.in_flight -= 1;
        b.completed += 1;
        drop(b);
        cvar.notify_all();
    }
    debug!(pid = process.pid(), "driver stopped");
}
