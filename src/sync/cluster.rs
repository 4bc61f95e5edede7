//! Bootstrapping of an in-process cluster sharing one multicast log.

use std::sync::Arc;

use tracing::info;

use super::{MulticastLog, Process, Resource};
use crate::config::ClusterConfig;
use crate::error::{Error, Result};

/// N processes wired to one [`MulticastLog`] and one shared resource.
///
/// Every process is subscribed before `start` returns, so nothing can be published
/// before all of them listen.
pub struct Cluster<R: Resource> {
    log: MulticastLog,
    resource: Arc<R>,
    processes: Vec<Arc<Process<MulticastLog, R>>>,
}

impl<R: Resource> Cluster<R> {
    /// # Errors
    ///
    /// Returns an error if `config` is invalid.
    pub fn start(config: &ClusterConfig, resource: Arc<R>) -> Result<Self> {
        config.validate()?;
        let n = config.processes;
        let log = MulticastLog::new();
        let processes = (0..n)
            .map(|pid| {
                Process::spawn(pid, n, log.clone(), Arc::clone(&resource), config.hold)
                    .map(Arc::new)
            })
            .collect::<Result<Vec<_>>>()?;
        info!(processes = n, hold = ?config.hold, "cluster started");
        Ok(Self {
            log,
            resource,
            processes,
        })
    }

    /// # Errors
    ///
    /// [`Error::UnknownProcess`] for an id outside the cluster.
    pub fn process(&self, pid: usize) -> Result<&Arc<Process<MulticastLog, R>>> {
        self.processes.get(pid).ok_or(Error::UnknownProcess {
            pid,
            n_procs: self.processes.len(),
        })
    }
    pub fn processes(&self) -> &[Arc<Process<MulticastLog, R>>] {
        &self.processes
    }
    pub fn len(&self) -> usize {
        self.processes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
    pub fn resource(&self) -> &Arc<R> {
        &self.resource
    }
    pub fn transport(&self) -> &MulticastLog {
        &self.log
    }

    /// Block until no process has an outstanding request.
    pub fn wait_idle(&self) {
        self.processes.iter().for_each(|p| p.wait_idle());
    }

    /// Close the log and join every process. Requests still pending are abandoned.
    pub fn shutdown(self) {
        self.log.close();
        self.processes.iter().for_each(|p| p.join());
        info!(published = self.log.published(), "cluster stopped");
    }
}
