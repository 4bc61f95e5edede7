/// Latest logical time heard from every *other* process.
#[derive(Clone, Debug)]
pub struct ReceivedTime {
    pid: usize,
    // indexed by process id, own slot unused
    times: Vec<u64>,
}

impl ReceivedTime {
    pub fn new(pid: usize, n_procs: usize) -> Self {
        assert!(
            pid < n_procs,
            "Expect 0-based index of process {pid} < n_procs={n_procs}"
        );
        Self {
            pid,
            times: vec![0; n_procs],
        }
    }
    /// Raise the high-water mark for `peer`. Stale values and own id are ignored.
    pub fn update(&mut self, peer: usize, t: u64) {
        if peer == self.pid {
            return;
        }
        if let Some(slot) = self.times.get_mut(peer) {
            *slot = (*slot).max(t);
        }
    }
    pub fn get(&self, peer: usize) -> Option<u64> {
        (peer != self.pid).then(|| self.times.get(peer).copied()).flatten()
    }
    /// Time of the slowest-informed peer, `None` when there are no peers at all.
    pub fn min(&self) -> Option<u64> {
        self.peers().map(|(_, t)| t).min()
    }
    fn peers(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.times
            .iter()
            .copied()
            .enumerate()
            .filter(move |(j, _)| *j != self.pid)
    }
}
