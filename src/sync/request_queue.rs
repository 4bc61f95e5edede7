use crate::order::Timestamp;

/// Multiset of requests a process believes are pending.
///
/// A handful of peers in practice, so a plain Vec with linear scans is enough.
#[derive(Clone, Debug, Default)]
pub struct RequestQueue {
    pending: Vec<Timestamp>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn push(&mut self, ts: Timestamp) {
        self.pending.push(ts);
    }
    /// Remove one matching entry. Returns false if absent, which is not an error since messages race.
    pub fn remove(&mut self, ts: &Timestamp) -> bool {
        match self.pending.iter().position(|p| p == ts) {
            Some(i) => {
                self.pending.swap_remove(i);
                true
            }
            None => false,
        }
    }
    /// Highest priority pending request by the total order, never by insertion order
    pub fn min(&self) -> Option<&Timestamp> {
        self.pending.iter().min()
    }
    pub fn len(&self) -> usize {
        self.pending.len()
    }
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
    pub fn contains(&self, ts: &Timestamp) -> bool {
        self.pending.contains(ts)
    }
}
