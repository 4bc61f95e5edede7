/// Scalar Lamport clock owned by a single process.
///
/// Ticks before every send and merges (max) on every receive, so the value never decreases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LamportClock(u64);

impl LamportClock {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn now(&self) -> u64 {
        self.0
    }
    // Advance for a locally originated event, returns the new time
    pub fn tick(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
    // Merge a received time. Does not tick, the response send does that
    pub fn update(&mut self, t: u64) {
        self.0 = self.0.max(t);
    }
}
