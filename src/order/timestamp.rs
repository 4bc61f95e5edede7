use std::cmp::Ordering;
use std::fmt;

/// Total-order key of a request: logical time, ties broken by owning process id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timestamp {
    time: u64,
    owner: usize,
}

impl Timestamp {
    pub fn new(time: u64, owner: usize) -> Self {
        debug_assert!(time >= 1, "Expect timestamp taken after a tick, got time={time}");
        Self { time, owner }
    }
    pub fn time(&self) -> u64 {
        self.time
    }
    pub fn owner(&self) -> usize {
        self.owner
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.time, self.owner).cmp(&(other.time, other.owner))
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.time, self.owner)
    }
}
