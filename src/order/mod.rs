pub mod lamport_clock;
pub mod timestamp;

pub use lamport_clock::LamportClock;
pub use timestamp::Timestamp;
