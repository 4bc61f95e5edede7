use std::fmt;

use crate::order::Timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Request,
    Ack,
    Release,
}

/// Addressee of a message on the shared log
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Recipient {
    /// Broadcast to every process except the sender
    AllOthers,
    Process(usize),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub sender: usize,
    pub recipient: Recipient,
    /// Sender's clock at send
    pub clock: u64,
    /// Requester's timestamp for REQUEST and RELEASE, empty for ACK
    pub payload: Option<Timestamp>,
}

impl Message {
    pub fn request(sender: usize, clock: u64, ts: Timestamp) -> Self {
        Self {
            kind: MessageKind::Request,
            sender,
            recipient: Recipient::AllOthers,
            clock,
            payload: Some(ts),
        }
    }
    pub fn ack(sender: usize, to: usize, clock: u64) -> Self {
        Self {
            kind: MessageKind::Ack,
            sender,
            recipient: Recipient::Process(to),
            clock,
            payload: None,
        }
    }
    pub fn release(sender: usize, clock: u64, ts: Timestamp) -> Self {
        Self {
            kind: MessageKind::Release,
            sender,
            recipient: Recipient::AllOthers,
            clock,
            payload: Some(ts),
        }
    }
    /// Whether `pid` should react to this message at all.
    ///
    /// Own messages are never for us, and unicasts only for their addressee.
    pub fn is_for(&self, pid: usize) -> bool {
        if self.sender == pid {
            return false;
        }
        match self.recipient {
            Recipient::AllOthers => true,
            Recipient::Process(to) => to == pid,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} P{}", self.kind, self.sender)?;
        match self.recipient {
            Recipient::AllOthers => write!(f, "->*")?,
            Recipient::Process(to) => write!(f, "->P{to}")?,
        }
        write!(f, " @{}", self.clock)?;
        if let Some(ts) = self.payload {
            write!(f, " {ts}")?;
        }
        Ok(())
    }
}
