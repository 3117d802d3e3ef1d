use serde::{Deserialize, Serialize};
use std::fmt;

/// A packet assembled from three consecutive outputs of a VM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Packet {
    /// Id of the computer (or the NAT) the packet is addressed to
    pub recipient: i64,
    pub x: i64,
    pub y: i64,
}

impl Packet {
    pub fn new(recipient: i64, x: i64, y: i64) -> Self {
        Self { recipient, x, y }
    }

    /// Build a packet from an output triple `[recipient, x, y]`
    pub fn from_triple(triple: &[i64]) -> Option<Self> {
        match *triple {
            [recipient, x, y] => Some(Self { recipient, x, y }),
            _ => None,
        }
    }

    /// The same payload addressed to someone else
    pub fn readdressed(self, recipient: i64) -> Self {
        Self { recipient, ..self }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-> {} (x={}, y={})", self.recipient, self.x, self.y)
    }
}
