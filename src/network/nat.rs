use log::debug;

use crate::network::messages::Packet;

/// Not-Always-Transmitting buffer
///
/// Holds the most recent packet addressed to it. Once written, the packet
/// stays buffered and is re-sent every time the network goes idle.
#[derive(Debug, Clone)]
pub struct Nat {
    address: i64,
    buffered: Option<Packet>,
    forwarded: u64,
}

impl Nat {
    pub fn new(address: i64) -> Self {
        Self {
            address,
            buffered: None,
            forwarded: 0,
        }
    }

    /// Reserved recipient id of the NAT
    pub fn address(&self) -> i64 {
        self.address
    }

    /// Replace the buffered packet
    pub fn store(&mut self, packet: Packet) {
        debug!("nat buffered x={} y={}", packet.x, packet.y);
        self.buffered = Some(packet);
    }

    /// Whether any packet has ever been stored
    pub fn has_been_written(&self) -> bool {
        self.buffered.is_some()
    }

    pub fn buffered(&self) -> Option<Packet> {
        self.buffered
    }

    /// The buffered packet re-addressed to `recipient`, counting the forward
    pub fn forward_to(&mut self, recipient: i64) -> Option<Packet> {
        let packet = self.buffered?.readdressed(recipient);
        self.forwarded += 1;
        Some(packet)
    }

    /// Number of idle-break forwards so far
    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut nat = Nat::new(255);
        assert!(!nat.has_been_written());
        assert_eq!(nat.forward_to(0), None);

        nat.store(Packet::new(255, 1, 2));
        nat.store(Packet::new(255, 3, 4));
        assert!(nat.has_been_written());
        assert_eq!(nat.forward_to(0), Some(Packet::new(0, 3, 4)));

        // Forwarding keeps the packet buffered
        assert_eq!(nat.forward_to(0), Some(Packet::new(0, 3, 4)));
        assert_eq!(nat.forwarded(), 2);
        assert_eq!(nat.address(), 255);
    }
}
