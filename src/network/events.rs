use serde::{Deserialize, Serialize};

use crate::network::messages::Packet;

/// Events produced while the network runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkEvent {
    /// A packet left `sender`; the NAT forwarding a packet uses the NAT address as sender
    PacketTransmitted { sender: i64, packet: Packet },

    /// A computer's VM executed its halt instruction
    ComputerHalted { id: i64 },
}
