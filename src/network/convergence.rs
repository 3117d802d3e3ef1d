//! Detecting when the NAT settles
//!
//! The network never stops by itself. Observers watch the `y` values the NAT
//! forwards on idle ticks; the first time two consecutive forwards carry the
//! same `y`, the network has reached its steady state.

use futures::channel::mpsc::UnboundedReceiver;
use futures::StreamExt;
use log::info;

use crate::network::events::NetworkEvent;
use crate::network::messages::Packet;
use crate::vm::CancellationToken;

#[derive(Debug, Clone)]
pub struct ConvergenceWatcher {
    nat_address: i64,
    last_forwarded: Option<i64>,
    first_nat_packet: Option<Packet>,
    converged: Option<i64>,
}

impl ConvergenceWatcher {
    pub fn new(nat_address: i64) -> Self {
        Self {
            nat_address,
            last_forwarded: None,
            first_nat_packet: None,
            converged: None,
        }
    }

    /// Feed one event; returns the repeated `y` when this forward repeats the previous one
    pub fn observe(&mut self, event: &NetworkEvent) -> Option<i64> {
        let NetworkEvent::PacketTransmitted { sender, packet } = event else {
            return None;
        };

        if *sender != self.nat_address {
            if packet.recipient == self.nat_address && self.first_nat_packet.is_none() {
                self.first_nat_packet = Some(*packet);
            }
            return None;
        }

        let repeated = self.last_forwarded == Some(packet.y);
        self.last_forwarded = Some(packet.y);
        if !repeated {
            return None;
        }
        if self.converged.is_none() {
            self.converged = Some(packet.y);
        }
        Some(packet.y)
    }

    /// First repeated `y`, once seen
    pub fn converged(&self) -> Option<i64> {
        self.converged
    }

    /// First packet any computer addressed to the NAT
    pub fn first_nat_packet(&self) -> Option<Packet> {
        self.first_nat_packet
    }
}

/// Consume the event stream until convergence, then cancel the network
///
/// Returns when convergence is seen or when the sender side is dropped.
pub async fn watch(
    mut events: UnboundedReceiver<NetworkEvent>,
    mut watcher: ConvergenceWatcher,
    token: CancellationToken,
) -> ConvergenceWatcher {
    while let Some(event) = events.next().await {
        if let Some(y) = watcher.observe(&event) {
            info!("nat converged on y={}", y);
            token.cancel();
            break;
        }
    }
    watcher
}
