use futures::channel::mpsc::UnboundedSender;
use log::{debug, info, warn};

use crate::config::NetworkConfig;
use crate::network::computer::Computer;
use crate::network::error::NetworkError;
use crate::network::events::NetworkEvent;
use crate::network::messages::Packet;
use crate::network::nat::Nat;
use crate::vm::{CancellationToken, VMStatus};

/// Why `run_async` stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    /// The cancellation token was set
    Cancelled,
    /// Every computer has halted; further ticks would do nothing
    Halted,
}

/// A fixed set of computers plus the NAT, advanced in discrete ticks
#[derive(Debug)]
pub struct Network {
    computers: Vec<Computer>,
    nat: Nat,
    config: NetworkConfig,
    at_idle: bool,
    ticks: u64,
}

impl Network {
    /// Boot `config.size` computers running `program`
    pub fn new(program: &[i64], config: NetworkConfig) -> Result<Self, NetworkError> {
        config.validate()?;

        let computers = (0..config.size as i64)
            .map(|id| Computer::new(id, program, config.idle_input))
            .collect();
        info!(
            "network of {} computers booted, nat at {}",
            config.size, config.nat_address
        );

        Ok(Self {
            computers,
            nat: Nat::new(config.nat_address),
            config,
            at_idle: false,
            ticks: 0,
        })
    }

    /// Advance every computer once, in id order
    ///
    /// A tick is idle when no packet reached a computer and no computer was
    /// handed a queued packet. An idle tick makes the NAT (if ever written)
    /// send its buffered packet to computer 0.
    pub fn tick(&mut self) -> Result<Vec<NetworkEvent>, NetworkError> {
        self.tick_inner(None)
    }

    fn tick_inner(&mut self, token: Option<&CancellationToken>) -> Result<Vec<NetworkEvent>, NetworkError> {
        self.ticks += 1;
        self.at_idle = true;
        let mut events = Vec::new();

        for index in 0..self.computers.len() {
            let computer = &mut self.computers[index];
            let sender = computer.id();
            let was_halted = computer.status() == VMStatus::Halted;

            let report = computer
                .tick(token)
                .map_err(|source| NetworkError::Vm { id: sender, source })?;

            if report.received {
                self.at_idle = false;
            }
            if report.status == VMStatus::Halted && !was_halted {
                info!("computer {} halted", sender);
                events.push(NetworkEvent::ComputerHalted { id: sender });
            }

            for packet in report.packets {
                self.route(sender, packet);
                events.push(NetworkEvent::PacketTransmitted { sender, packet });
            }

            if report.status == VMStatus::Cancelled {
                debug!("tick {} cancelled at computer {}", self.ticks, sender);
                return Ok(events);
            }
        }

        if self.at_idle {
            if let Some(packet) = self.nat.forward_to(0) {
                info!("tick {}: network idle, nat sends y={} to 0", self.ticks, packet.y);
                self.computers[0].enqueue_packet(packet);
                events.push(NetworkEvent::PacketTransmitted {
                    sender: self.nat.address(),
                    packet,
                });
            }
        }

        Ok(events)
    }

    fn route(&mut self, sender: i64, packet: Packet) {
        if packet.recipient == self.nat.address() {
            self.nat.store(packet);
        } else if self.config.is_computer(packet.recipient) {
            let recipient = &mut self.computers[packet.recipient as usize];
            if recipient.status() == VMStatus::Halted {
                debug!("dropping packet from {} to halted computer {}", sender, packet.recipient);
                return;
            }
            debug!("{} {}", sender, packet);
            recipient.enqueue_packet(packet);
            self.at_idle = false;
        } else {
            warn!("dropping packet from {} to unknown address {}", sender, packet.recipient);
        }
    }

    /// Tick until cancelled or every computer halts, streaming events to `events`
    ///
    /// Yields to the scheduler after each tick so consumers of the event
    /// stream running on the same task make progress.
    pub async fn run_async(
        &mut self,
        token: &CancellationToken,
        events: UnboundedSender<NetworkEvent>,
    ) -> Result<NetworkStatus, NetworkError> {
        loop {
            if token.is_cancelled() {
                info!("network cancelled after {} ticks", self.ticks);
                return Ok(NetworkStatus::Cancelled);
            }
            if self.all_halted() {
                info!("all computers halted after {} ticks", self.ticks);
                return Ok(NetworkStatus::Halted);
            }

            for event in self.tick_inner(Some(token))? {
                if events.unbounded_send(event).is_err() {
                    debug!("event receiver dropped");
                }
            }
            tokio::task::yield_now().await;
        }
    }

    /// Whether the most recent tick was idle
    pub fn at_idle(&self) -> bool {
        self.at_idle
    }

    pub fn nat(&self) -> &Nat {
        &self.nat
    }

    pub fn computer(&self, id: i64) -> Option<&Computer> {
        usize::try_from(id).ok().and_then(|index| self.computers.get(index))
    }

    /// Deliver a packet from outside the network, as if routed normally
    ///
    /// Returns false when the recipient is not a running computer.
    pub fn enqueue_packet(&mut self, packet: Packet) -> bool {
        if !self.config.is_computer(packet.recipient) {
            return false;
        }
        let recipient = &mut self.computers[packet.recipient as usize];
        if recipient.status() == VMStatus::Halted {
            return false;
        }
        recipient.enqueue_packet(packet);
        true
    }

    pub fn computers(&self) -> &[Computer] {
        &self.computers
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Number of ticks started so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn all_halted(&self) -> bool {
        self.computers
            .iter()
            .all(|computer| computer.status() == VMStatus::Halted)
    }
}
