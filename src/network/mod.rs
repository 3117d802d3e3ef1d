//! Simulated packet-switched network of VMs
//!
//! A fixed set of computers, each running its own VM, exchange packets
//! through the network. A NAT buffers the last packet addressed to it and
//! forwards it to computer 0 whenever a whole tick passes with no traffic.
//! Concurrency is simulated by ticking the computers round-robin on one
//! logical thread.

mod computer;
mod convergence;
mod error;
mod events;
mod messages;
mod nat;
mod network;
#[cfg(test)]
mod tests;

pub use computer::{Computer, TickReport};
pub use convergence::{watch, ConvergenceWatcher};
pub use error::NetworkError;
pub use events::NetworkEvent;
pub use messages::Packet;
pub use nat::Nat;
pub use network::{Network, NetworkStatus};
