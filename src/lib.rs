pub mod cli;
pub mod config;
pub mod events;
pub mod network;
pub mod pipeline;
pub mod program;
pub mod vm;

// Use specific imports rather than assuming re-exports for clarity
pub use crate::config::NetworkConfig;
pub use crate::events::Event;
pub use crate::network::{Network, NetworkEvent, Packet};
pub use crate::program::Program;
pub use crate::vm::{VMError, VMStatus, VM};
