use std::collections::VecDeque;

use log::{debug, trace};

use crate::network::messages::Packet;
use crate::vm::{CancellationToken, VMError, VMStatus, VM};

/// What a computer did during one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Packets completed from the VM's output, in emission order
    pub packets: Vec<Packet>,

    /// Status the VM was left in
    pub status: VMStatus,

    /// Whether a queued packet was handed to the VM
    pub received: bool,
}

/// One network node: a VM with an identity and a private packet queue
#[derive(Debug)]
pub struct Computer {
    id: i64,
    vm: VM,
    queue: VecDeque<Packet>,
    partial: Vec<i64>,
    idle_input: i64,
}

impl Computer {
    /// Load `program` and boot it by queueing the computer's own id
    pub fn new(id: i64, program: &[i64], idle_input: i64) -> Self {
        let vm = VM::with_id(program, id);
        vm.push_input(id);
        Self {
            id,
            vm,
            queue: VecDeque::new(),
            partial: Vec::new(),
            idle_input,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn vm(&self) -> &VM {
        &self.vm
    }

    pub fn status(&self) -> VMStatus {
        self.vm.status()
    }

    /// Packets waiting to be handed to the VM
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Append a packet to the private queue without running the VM
    pub fn enqueue_packet(&mut self, packet: Packet) {
        self.queue.push_back(packet);
    }

    /// Run the VM until it blocks, collect finished packets, then feed input
    ///
    /// When the VM is left awaiting input, it is given the next queued
    /// packet's `x` and `y`, or the idle value if nothing is queued. The VM
    /// consumes that input on the following tick.
    pub fn tick(&mut self, token: Option<&CancellationToken>) -> Result<TickReport, VMError> {
        let status = match token {
            Some(token) => self.vm.run_with_cancel(token)?,
            None => self.vm.run()?,
        };

        self.partial.extend(self.vm.take_output());
        let complete = self.partial.len() - self.partial.len() % 3;
        let packets: Vec<Packet> = self
            .partial
            .drain(..complete)
            .collect::<Vec<_>>()
            .chunks_exact(3)
            .filter_map(Packet::from_triple)
            .collect();
        for packet in &packets {
            trace!("computer {} emitted {}", self.id, packet);
        }

        let mut received = false;
        if status == VMStatus::AwaitingInput {
            match self.queue.pop_front() {
                Some(packet) => {
                    debug!("computer {} receives x={} y={}", self.id, packet.x, packet.y);
                    self.vm.push_input(packet.x);
                    self.vm.push_input(packet.y);
                    received = true;
                }
                None => self.vm.push_input(self.idle_input),
            }
        }

        Ok(TickReport {
            packets,
            status,
            received,
        })
    }
}
