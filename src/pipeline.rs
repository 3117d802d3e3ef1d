//! VMs wired output-to-input
//!
//! Each stage reads from the queue the previous stage writes to. In a
//! feedback ring the first stage also reads what the last stage writes. Every
//! stage first receives its phase setting; the first stage then receives the
//! initial signal `0`.

use log::debug;

use crate::vm::{CancellationToken, VMError, VMStatus, VM};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Stages run in a line; the last output leaves the pipeline
    Chain,
    /// The last stage feeds back into the first
    Feedback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The last stage halted; carries the last value it emitted, if any
    Finished(Option<i64>),
    /// Every running stage is waiting for input nobody will send
    Stalled,
    Cancelled,
}

#[derive(Debug)]
pub struct Pipeline {
    stages: Vec<VM>,
}

impl Pipeline {
    /// One stage per phase, all running `program`
    pub fn new(program: &[i64], phases: &[i64], topology: Topology) -> Self {
        let mut stages: Vec<VM> = (0..phases.len())
            .map(|index| VM::with_id(program, index as i64))
            .collect();

        for index in 1..stages.len() {
            let upstream = stages[index - 1].output().clone();
            stages[index].connect_input(upstream);
        }
        if topology == Topology::Feedback {
            if let Some(last) = stages.last().map(|stage| stage.output().clone()) {
                stages[0].connect_input(last);
            }
        }

        for (stage, phase) in stages.iter().zip(phases) {
            stage.push_input(*phase);
        }
        if let Some(first) = stages.first() {
            first.push_input(0);
        }

        Self { stages }
    }

    pub fn stages(&self) -> &[VM] {
        &self.stages
    }

    /// Run the stages round-robin until the last one halts
    pub fn run(&mut self, token: &CancellationToken) -> Result<PipelineOutcome, VMError> {
        let mut signal = None;
        if self.stages.is_empty() {
            return Ok(PipelineOutcome::Finished(signal));
        }

        loop {
            if token.is_cancelled() {
                return Ok(PipelineOutcome::Cancelled);
            }

            let mut progressed = false;
            for stage in self.stages.iter_mut().filter(|stage| !stage.is_halted()) {
                let before = stage.steps();
                if stage.run_with_cancel(token)? == VMStatus::Cancelled {
                    return Ok(PipelineOutcome::Cancelled);
                }
                progressed |= stage.steps() != before;
            }

            let last = &self.stages[self.stages.len() - 1];
            if let Some(value) = last.output().snapshot().last() {
                signal = Some(*value);
            }
            if last.is_halted() {
                debug!("pipeline finished with signal {:?}", signal);
                return Ok(PipelineOutcome::Finished(signal));
            }
            if !progressed {
                debug!("pipeline stalled");
                return Ok(PipelineOutcome::Stalled);
            }
        }
    }
}

/// Try every ordering of `candidates` and return the strongest final signal
pub fn best_phase_setting(
    program: &[i64],
    candidates: &[i64],
    topology: Topology,
) -> Result<Option<(i64, Vec<i64>)>, VMError> {
    let token = CancellationToken::new();
    let mut best: Option<(i64, Vec<i64>)> = None;

    for phases in permutations(candidates) {
        let mut pipeline = Pipeline::new(program, &phases, topology);
        if let PipelineOutcome::Finished(Some(signal)) = pipeline.run(&token)? {
            if best.as_ref().map_or(true, |(current, _)| signal > *current) {
                best = Some((signal, phases));
            }
        }
    }

    Ok(best)
}

fn permutations(items: &[i64]) -> Vec<Vec<i64>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }

    let mut result = Vec::new();
    for index in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(index);
        for mut tail in permutations(&rest) {
            tail.insert(0, head);
            result.push(tail);
        }
    }
    result
}
