use std::collections::{HashMap, HashSet};

use dslab_core::Id;
use dslab_hadoop_cluster::{host_state::HostState, task::Task};

use super::ExecutorState;

#[derive(Debug, PartialEq)]
pub enum SenderStep {
    /// Send this task to its destination host.
    Transfer(Task),
    /// Nothing queued yet but local mappers may still produce work.
    Wait,
    /// Queue drained and no mappers left on the host.
    Exit,
}

/// Sends map outputs from its host to reducer hosts.
///
/// Senders are not gated: they start polling as soon as they are launched.
#[derive(Debug)]
pub struct ShuffleSender {
    name: String,
    state: ExecutorState,
    transfer_started_at: Option<f64>,
    transfers: u64,
}

impl ShuffleSender {
    pub fn new(name: String) -> Self {
        ShuffleSender {
            name,
            state: ExecutorState::Running,
            transfer_started_at: None,
            transfers: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    pub fn transfers(&self) -> u64 {
        self.transfers
    }

    pub fn is_transferring(&self) -> bool {
        self.transfer_started_at.is_some()
    }

    pub fn next_step(&mut self, host: &mut HostState) -> SenderStep {
        if self.state == ExecutorState::Done {
            return SenderStep::Exit;
        }
        if let Some(task) = host.pop_shuffle_task() {
            SenderStep::Transfer(task)
        } else if host.active_mappers() > 0 {
            SenderStep::Wait
        } else {
            self.state = ExecutorState::Done;
            SenderStep::Exit
        }
    }

    pub fn start_transfer(&mut self, now: f64) {
        self.transfer_started_at = Some(now);
    }

    /// Returns the transfer duration, or `None` if no transfer was in flight.
    pub fn finish_transfer(&mut self, now: f64) -> Option<f64> {
        let started_at = self.transfer_started_at.take()?;
        self.transfers += 1;
        Some(now - started_at)
    }
}

/// Acknowledgement produced by a receiver for the sender that addressed it.
#[derive(Debug, PartialEq, Eq)]
pub struct Delivery {
    pub receiver: String,
    pub sender_host: Id,
    pub sender: usize,
}

/// Ephemeral receiver spawned on the destination host for exactly one transfer.
#[derive(Debug)]
pub struct ShuffleReceiver {
    name: String,
    sender_host: Id,
    sender: usize,
}

impl ShuffleReceiver {
    pub fn new(name: String, sender_host: Id, sender: usize) -> Self {
        ShuffleReceiver {
            name,
            sender_host,
            sender,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Consumes the inbound transfer. The receiver is gone afterwards.
    pub fn accept(self) -> Delivery {
        Delivery {
            receiver: self.name,
            sender_host: self.sender_host,
            sender: self.sender,
        }
    }
}

/// Pairs spawned receivers with completed network transfers by transfer id.
///
/// The receiver spawn and the transfer completion may arrive in either order,
/// a receiver is handed out once both have been seen.
#[derive(Debug, Default)]
pub struct ReceiverSlots {
    waiting: HashMap<usize, ShuffleReceiver>,
    // Transfers that completed before their receiver was spawned.
    early_transfers: HashSet<usize>,
}

impl ReceiverSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawned(&mut self, transfer_id: usize, receiver: ShuffleReceiver) -> Option<ShuffleReceiver> {
        if self.early_transfers.remove(&transfer_id) {
            Some(receiver)
        } else {
            self.waiting.insert(transfer_id, receiver);
            None
        }
    }

    pub fn transfer_completed(&mut self, transfer_id: usize) -> Option<ShuffleReceiver> {
        let receiver = self.waiting.remove(&transfer_id);
        if receiver.is_none() {
            self.early_transfers.insert(transfer_id);
        }
        receiver
    }

    /// Receivers and transfers still waiting for their counterpart.
    pub fn pending(&self) -> usize {
        self.waiting.len() + self.early_transfers.len()
    }
}
