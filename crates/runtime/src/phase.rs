//! Phase barrier of the coordinator.
//!
//! Counts completion signals and decides when the job advances. Shuffle start is
//! reported independently of map completion, reducers are released only after both
//! the mapper and the shuffler counters reached zero.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::worker_agent::ExecutorCounts;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Init,
    Map,
    Shuffle,
    Reduce,
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalKind {
    InitComplete,
    ShuffleStart,
    MapExit,
    ShuffleExit,
    ReduceExit,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalKind::InitComplete => "init-complete",
            SignalKind::ShuffleStart => "shuffle-start",
            SignalKind::MapExit => "map-exit",
            SignalKind::ShuffleExit => "shuffle-exit",
            SignalKind::ReduceExit => "reduce-exit",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    InitComplete(ExecutorCounts),
    ShuffleStart,
    MapExit,
    ShuffleExit,
    ReduceExit,
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::InitComplete(_) => SignalKind::InitComplete,
            Signal::ShuffleStart => SignalKind::ShuffleStart,
            Signal::MapExit => SignalKind::MapExit,
            Signal::ShuffleExit => SignalKind::ShuffleExit,
            Signal::ReduceExit => SignalKind::ReduceExit,
        }
    }
}

/// What the coordinator has to act on after a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Milestone {
    /// All workers are initialized, mappers must be activated.
    InitCompleted,
    ShuffleStarted,
    MapCompleted,
    ShuffleCompleted,
    /// Mappers and shufflers are done, reducers must be activated.
    ReduceReleased,
    ReduceCompleted,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("{signal} is not expected during the {phase:?} phase")]
    UnexpectedSignal { signal: SignalKind, phase: Phase },
    #[error("received more {0} signals than there are executors")]
    CounterUnderflow(SignalKind),
    #[error("init-complete from host {0} which is not awaited")]
    UnexpectedHost(String),
}

#[derive(Debug)]
pub struct PhaseBarrier {
    phase: Phase,
    remaining_inits: usize,
    remaining_mappers: usize,
    remaining_shufflers: usize,
    remaining_reducers: usize,
    totals: ExecutorCounts,
    expected_signals: usize,
    received_signals: usize,
    shuffle_started: bool,
    map_completed: bool,
    shuffle_completed: bool,
}

impl PhaseBarrier {
    pub fn new(worker_count: usize) -> Self {
        PhaseBarrier {
            phase: Phase::Init,
            remaining_inits: worker_count,
            remaining_mappers: 0,
            remaining_shufflers: 0,
            remaining_reducers: 0,
            totals: ExecutorCounts::default(),
            expected_signals: worker_count,
            received_signals: 0,
            shuffle_started: false,
            map_completed: false,
            shuffle_completed: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Executor totals accumulated from init-complete signals.
    pub fn totals(&self) -> ExecutorCounts {
        self.totals
    }

    pub fn remaining(&self) -> (usize, usize, usize, usize) {
        (
            self.remaining_inits,
            self.remaining_mappers,
            self.remaining_shufflers,
            self.remaining_reducers,
        )
    }

    /// Number of signals still expected before the job is done.
    pub fn outstanding(&self) -> usize {
        self.expected_signals - self.received_signals
    }

    pub fn shuffle_started(&self) -> bool {
        self.shuffle_started
    }

    pub fn on_signal(&mut self, signal: Signal) -> Result<Vec<Milestone>, ProtocolError> {
        let kind = signal.kind();
        let unexpected = ProtocolError::UnexpectedSignal {
            signal: kind,
            phase: self.phase,
        };
        let mut milestones = Vec::new();
        match signal {
            Signal::InitComplete(counts) => {
                if self.phase != Phase::Init {
                    return Err(unexpected);
                }
                decrement(&mut self.remaining_inits, kind)?;
                self.totals.mappers += counts.mappers;
                self.totals.shufflers += counts.shufflers;
                self.totals.reducers += counts.reducers;
                if self.remaining_inits == 0 {
                    self.remaining_mappers = self.totals.mappers;
                    self.remaining_shufflers = self.totals.shufflers;
                    self.remaining_reducers = self.totals.reducers;
                    self.expected_signals +=
                        1 + self.totals.mappers + self.totals.shufflers + self.totals.reducers;
                    self.phase = Phase::Map;
                    milestones.push(Milestone::InitCompleted);
                }
            }
            Signal::ShuffleStart => {
                if self.phase == Phase::Init {
                    return Err(unexpected);
                }
                if self.shuffle_started {
                    // Repeated notifications carry no information.
                    return Ok(milestones);
                }
                self.shuffle_started = true;
                milestones.push(Milestone::ShuffleStarted);
            }
            Signal::MapExit => {
                if !matches!(self.phase, Phase::Map | Phase::Shuffle) || self.map_completed {
                    return Err(unexpected);
                }
                decrement(&mut self.remaining_mappers, kind)?;
                if self.remaining_mappers == 0 {
                    self.map_completed = true;
                    self.phase = Phase::Shuffle;
                    milestones.push(Milestone::MapCompleted);
                    self.release_reducers(&mut milestones);
                }
            }
            Signal::ShuffleExit => {
                if !matches!(self.phase, Phase::Map | Phase::Shuffle) || self.shuffle_completed {
                    return Err(unexpected);
                }
                decrement(&mut self.remaining_shufflers, kind)?;
                if self.remaining_shufflers == 0 {
                    self.shuffle_completed = true;
                    milestones.push(Milestone::ShuffleCompleted);
                    self.release_reducers(&mut milestones);
                }
            }
            Signal::ReduceExit => {
                if self.phase != Phase::Reduce {
                    return Err(unexpected);
                }
                decrement(&mut self.remaining_reducers, kind)?;
                if self.remaining_reducers == 0 {
                    self.phase = Phase::Done;
                    milestones.push(Milestone::ReduceCompleted);
                }
            }
        }
        self.received_signals += 1;
        Ok(milestones)
    }

    // A host without reducers has no senders, so either counter may reach zero last.
    fn release_reducers(&mut self, milestones: &mut Vec<Milestone>) {
        if self.map_completed && self.shuffle_completed {
            self.phase = Phase::Reduce;
            milestones.push(Milestone::ReduceReleased);
            if self.remaining_reducers == 0 {
                self.phase = Phase::Done;
                milestones.push(Milestone::ReduceCompleted);
            }
        }
    }
}

fn decrement(counter: &mut usize, kind: SignalKind) -> Result<(), ProtocolError> {
    if *counter == 0 {
        return Err(ProtocolError::CounterUnderflow(kind));
    }
    *counter -= 1;
    Ok(())
}
