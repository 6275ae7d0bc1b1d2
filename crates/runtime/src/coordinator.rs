//! Simulation component on the master host, drives the job through its phases.

use std::{cell::RefCell, collections::BTreeSet, rc::Rc};

use dslab_core::{cast, log_debug, log_error, log_info, Event, EventHandler, Id, SimulationContext};
use dslab_network::Network;

use crate::{
    context::JobContext,
    events::{
        ActivateMappers, ActivateReducers, InitCompleted, LaunchExecutors, MapperExited, ReducerExited,
        ShuffleSenderExited, ShuffleStarted, Start,
    },
    phase::{Milestone, Phase, PhaseBarrier, ProtocolError, Signal},
    trace::{Trace, TraceEvent},
    worker_agent::ExecutorCounts,
};

pub struct Coordinator {
    job: Rc<JobContext>,
    workers: Vec<Id>,
    awaited_inits: BTreeSet<String>,
    network: Rc<RefCell<Network>>,
    barrier: PhaseBarrier,
    trace: Trace,
    ctx: SimulationContext,
}

impl Coordinator {
    pub fn new(job: Rc<JobContext>, workers: Vec<Id>, network: Rc<RefCell<Network>>, ctx: SimulationContext) -> Self {
        let awaited_inits = job
            .registry()
            .workers()
            .map(|host| host.borrow().name().to_string())
            .collect();
        Coordinator {
            barrier: PhaseBarrier::new(workers.len()),
            job,
            workers,
            awaited_inits,
            network,
            trace: Trace::new(),
            ctx,
        }
    }

    pub fn phase(&self) -> Phase {
        self.barrier.phase()
    }

    pub fn barrier(&self) -> &PhaseBarrier {
        &self.barrier
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    fn delay_to(&self, worker: Id) -> f64 {
        self.network.borrow().latency(self.ctx.id(), worker)
    }

    fn start(&mut self) {
        log_info!(self.ctx, "INITIALIZATION BEGIN");
        self.trace.log(TraceEvent::PhaseStarted {
            time: self.ctx.time(),
            phase: Phase::Init,
        });
        for &worker in self.workers.iter() {
            self.ctx.emit(LaunchExecutors {}, worker, self.delay_to(worker));
        }
    }

    fn on_signal(&mut self, signal: Signal) {
        match self.barrier.on_signal(signal) {
            Ok(milestones) => {
                for milestone in milestones {
                    self.on_milestone(milestone);
                }
            }
            Err(e) => self.protocol_error(e),
        }
    }

    fn protocol_error(&mut self, error: ProtocolError) {
        log_error!(self.ctx, "protocol error: {}", error);
        self.job.stats_mut().register_protocol_error();
        self.trace.log(TraceEvent::ProtocolError {
            time: self.ctx.time(),
            message: error.to_string(),
        });
    }

    fn on_milestone(&mut self, milestone: Milestone) {
        let time = self.ctx.time();
        match milestone {
            Milestone::InitCompleted => {
                let totals = self.barrier.totals();
                log_info!(self.ctx, "INITIALIZATION COMPLETE");
                log_debug!(
                    self.ctx,
                    "{} mappers, {} shuffle senders, {} reducers in the cluster",
                    totals.mappers,
                    totals.shufflers,
                    totals.reducers
                );
                self.trace.log(TraceEvent::PhaseCompleted { time, phase: Phase::Init });
                log_info!(self.ctx, "MAP PHASE BEGIN");
                self.trace.log(TraceEvent::PhaseStarted { time, phase: Phase::Map });
                {
                    let mut stats = self.job.stats_mut();
                    stats.phases.init_completed = Some(time);
                    stats.phases.map_started = Some(time);
                }
                for &worker in self.workers.iter() {
                    self.ctx.emit(ActivateMappers {}, worker, self.delay_to(worker));
                }
            }
            Milestone::ShuffleStarted => {
                log_info!(self.ctx, "SHUFFLE PHASE BEGIN");
                self.trace.log(TraceEvent::PhaseStarted {
                    time,
                    phase: Phase::Shuffle,
                });
                self.job.stats_mut().phases.shuffle_started = Some(time);
            }
            Milestone::MapCompleted => {
                log_info!(self.ctx, "MAP PHASE COMPLETE");
                self.trace.log(TraceEvent::PhaseCompleted { time, phase: Phase::Map });
                self.job.stats_mut().phases.map_completed = Some(time);
            }
            Milestone::ShuffleCompleted => {
                log_info!(self.ctx, "SHUFFLE PHASE COMPLETE");
                self.trace.log(TraceEvent::PhaseCompleted {
                    time,
                    phase: Phase::Shuffle,
                });
                self.job.stats_mut().phases.shuffle_completed = Some(time);
            }
            Milestone::ReduceReleased => {
                log_info!(self.ctx, "REDUCE PHASE BEGIN");
                self.trace.log(TraceEvent::PhaseStarted {
                    time,
                    phase: Phase::Reduce,
                });
                self.job.stats_mut().phases.reduce_started = Some(time);
                for &worker in self.workers.iter() {
                    self.ctx.emit(ActivateReducers {}, worker, self.delay_to(worker));
                }
            }
            Milestone::ReduceCompleted => {
                log_info!(self.ctx, "REDUCE PHASE COMPLETE");
                self.trace.log(TraceEvent::PhaseCompleted {
                    time,
                    phase: Phase::Reduce,
                });
                self.job.stats_mut().phases.reduce_completed = Some(time);
            }
        }
    }
}

impl EventHandler for Coordinator {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            Start {} => {
                self.start();
            }
            InitCompleted {
                host,
                mappers,
                shufflers,
                reducers,
            } => {
                if self.awaited_inits.remove(&host) {
                    log_debug!(self.ctx, "{} initialized", host);
                    self.on_signal(Signal::InitComplete(ExecutorCounts {
                        mappers,
                        shufflers,
                        reducers,
                    }));
                } else {
                    self.protocol_error(ProtocolError::UnexpectedHost(host));
                }
            }
            ShuffleStarted { sender } => {
                log_debug!(self.ctx, "first shuffle transfer by {}", sender);
                self.on_signal(Signal::ShuffleStart);
            }
            MapperExited { mapper } => {
                log_debug!(self.ctx, "{} exited", mapper);
                self.on_signal(Signal::MapExit);
            }
            ShuffleSenderExited { sender } => {
                log_debug!(self.ctx, "{} exited", sender);
                self.on_signal(Signal::ShuffleExit);
            }
            ReducerExited { reducer } => {
                log_debug!(self.ctx, "{} exited", reducer);
                self.on_signal(Signal::ReduceExit);
            }
        })
    }
}
