//! Simulation component of a worker host.
//!
//! Drives every executor launched on the host. Mappers, shuffle senders and reducers
//! are addressed by their index, shuffle receivers live only until their transfer is
//! consumed.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use dslab_core::{cast, log_debug, log_error, log_warn, Event, EventHandler, Id, SimulationContext};
use dslab_hadoop_cluster::{registry::HostRef, task::Task};
use dslab_network::{DataTransferCompleted, Network};

use crate::{
    context::JobContext,
    events::{
        ActivateMappers, ActivateReducers, InitCompleted, InitTaskExecuted, LaunchExecutors, MapTaskExecuted,
        MapperExited, ReduceTaskExecuted, ReducerExited, ShuffleDelivered, ShufflePoll, ShuffleSenderExited,
        ShuffleStarted, SpawnShuffleReceiver,
    },
    executors::{
        mapper::{Mapper, MapperStep},
        reducer::Reducer,
        shuffle::{ReceiverSlots, SenderStep, ShuffleReceiver, ShuffleSender},
    },
};

pub struct WorkerHost {
    host: HostRef,
    job: Rc<JobContext>,
    coordinator: Id,
    agents: Rc<BTreeMap<String, Id>>,
    network: Rc<RefCell<Network>>,
    mappers: Vec<Mapper>,
    senders: Vec<ShuffleSender>,
    reducers: Vec<Reducer>,
    receivers: ReceiverSlots,
    spawned_receivers: u64,
    ctx: SimulationContext,
}

impl WorkerHost {
    pub fn new(
        host: HostRef,
        job: Rc<JobContext>,
        coordinator: Id,
        agents: Rc<BTreeMap<String, Id>>,
        network: Rc<RefCell<Network>>,
        ctx: SimulationContext,
    ) -> Self {
        WorkerHost {
            host,
            job,
            coordinator,
            agents,
            network,
            mappers: Vec::new(),
            senders: Vec::new(),
            reducers: Vec::new(),
            receivers: ReceiverSlots::new(),
            spawned_receivers: 0,
            ctx,
        }
    }

    fn coordinator_delay(&self) -> f64 {
        self.network.borrow().latency(self.ctx.id(), self.coordinator)
    }

    fn launch_executors(&mut self) {
        let job = self.job.clone();
        let agent = job.worker_agent();
        let (launched, init_time) = {
            let mut host = self.host.borrow_mut();
            let launched = agent.launch(&mut host);
            let init_time = agent.init_task(&host).execution_time(host.speed());
            (launched, init_time)
        };
        let counts = launched.counts();
        log_debug!(
            self.ctx,
            "launched {} mappers, {} shuffle senders, {} reducers",
            counts.mappers,
            counts.shufflers,
            counts.reducers
        );
        self.mappers = launched.mappers;
        self.senders = launched.senders;
        self.reducers = launched.reducers;

        for sender in 0..self.senders.len() {
            self.ctx.emit_now(ShufflePoll { sender }, self.ctx.id());
        }
        self.ctx.emit(InitTaskExecuted {}, self.ctx.id(), init_time);
    }

    fn report_init(&self) {
        let host = self.host.borrow();
        self.ctx.emit(
            InitCompleted {
                host: host.name().to_string(),
                mappers: self.mappers.len(),
                shufflers: self.senders.len(),
                reducers: self.reducers.len(),
            },
            self.coordinator,
            self.coordinator_delay(),
        );
    }

    fn activate_mappers(&mut self) {
        for mapper in 0..self.mappers.len() {
            if let Err(e) = self.mappers[mapper].activate() {
                log_error!(self.ctx, "{}", e);
                continue;
            }
            self.step_mapper(mapper);
        }
    }

    fn step_mapper(&mut self, mapper: usize) {
        let step = self.mappers[mapper].next_step(&mut self.host.borrow_mut());
        match step {
            MapperStep::Blocked => {}
            MapperStep::Execute { elapsed } => {
                self.ctx.emit(MapTaskExecuted { mapper, elapsed }, self.ctx.id(), elapsed);
            }
            MapperStep::Exit => {
                let name = self.mappers[mapper].name().to_string();
                log_debug!(self.ctx, "{} exited", name);
                self.ctx
                    .emit(MapperExited { mapper: name }, self.coordinator, self.coordinator_delay());
            }
        }
    }

    fn map_task_executed(&mut self, mapper: usize, elapsed: f64) {
        self.mappers[mapper].task_completed();
        self.job.stats_mut().register_map_task(elapsed);
        let partitions = self
            .job
            .distributor()
            .partition(&self.host, self.job.params().shuffle_bytes());
        log_debug!(
            self.ctx,
            "{} finished a map task, {} partitions queued for shuffle",
            self.mappers[mapper].name(),
            partitions
        );
        self.step_mapper(mapper);
    }

    fn step_sender(&mut self, sender: usize) {
        let step = self.senders[sender].next_step(&mut self.host.borrow_mut());
        match step {
            SenderStep::Transfer(task) => self.start_transfer(sender, task),
            SenderStep::Wait => {
                let interval = self.job.params().cost_model.shuffle_poll_interval;
                self.ctx.emit(ShufflePoll { sender }, self.ctx.id(), interval);
            }
            SenderStep::Exit => {
                let name = self.senders[sender].name().to_string();
                log_debug!(self.ctx, "{} exited after {} transfers", name, self.senders[sender].transfers());
                self.ctx
                    .emit(ShuffleSenderExited { sender: name }, self.coordinator, self.coordinator_delay());
            }
        }
    }

    fn start_transfer(&mut self, sender: usize, task: Task) {
        let sender_name = self.senders[sender].name().to_string();
        let destination = match task.destination.as_deref() {
            Some(destination) => destination,
            None => {
                log_error!(self.ctx, "{} got a shuffle task without destination", sender_name);
                self.step_sender(sender);
                return;
            }
        };
        let receiver_host = match self.agents.get(destination).copied() {
            Some(receiver_host) => receiver_host,
            None => {
                log_error!(self.ctx, "{} got a shuffle task for unknown host {}", sender_name, destination);
                self.step_sender(sender);
                return;
            }
        };

        if self.job.claim_shuffle_start() {
            log_debug!(self.ctx, "{} starts the first shuffle transfer", sender_name);
            self.ctx.emit(
                ShuffleStarted {
                    sender: sender_name.clone(),
                },
                self.coordinator,
                self.coordinator_delay(),
            );
        }

        let transfer_id =
            self.network
                .borrow_mut()
                .transfer_data(self.ctx.id(), receiver_host, task.comm_cost, receiver_host);
        let receiver = format!("{}->{}-receiver-{}", sender_name, destination, self.spawned_receivers);
        self.spawned_receivers += 1;
        log_debug!(
            self.ctx,
            "{} sends {} bytes to {} (transfer {})",
            sender_name,
            task.comm_cost,
            destination,
            transfer_id
        );
        self.ctx.emit_now(
            SpawnShuffleReceiver {
                receiver,
                transfer_id,
                sender_host: self.ctx.id(),
                sender,
            },
            receiver_host,
        );
        self.senders[sender].start_transfer(self.ctx.time());
    }

    fn deliver(&mut self, receiver: ShuffleReceiver) {
        let delivery = receiver.accept();
        log_debug!(self.ctx, "{} consumed its transfer", delivery.receiver);
        self.ctx.emit_now(
            ShuffleDelivered {
                receiver: delivery.receiver,
                sender: delivery.sender,
            },
            delivery.sender_host,
        );
    }

    fn activate_reducers(&mut self) {
        let job = self.job.clone();
        let mut host = self.host.borrow_mut();
        let tasks = job.worker_agent().create_reduce_tasks(&mut host);
        log_debug!(self.ctx, "{} reduce tasks created", tasks);
        for reducer in 0..self.reducers.len() {
            match self.reducers[reducer].activate(&mut host) {
                Ok(Some(elapsed)) => {
                    self.ctx
                        .emit(ReduceTaskExecuted { reducer, elapsed }, self.ctx.id(), elapsed);
                }
                Ok(None) => log_error!(self.ctx, "no reduce task for {}", self.reducers[reducer].name()),
                Err(e) => log_error!(self.ctx, "{}", e),
            }
        }
    }
}

impl EventHandler for WorkerHost {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            LaunchExecutors {} => {
                self.launch_executors();
            }
            InitTaskExecuted {} => {
                self.report_init();
            }
            ActivateMappers {} => {
                self.activate_mappers();
            }
            MapTaskExecuted { mapper, elapsed } => {
                self.map_task_executed(mapper, elapsed);
            }
            ShufflePoll { sender } => {
                self.step_sender(sender);
            }
            SpawnShuffleReceiver {
                receiver,
                transfer_id,
                sender_host,
                sender,
            } => {
                let receiver = ShuffleReceiver::new(receiver, sender_host, sender);
                if let Some(receiver) = self.receivers.spawned(transfer_id, receiver) {
                    self.deliver(receiver);
                }
            }
            DataTransferCompleted { dt } => {
                if let Some(receiver) = self.receivers.transfer_completed(dt.id) {
                    self.deliver(receiver);
                }
            }
            ShuffleDelivered { receiver, sender } => {
                match self.senders[sender].finish_transfer(self.ctx.time()) {
                    Some(elapsed) => self.job.stats_mut().register_transfer(elapsed),
                    None => log_warn!(self.ctx, "unexpected delivery from {}", receiver),
                }
                self.step_sender(sender);
            }
            ActivateReducers {} => {
                self.activate_reducers();
            }
            ReduceTaskExecuted { reducer, elapsed } => {
                self.reducers[reducer].finish();
                self.job.stats_mut().register_reduce_task(elapsed);
                let name = self.reducers[reducer].name().to_string();
                log_debug!(self.ctx, "{} exited", name);
                self.ctx
                    .emit(ReducerExited { reducer: name }, self.coordinator, self.coordinator_delay());
            }
        })
    }
}
