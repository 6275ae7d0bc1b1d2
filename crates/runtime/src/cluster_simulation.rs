use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use dslab_core::Simulation;
use dslab_hadoop_cluster::{
    error::ConfigError, job_config::JobConfig, network::make_network, platform::PlatformConfig,
    registry::HostRegistry,
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    context::JobContext,
    coordinator::Coordinator,
    events::Start,
    params::{CalibrationFactors, CostModel, JobParams},
    phase::Phase,
    run_stats::RunStats,
    trace::Trace,
    worker::WorkerHost,
};

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Executors and work a worker host ended up with.
#[derive(Clone, Debug, Serialize)]
pub struct HostSummary {
    pub name: String,
    pub id: usize,
    pub map_tasks: u64,
    pub mappers: usize,
    pub shuffle_senders: usize,
    pub reducers: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct SimulationResult {
    pub stats: RunStats,
    pub final_phase: Phase,
    pub hosts: Vec<HostSummary>,
    pub trace: Trace,
}

pub struct ClusterSimulation {
    pub sim: Simulation,
    master: String,
    platform: PlatformConfig,
    registry: HostRegistry,
    params: JobParams,
}

impl ClusterSimulation {
    pub fn new(
        seed: u64,
        job: &JobConfig,
        platform: PlatformConfig,
        factors: CalibrationFactors,
        cost_model: CostModel,
    ) -> Result<Self, SimulationError> {
        let registry = HostRegistry::from_config(job, &platform)?;
        let master = registry
            .master()
            .map(|master| master.borrow().name().to_string())
            .ok_or(ConfigError::MasterCount(0))?;
        Ok(ClusterSimulation {
            sim: Simulation::new(seed),
            master,
            platform,
            registry,
            params: JobParams::new(job, factors, cost_model),
        })
    }

    pub fn params(&self) -> &JobParams {
        &self.params
    }

    pub fn run(mut self) -> SimulationResult {
        let network = make_network(&mut self.sim, &self.platform);

        let coordinator_name = format!("{}::coordinator", self.master);
        let coordinator_ctx = self.sim.create_context(&coordinator_name);
        let coordinator_id = coordinator_ctx.id();
        network.borrow_mut().set_location(coordinator_id, &self.master);

        let mut agents = BTreeMap::new();
        let mut worker_ids = Vec::new();
        let mut worker_contexts = Vec::new();
        for host in self.registry.workers() {
            let host_name = host.borrow().name().to_string();
            let name = format!("{}::worker", host_name);
            let ctx = self.sim.create_context(&name);
            network.borrow_mut().set_location(ctx.id(), &host_name);
            agents.insert(host_name, ctx.id());
            worker_ids.push(ctx.id());
            worker_contexts.push((host.clone(), name, ctx));
        }

        let job = Rc::new(JobContext::new(self.registry, self.params));
        let map_tasks = job.distributor().distribute_chunks();
        log::info!(
            "{} map tasks distributed over {} workers",
            map_tasks,
            job.registry().worker_count()
        );

        let agents = Rc::new(agents);
        for (host, name, ctx) in worker_contexts {
            let worker = Rc::new(RefCell::new(WorkerHost::new(
                host,
                job.clone(),
                coordinator_id,
                agents.clone(),
                network.clone(),
                ctx,
            )));
            self.sim.add_handler(name, worker);
        }

        let coordinator = Rc::new(RefCell::new(Coordinator::new(
            job.clone(),
            worker_ids,
            network.clone(),
            coordinator_ctx,
        )));
        self.sim.add_handler(&coordinator_name, coordinator.clone());

        self.sim.create_context("root").emit_now(Start {}, coordinator_id);
        self.sim.step_until_no_events();

        let total_time = self.sim.time();
        let coordinator_ref = coordinator.borrow();
        let final_phase = coordinator_ref.phase();
        let completed = final_phase == Phase::Done;
        if !completed {
            let (inits, mappers, shufflers, reducers) = coordinator_ref.barrier().remaining();
            log::warn!(
                "no events left but the job is in the {:?} phase: waiting for {} inits, {} mappers, {} shufflers, {} reducers",
                final_phase,
                inits,
                mappers,
                shufflers,
                reducers
            );
        }

        let mut stats = job.stats().clone();
        stats.finalize(total_time, completed);
        let hosts = job
            .registry()
            .workers()
            .map(|host| {
                let host = host.borrow();
                HostSummary {
                    name: host.name().to_string(),
                    id: host.id(),
                    map_tasks: host.assigned_map_tasks(),
                    mappers: host.mappers().len(),
                    shuffle_senders: host.shuffle_senders().len(),
                    reducers: host.reducers().len(),
                }
            })
            .collect();

        SimulationResult {
            stats,
            final_phase,
            hosts,
            trace: coordinator_ref.trace().clone(),
        }
    }
}
