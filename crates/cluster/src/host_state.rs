//! Runtime state of a cluster host.
use std::collections::VecDeque;

use crate::{host_spec::HostRole, task::Task};

/// Runtime state of a cluster host: identity, capacity, executor sets and work queues.
///
/// Queues are filled by the work distributor and drained by the host's own executors.
#[derive(Debug)]
pub struct HostState {
    id: usize,
    name: String,
    role: HostRole,
    speed: f64,
    cores: u32,
    active_mappers: usize,
    assigned_map_tasks: u64,
    mappers: Vec<String>,
    shuffle_senders: Vec<String>,
    reducers: Vec<String>,
    map_tasks: VecDeque<Task>,
    shuffle_tasks: VecDeque<Task>,
    reduce_tasks: VecDeque<Task>,
}

impl HostState {
    pub fn new(id: usize, name: String, role: HostRole, speed: f64, cores: u32) -> Self {
        HostState {
            id,
            name,
            role,
            speed,
            cores,
            active_mappers: 0,
            assigned_map_tasks: 0,
            mappers: Vec::new(),
            shuffle_senders: Vec::new(),
            reducers: Vec::new(),
            map_tasks: VecDeque::new(),
            shuffle_tasks: VecDeque::new(),
            reduce_tasks: VecDeque::new(),
        }
    }

    /// Master has id 0, workers are numbered from 1.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> HostRole {
        self.role
    }

    pub fn is_master(&self) -> bool {
        self.role == HostRole::Master
    }

    pub fn is_worker(&self) -> bool {
        self.role == HostRole::Worker
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn cores(&self) -> u32 {
        self.cores
    }

    pub fn active_mappers(&self) -> usize {
        self.active_mappers
    }

    /// Number of map tasks ever enqueued on this host.
    pub fn assigned_map_tasks(&self) -> u64 {
        self.assigned_map_tasks
    }

    pub fn add_mapper(&mut self, name: String) {
        self.mappers.push(name);
        self.active_mappers += 1;
    }

    /// Marks one mapper as finished. Returns the number of mappers still active.
    pub fn mapper_exited(&mut self) -> usize {
        debug_assert!(self.active_mappers > 0, "more mappers exited than were started");
        self.active_mappers = self.active_mappers.saturating_sub(1);
        self.active_mappers
    }

    pub fn add_shuffle_sender(&mut self, name: String) {
        self.shuffle_senders.push(name);
    }

    pub fn add_reducer(&mut self, name: String) {
        self.reducers.push(name);
    }

    pub fn mappers(&self) -> &[String] {
        &self.mappers
    }

    pub fn shuffle_senders(&self) -> &[String] {
        &self.shuffle_senders
    }

    pub fn reducers(&self) -> &[String] {
        &self.reducers
    }

    pub fn push_map_task(&mut self, task: Task) {
        self.assigned_map_tasks += 1;
        self.map_tasks.push_back(task);
    }

    pub fn pop_map_task(&mut self) -> Option<Task> {
        self.map_tasks.pop_front()
    }

    pub fn map_queue_len(&self) -> usize {
        self.map_tasks.len()
    }

    pub fn push_shuffle_tasks(&mut self, tasks: impl IntoIterator<Item = Task>) {
        self.shuffle_tasks.extend(tasks);
    }

    pub fn pop_shuffle_task(&mut self) -> Option<Task> {
        self.shuffle_tasks.pop_front()
    }

    pub fn shuffle_queue_len(&self) -> usize {
        self.shuffle_tasks.len()
    }

    pub fn push_reduce_task(&mut self, task: Task) {
        self.reduce_tasks.push_back(task);
    }

    pub fn pop_reduce_task(&mut self) -> Option<Task> {
        self.reduce_tasks.pop_front()
    }
}
