use std::io::Write;

use dslab_hadoop::{
    cluster_simulation::{ClusterSimulation, SimulationResult},
    executors::{
        mapper::{Mapper, MapperStep},
        reducer::Reducer,
        shuffle::{ReceiverSlots, SenderStep, ShuffleReceiver, ShuffleSender},
        ExecutorState,
    },
    experiment::{
        rank_by_diff_percent, rank_by_sim_err, write_ranking, write_trials, Experiment, FactorRange, TrialConfig,
    },
    gate::GateError,
    params::{CalibrationFactors, CostModel, JobParams},
    phase::{Milestone, Phase, PhaseBarrier, ProtocolError, Signal, SignalKind},
    reference::{ReferenceError, ReferenceRow, ReferenceTable, Report},
    run_stats::RunStats,
    trace::TraceEvent,
    work_distributor::{reducer_share, WorkDistributor},
    worker_agent::{ExecutorCounts, WorkerAgent},
};
use dslab_hadoop_cluster::{
    host_spec::HostRole, host_state::HostState, job_config::JobConfig, platform::PlatformConfig,
    registry::HostRegistry, task::Task,
};

const PLATFORM: &str = "
network:
  type: Star
  bandwidth: 125000000
  latency: 0.0001
  internal_bandwidth: 1000000000
hosts:
  - name: master
    speed: 1000000000
    cores: 1
  - name: worker1
    speed: 1000000000
    cores: 1
  - name: worker2
    speed: 1000000000
    cores: 1
  - name: worker3
    speed: 1000000000
    cores: 1
";

const JOB: &str = "
master master
worker worker1-worker2
mappers 2
reducers 4
input_size_in_mb 256
hdfs_chunk_size_in_mb 64
";

const FACTORS: CalibrationFactors = CalibrationFactors { map: 0.5, reduce: 0.5 };

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= 1e-6 * expected.abs().max(1.),
        "{} != {}",
        actual,
        expected
    );
}

fn platform() -> PlatformConfig {
    PlatformConfig::from_yaml_str(PLATFORM).unwrap()
}

fn simulate(job: &str, factors: CalibrationFactors) -> SimulationResult {
    simulate_on(job, platform(), factors)
}

fn simulate_on(job: &str, platform: PlatformConfig, factors: CalibrationFactors) -> SimulationResult {
    let job = JobConfig::parse(job).unwrap();
    ClusterSimulation::new(123, &job, platform, factors, CostModel::default())
        .unwrap()
        .run()
}

fn params(job: &JobConfig) -> JobParams {
    JobParams::new(job, FACTORS, CostModel::default())
}

#[test]
fn two_worker_job_runs_to_completion() {
    let result = simulate(JOB, FACTORS);
    let stats = &result.stats;

    assert!(stats.completed);
    assert_eq!(result.final_phase, Phase::Done);
    assert_eq!(stats.protocol_errors, 0);
    assert_eq!(stats.map_tasks, 4);
    assert_eq!(stats.reduce_tasks, 4);
    // every map task produces one transfer per reducer
    assert_eq!(stats.transfers, 16);

    assert_close(stats.average_map_time, 0.5 * 64. * 13.6);
    assert_close(stats.average_reduce_time, 0.5 * 64. * 5.25);

    assert_eq!(result.hosts.len(), 2);
    for (host, id) in result.hosts.iter().zip(1..) {
        assert_eq!(host.id, id);
        assert_eq!(host.map_tasks, 2);
        assert_eq!(host.mappers, 1);
        assert_eq!(host.reducers, 2);
        assert_eq!(host.shuffle_senders, 10);
    }
}

#[test]
fn phases_follow_the_barrier_order() {
    let result = simulate(JOB, FACTORS);
    let phases = &result.stats.phases;
    let map_time = 0.5 * 64. * 13.6;

    let init_completed = phases.init_completed.unwrap();
    let shuffle_started = phases.shuffle_started.unwrap();
    let map_completed = phases.map_completed.unwrap();
    let shuffle_completed = phases.shuffle_completed.unwrap();
    let reduce_started = phases.reduce_started.unwrap();
    let reduce_completed = phases.reduce_completed.unwrap();

    assert!(init_completed >= 30.);
    assert_eq!(phases.map_started, Some(init_completed));
    // shuffle overlaps with the map phase
    assert!(shuffle_started > init_completed + map_time);
    assert!(shuffle_started < map_completed);
    assert!(map_completed >= init_completed + 2. * map_time);
    assert!(reduce_started >= map_completed);
    assert!(reduce_started >= shuffle_completed);
    assert!(reduce_completed >= reduce_started + 0.5 * 64. * 5.25);
    assert!(result.stats.total_time >= reduce_completed);
}

#[test]
fn shuffle_start_is_reported_once() {
    let result = simulate(JOB, FACTORS);
    let count = |expected: &TraceEvent| {
        result
            .trace
            .events
            .iter()
            .filter(|event| {
                matches!(
                    (event, expected),
                    (TraceEvent::PhaseStarted { phase: a, .. }, TraceEvent::PhaseStarted { phase: b, .. })
                        | (TraceEvent::PhaseCompleted { phase: a, .. }, TraceEvent::PhaseCompleted { phase: b, .. })
                        if a == b
                )
            })
            .count()
    };
    for phase in [Phase::Init, Phase::Map, Phase::Shuffle, Phase::Reduce] {
        assert_eq!(count(&TraceEvent::PhaseStarted { time: 0., phase }), 1, "{:?} started", phase);
        assert_eq!(count(&TraceEvent::PhaseCompleted { time: 0., phase }), 1, "{:?} completed", phase);
    }
    assert!(!result
        .trace
        .events
        .iter()
        .any(|event| matches!(event, TraceEvent::ProtocolError { .. })));
}

#[test]
fn runs_are_deterministic() {
    let first = simulate(JOB, FACTORS).stats;
    let second = simulate(JOB, FACTORS).stats;
    assert_eq!(first.total_time, second.total_time);
    assert_eq!(first.average_map_time, second.average_map_time);
    assert_eq!(first.average_shuffle_time, second.average_shuffle_time);
    assert_eq!(first.average_reduce_time, second.average_reduce_time);
}

#[test]
fn uneven_reducers_and_chunks() {
    let job = "
master master
worker worker1-worker3
reducers 4
input_size_in_mb 300
hdfs_chunk_size_in_mb 64
";
    let result = simulate(job, FACTORS);
    assert!(result.stats.completed);
    assert_eq!(result.stats.map_tasks, 5);
    assert_eq!(result.stats.reduce_tasks, 4);
    assert_eq!(result.stats.transfers, 20);
    let map_tasks = result.hosts.iter().map(|host| host.map_tasks).collect::<Vec<_>>();
    assert_eq!(map_tasks, vec![2, 2, 1]);
    let reducers = result.hosts.iter().map(|host| host.reducers).collect::<Vec<_>>();
    assert_eq!(reducers, vec![2, 1, 1]);
}

#[test]
fn reducers_wait_for_mappers_of_hosts_without_senders() {
    let mut platform = platform();
    platform.hosts[1].cores = 4;
    assert_eq!(platform.host("worker1").unwrap().cores, 4);
    let job = "
master master
worker worker1-worker2
reducers 1
input_size_in_mb 512
hdfs_chunk_size_in_mb 64
";
    let result = simulate_on(job, platform, FACTORS);
    let stats = &result.stats;
    let map_time = 0.5 * 64. * 13.6;

    assert!(stats.completed);
    assert_eq!(result.final_phase, Phase::Done);
    assert_eq!(stats.protocol_errors, 0);
    assert_eq!(stats.map_tasks, 8);
    assert_eq!(stats.reduce_tasks, 1);
    // worker2 hosts no reducer, so it has no senders and its shuffle queue is never drained
    let worker1 = &result.hosts[0];
    let worker2 = &result.hosts[1];
    assert_eq!((worker1.mappers, worker1.shuffle_senders, worker1.reducers), (4, 5, 1));
    assert_eq!((worker2.mappers, worker2.shuffle_senders, worker2.reducers), (1, 0, 0));
    assert_eq!((worker1.map_tasks, worker2.map_tasks), (4, 4));
    assert_eq!(stats.transfers, worker1.map_tasks);

    let phases = &stats.phases;
    let init_completed = phases.init_completed.unwrap();
    let shuffle_completed = phases.shuffle_completed.unwrap();
    let map_completed = phases.map_completed.unwrap();
    let reduce_started = phases.reduce_started.unwrap();
    assert!(shuffle_completed < init_completed + 2. * map_time);
    assert!(map_completed >= init_completed + 4. * map_time);
    assert!(map_completed > shuffle_completed);
    assert!(reduce_started >= map_completed);
}

#[test]
fn reducer_apportionment() {
    assert_eq!(reducer_share(4, 2, 1), 2);
    assert_eq!(reducer_share(4, 2, 2), 2);
    assert_eq!(reducer_share(5, 2, 1), 3);
    assert_eq!(reducer_share(5, 2, 2), 2);
    assert_eq!(reducer_share(2, 3, 3), 0);
    for (reducers, workers) in [(4, 3), (7, 4), (16, 5), (3, 8)] {
        let total: u64 = (1..=workers).map(|id| reducer_share(reducers, workers, id)).sum();
        assert_eq!(total, reducers);
    }
}

fn registry(job: &JobConfig) -> HostRegistry {
    HostRegistry::from_config(job, &platform()).unwrap()
}

#[test]
fn chunks_are_distributed_round_robin() {
    let job = JobConfig::parse(
        "master master\nworker worker1-worker3\nreducers 3\ninput_size_in_mb 448\nhdfs_chunk_size_in_mb 64\n",
    )
    .unwrap();
    let registry = registry(&job);
    let params = params(&job);
    assert_eq!(WorkDistributor::new(&registry, &params).distribute_chunks(), 7);
    let counts = registry
        .workers()
        .map(|host| host.borrow().map_queue_len())
        .collect::<Vec<_>>();
    assert_eq!(counts, vec![3, 2, 2]);
    for host in registry.workers() {
        let task = host.borrow_mut().pop_map_task().unwrap();
        assert_close(task.execution_time(host.borrow().speed()), 0.5 * 64. * 13.6);
    }
}

#[test]
fn chunk_assignment_is_repeatable() {
    let job = JobConfig::parse(
        "master master\nworker worker1-worker3\nreducers 3\ninput_size_in_mb 640\nhdfs_chunk_size_in_mb 64\n",
    )
    .unwrap();
    let params = params(&job);
    let assignment = || {
        let registry = registry(&job);
        WorkDistributor::new(&registry, &params).distribute_chunks();
        let assigned = registry
            .workers()
            .map(|host| (host.borrow().name().to_string(), host.borrow().assigned_map_tasks()))
            .collect::<Vec<_>>();
        assigned
    };
    let first = assignment();
    assert_eq!(first, assignment());
    assert_eq!(
        first,
        vec![
            ("worker1".to_string(), 4),
            ("worker2".to_string(), 3),
            ("worker3".to_string(), 3)
        ]
    );
}

#[test]
fn partition_fans_out_to_every_reducer() {
    let job = JobConfig::parse(
        "master master\nworker worker1-worker3\nreducers 4\ninput_size_in_mb 256\nhdfs_chunk_size_in_mb 64\n",
    )
    .unwrap();
    let registry = registry(&job);
    let params = params(&job);
    let agent = WorkerAgent::new(&params, registry.worker_count());
    for host in registry.workers() {
        agent.launch(&mut host.borrow_mut());
    }

    let source = registry.lookup("worker2").unwrap();
    let fan_out = WorkDistributor::new(&registry, &params).partition(&source, params.shuffle_bytes());
    assert_eq!(fan_out, 4);

    let mut source = source.borrow_mut();
    assert_eq!(source.shuffle_queue_len(), 4);
    let mut destinations = Vec::new();
    while let Some(task) = source.pop_shuffle_task() {
        assert_eq!(task.comm_cost, (64 * 1_048_576 / 4) as f64);
        destinations.push(task.destination.unwrap());
    }
    assert_eq!(destinations, vec!["worker1", "worker1", "worker2", "worker3"]);
}

#[test]
fn worker_agent_launches_executors() {
    let job = JobConfig::parse(JOB).unwrap();
    let params = params(&job);
    let agent = WorkerAgent::new(&params, 2);
    let mut host = HostState::new(1, "worker1".to_string(), HostRole::Worker, 2e9, 3);
    let launched = agent.launch(&mut host);
    assert_eq!(
        launched.counts(),
        ExecutorCounts {
            mappers: 3,
            shufflers: 10,
            reducers: 2,
        }
    );
    assert_eq!(host.active_mappers(), 3);
    assert_eq!(host.reducers(), ["worker1-reducer-0", "worker1-reducer-1"]);
    assert_close(agent.init_task(&host).execution_time(host.speed()), 30.);
    assert_eq!(agent.create_reduce_tasks(&mut host), 2);
}

#[test]
fn gates_open_only_once() {
    let mut host = HostState::new(1, "worker1".to_string(), HostRole::Worker, 1e9, 1);
    host.add_mapper("worker1-mapper-0".to_string());
    host.push_map_task(Task::map(2e9));

    let mut mapper = Mapper::new("worker1-mapper-0".to_string());
    assert_eq!(mapper.next_step(&mut host), MapperStep::Blocked);
    mapper.activate().unwrap();
    assert_eq!(
        mapper.activate(),
        Err(GateError::AlreadyOpen("worker1-mapper-0".to_string()))
    );
    assert_eq!(mapper.next_step(&mut host), MapperStep::Execute { elapsed: 2. });
    mapper.task_completed();
    assert_eq!(mapper.next_step(&mut host), MapperStep::Exit);
    assert_eq!(mapper.state(), ExecutorState::Done);
    assert_eq!(host.active_mappers(), 0);

    host.push_reduce_task(Task::reduce(1e9));
    let mut reducer = Reducer::new("worker1-reducer-0".to_string());
    assert_eq!(reducer.state(), ExecutorState::WaitingActivation);
    assert_eq!(reducer.activate(&mut host), Ok(Some(1.)));
    assert!(reducer.activate(&mut host).is_err());
}

#[test]
fn shuffle_sender_waits_for_local_mappers() {
    let mut host = HostState::new(1, "worker1".to_string(), HostRole::Worker, 1e9, 1);
    host.add_mapper("worker1-mapper-0".to_string());
    let mut sender = ShuffleSender::new("worker1-sender-0".to_string());

    assert_eq!(sender.next_step(&mut host), SenderStep::Wait);
    host.push_shuffle_tasks([Task::shuffle(100., "worker2".to_string())]);
    assert_eq!(
        sender.next_step(&mut host),
        SenderStep::Transfer(Task::shuffle(100., "worker2".to_string()))
    );
    sender.start_transfer(5.);
    assert!(sender.is_transferring());
    assert_eq!(sender.finish_transfer(7.5), Some(2.5));
    assert_eq!(sender.finish_transfer(8.), None);

    assert_eq!(sender.next_step(&mut host), SenderStep::Wait);
    host.mapper_exited();
    assert_eq!(sender.next_step(&mut host), SenderStep::Exit);
    assert_eq!(sender.transfers(), 1);

    let receiver = ShuffleReceiver::new("worker2-receiver-0".to_string(), 7, 3);
    let delivery = receiver.accept();
    assert_eq!(delivery.sender_host, 7);
    assert_eq!(delivery.sender, 3);
}

fn counts(mappers: usize, shufflers: usize, reducers: usize) -> Signal {
    Signal::InitComplete(ExecutorCounts {
        mappers,
        shufflers,
        reducers,
    })
}

#[test]
fn barrier_drives_the_phases() {
    let mut barrier = PhaseBarrier::new(2);
    assert_eq!(
        barrier.on_signal(Signal::MapExit),
        Err(ProtocolError::UnexpectedSignal {
            signal: SignalKind::MapExit,
            phase: Phase::Init,
        })
    );

    assert_eq!(barrier.on_signal(counts(1, 5, 1)), Ok(vec![]));
    assert_eq!(barrier.on_signal(counts(1, 5, 1)), Ok(vec![Milestone::InitCompleted]));
    assert_eq!(barrier.phase(), Phase::Map);
    assert_eq!(barrier.remaining(), (0, 2, 10, 2));
    assert_eq!(barrier.outstanding(), 15);

    assert_eq!(barrier.on_signal(Signal::ShuffleStart), Ok(vec![Milestone::ShuffleStarted]));
    assert_eq!(barrier.on_signal(Signal::ShuffleStart), Ok(vec![]));
    assert!(barrier.shuffle_started());

    assert_eq!(barrier.on_signal(Signal::MapExit), Ok(vec![]));
    assert_eq!(barrier.on_signal(Signal::MapExit), Ok(vec![Milestone::MapCompleted]));
    assert_eq!(barrier.phase(), Phase::Shuffle);
    assert_eq!(
        barrier.on_signal(Signal::ReduceExit),
        Err(ProtocolError::UnexpectedSignal {
            signal: SignalKind::ReduceExit,
            phase: Phase::Shuffle,
        })
    );

    for _ in 0..9 {
        assert_eq!(barrier.on_signal(Signal::ShuffleExit), Ok(vec![]));
    }
    assert_eq!(
        barrier.on_signal(Signal::ShuffleExit),
        Ok(vec![Milestone::ShuffleCompleted, Milestone::ReduceReleased])
    );
    assert_eq!(barrier.phase(), Phase::Reduce);

    assert_eq!(barrier.on_signal(Signal::ReduceExit), Ok(vec![]));
    assert_eq!(barrier.on_signal(Signal::ReduceExit), Ok(vec![Milestone::ReduceCompleted]));
    assert_eq!(barrier.phase(), Phase::Done);
    assert_eq!(barrier.outstanding(), 0);
    assert!(barrier.on_signal(Signal::ReduceExit).is_err());
}

#[test]
fn reducers_wait_for_the_last_mapper() {
    let mut barrier = PhaseBarrier::new(1);
    barrier.on_signal(counts(1, 1, 1)).unwrap();
    assert_eq!(barrier.on_signal(Signal::ShuffleExit), Ok(vec![Milestone::ShuffleCompleted]));
    assert_eq!(barrier.phase(), Phase::Map);
    assert_eq!(
        barrier.on_signal(Signal::MapExit),
        Ok(vec![Milestone::MapCompleted, Milestone::ReduceReleased])
    );
    assert_eq!(barrier.phase(), Phase::Reduce);
}

#[test]
fn barrier_rejects_surplus_signals() {
    let mut barrier = PhaseBarrier::new(0);
    assert_eq!(
        barrier.on_signal(counts(1, 0, 0)),
        Err(ProtocolError::CounterUnderflow(SignalKind::InitComplete))
    );

    let mut barrier = PhaseBarrier::new(1);
    barrier.on_signal(counts(1, 0, 0)).unwrap();
    assert_eq!(
        barrier.on_signal(counts(1, 0, 0)),
        Err(ProtocolError::UnexpectedSignal {
            signal: SignalKind::InitComplete,
            phase: Phase::Map,
        })
    );
}

fn stats(map: f64, reduce: f64, total: f64) -> RunStats {
    let mut stats = RunStats::new();
    stats.register_map_task(map);
    stats.register_reduce_task(reduce);
    stats.finalize(total, true);
    stats
}

#[test]
fn run_stats_average_tasks() {
    let mut stats = RunStats::new();
    for elapsed in [1., 2., 6.] {
        stats.register_transfer(elapsed);
    }
    assert_eq!(stats.transfers, 3);
    assert_close(stats.average_shuffle_time, 3.);
}

#[test]
fn report_compares_against_reference() {
    let table = ReferenceTable::default();
    assert_eq!(table.rows.len(), 9);
    let reference = table.lookup(512, 32, 4).unwrap();
    assert_eq!((reference.map, reference.reduce, reference.total), (438., 672., 1172.));
    assert!(table.lookup(256, 64, 4).is_none());

    let report = Report::new(FACTORS, &stats(440., 670., 1180.), Some(reference));
    assert_close(report.sum_of_diffs().unwrap(), 4.);
    assert_close(report.sim_err().unwrap(), 8. / 1172. * 100.);
    assert_close(report.diff_percent().unwrap(), 4. / 1172. * 100.);
    assert_eq!(
        report.results_line().unwrap(),
        "4.00 0.68 0.50 0.50 440.00 438.00 670.00 672.00 1180.00 1172.00"
    );
    let table_text = report.to_string();
    assert!(table_text.contains("Actual:"));
    assert!(table_text.contains("Simulated:"));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("simulation_results.txt");
    assert!(report.append_to(&path).unwrap());
    assert!(report.append_to(&path).unwrap());
    assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 2);

    let unmatched = Report::new(FACTORS, &stats(440., 670., 1180.), None);
    assert_eq!(unmatched.results_line(), None);
    assert!(!unmatched.append_to(dir.path().join("unused.txt")).unwrap());
    assert!(!dir.path().join("unused.txt").exists());
    assert!(unmatched.to_string().contains("Simulated:"));
}

#[test]
fn reference_table_from_yaml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "rows:\n  - input_size_mb: 256\n    chunk_size_mb: 64\n    reducers: 4\n    map: 435.2\n    reduce: 168\n    total: 1100\n"
    )
    .unwrap();
    let table = ReferenceTable::from_yaml(file.path()).unwrap();
    assert_eq!(
        table.lookup(256, 64, 4),
        Some(&ReferenceRow {
            input_size_mb: 256,
            chunk_size_mb: 64,
            reducers: 4,
            map: 435.2,
            reduce: 168.,
            total: 1100.,
        })
    );
    assert!(matches!(
        ReferenceTable::from_yaml("missing.yaml"),
        Err(ReferenceError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound
    ));

    let mut broken = tempfile::NamedTempFile::new().unwrap();
    write!(broken, "rows: 42\n").unwrap();
    assert!(matches!(
        ReferenceTable::from_yaml(broken.path()),
        Err(ReferenceError::Parse(_))
    ));
}

fn experiment() -> Experiment {
    let reference = ReferenceRow {
        input_size_mb: 256,
        chunk_size_mb: 64,
        reducers: 4,
        map: 0.5 * 64. * 13.6,
        reduce: 0.5 * 64. * 5.25,
        total: 1100.,
    };
    Experiment::new(
        123,
        JobConfig::parse(JOB).unwrap(),
        platform(),
        CostModel::default(),
        Some(reference),
    )
    .unwrap()
}

#[test]
fn factor_range_is_inclusive() {
    let values = FactorRange::new(0.4, 0.6, 0.1).values();
    assert_eq!(values.len(), 3);
    assert_close(values[2], 0.6);
    assert_eq!(FactorRange::new(1., 1., 0.1).values(), vec![1.]);
    assert_eq!(FactorRange::default().values().len(), 201);
}

#[test]
fn grid_search_ranks_results() {
    let experiment = experiment();
    let range = FactorRange::new(0.4, 0.6, 0.1);
    let mut results = experiment.run_grid(range, range, 2);
    assert_eq!(results.len(), 9);
    assert!(results.iter().all(|result| result.completed));

    rank_by_diff_percent(&mut results);
    let best = results[0].factors();
    assert_close(best.map, 0.5);
    assert_close(best.reduce, 0.5);
    assert!(results[0].report.diff_percent().unwrap() < 1e-6);
    for pair in results.windows(2) {
        assert!(pair[0].report.diff_percent() <= pair[1].report.diff_percent());
    }

    rank_by_sim_err(&mut results);
    for pair in results.windows(2) {
        assert!(pair[0].report.sim_err() <= pair[1].report.sim_err());
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ranked.txt");
    write_ranking(&path, &results).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 10);
}

#[test]
fn greedy_search_finds_factors() {
    let results = experiment()
        .run_greedy(FactorRange::new(0.4, 0.6, 0.1), FactorRange::new(0.4, 0.6, 0.1))
        .unwrap();
    // three map runs, three reduce runs and the final one
    assert_eq!(results.len(), 7);
    let best = results.last().unwrap().factors();
    assert_close(best.map, 0.5);
    assert_close(best.reduce, 0.5);
}

#[test]
fn trials_resize_the_job() {
    let defaults = TrialConfig::defaults();
    assert_eq!(defaults.len(), 15);
    assert_eq!(defaults[0], TrialConfig::new(256, 32, 4));
    assert_eq!(defaults[14], TrialConfig::new(512, 128, 16));
    assert!(!defaults.contains(&TrialConfig::new(256, 128, 4)));

    let references = ReferenceTable {
        rows: vec![ReferenceRow {
            input_size_mb: 256,
            chunk_size_mb: 64,
            reducers: 4,
            map: 0.5 * 64. * 13.6,
            reduce: 0.5 * 64. * 5.25,
            total: 1100.,
        }],
    };
    let trials = [TrialConfig::new(256, 64, 4), TrialConfig::new(128, 32, 4)];
    let results = experiment().run_trials(FACTORS, &trials, &references).unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|result| result.completed));
    assert_eq!(results[1].config, trials[1]);

    assert_close(results[0].report.map, 0.5 * 64. * 13.6);
    assert!(results[0].report.sim_err().is_some());
    assert_close(results[1].report.map, 0.5 * 32. * 13.6);
    assert_close(results[1].report.reduce, 0.5 * 32. * 5.25);
    assert!(results[1].report.reference.is_none());

    let mut table = Vec::new();
    write_trials(&mut table, FACTORS, &results).unwrap();
    let table = String::from_utf8(table).unwrap();
    let lines = table.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "Calibration factors: 0.50, 0.50");
    assert!(lines[1].starts_with("Config"));
    assert!(lines[2].starts_with("256-64-4"));
    assert!(lines[3].starts_with("128-32-4"));
    assert!(lines[3].ends_with(" -"));
}

#[test]
fn receivers_pair_with_transfers_in_any_order() {
    let mut slots = ReceiverSlots::new();

    assert!(slots
        .spawned(7, ShuffleReceiver::new("worker1->worker2-receiver-0".to_string(), 1, 3))
        .is_none());
    assert_eq!(slots.pending(), 1);
    let receiver = slots.transfer_completed(7).unwrap();
    assert_eq!(receiver.name(), "worker1->worker2-receiver-0");

    // the transfer finishes before its receiver is spawned
    assert!(slots.transfer_completed(8).is_none());
    assert_eq!(slots.pending(), 1);
    let delivery = slots
        .spawned(8, ShuffleReceiver::new("worker2->worker1-receiver-0".to_string(), 2, 0))
        .unwrap()
        .accept();
    assert_eq!(delivery.sender_host, 2);
    assert_eq!(delivery.sender, 0);
    assert_eq!(slots.pending(), 0);
}

#[test]
fn unknown_hosts_fail_before_simulation() {
    let job = JobConfig::parse(
        "master master\nworker worker1-worker9\nreducers 4\ninput_size_in_mb 256\nhdfs_chunk_size_in_mb 64\n",
    )
    .unwrap();
    assert!(ClusterSimulation::new(1, &job, platform(), FACTORS, CostModel::default()).is_err());
}
