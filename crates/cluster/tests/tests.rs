use std::io::Write;

use dslab_hadoop_cluster::{
    error::ConfigError,
    host_spec::{expand_hosts, HostRole, HostSpec},
    job_config::{JobConfig, BYTES_PER_MB},
    platform::{NetworkConfig, PlatformConfig},
    registry::{HostRegistry, RegistryError},
    task::{Task, TaskKind},
};

const PLATFORM: &str = "
network:
  type: Star
  bandwidth: 125000000
  latency: 0.0001
  internal_bandwidth: 1000000000
hosts:
  - name: host0
    speed: 1000000000
    cores: 4
  - name: host1
    speed: 1000000000
    cores: 2
  - name: spare
    speed: 1000000000
    cores: 8
  - name: host2
    speed: 2000000000
    cores: 1
";

fn job(hosts: &str) -> String {
    format!(
        "{}\nmappers 0\nreducers 4\ninput_size_in_mb 256\nhdfs_chunk_size_in_mb 64\n",
        hosts
    )
}

#[test]
fn host_range_expands_inclusively() {
    assert_eq!(
        expand_hosts("node1-node5").unwrap(),
        vec!["node1", "node2", "node3", "node4", "node5"]
    );
    assert_eq!(expand_hosts("host7-host7").unwrap(), vec!["host7"]);
    assert_eq!(expand_hosts("master").unwrap(), vec!["master"]);
}

#[test]
fn malformed_host_ranges_are_rejected() {
    for value in ["node5-node1", "node1-rack3", "node-node3", "1-5", "node1-"] {
        assert!(
            matches!(expand_hosts(value), Err(ConfigError::InvalidHostRange(_))),
            "{} should be rejected",
            value
        );
    }
}

#[test]
fn job_config_is_parsed() {
    let config = JobConfig::parse(
        "# cluster\nmaster host0\nworker host1-host4\n\nmappers 8\nreducers 16\n\
         input_size_in_mb 512\nhdfs_chunk_size_in_mb 64\nplatform cluster.yaml\n",
    )
    .unwrap();
    assert_eq!(config.master(), "host0");
    assert_eq!(config.workers().collect::<Vec<_>>(), vec!["host1", "host2", "host3", "host4"]);
    assert_eq!(config.mappers, 8);
    assert_eq!(config.reducers, 16);
    assert_eq!(config.input_size_bytes(), 512 * BYTES_PER_MB);
    assert_eq!(config.map_task_count(), 8);
    assert_eq!(config.platform.as_deref(), Some(std::path::Path::new("cluster.yaml")));
}

#[test]
fn explicit_platform_path_wins() {
    let with_platform = JobConfig::parse(&format!("{}platform cluster.yaml\n", job("master host0\nworker host1"))).unwrap();
    assert_eq!(
        with_platform.platform_path(Some("other.yaml".into())).unwrap(),
        std::path::PathBuf::from("other.yaml")
    );
    assert_eq!(
        with_platform.platform_path(None).unwrap(),
        std::path::PathBuf::from("cluster.yaml")
    );

    let without_platform = JobConfig::parse(&job("master host0\nworker host1")).unwrap();
    assert!(matches!(
        without_platform.platform_path(None),
        Err(ConfigError::MissingKey("platform"))
    ));
}

#[test]
fn map_task_count_rounds_up() {
    let config = JobConfig::parse(
        "master m\nworker w1\nreducers 1\ninput_size_in_mb 100\nhdfs_chunk_size_in_mb 64\n",
    )
    .unwrap();
    assert_eq!(config.map_task_count(), 2);
}

#[test]
fn master_count_is_validated() {
    assert!(matches!(
        JobConfig::parse(&job("worker host1-host2")),
        Err(ConfigError::MasterCount(0))
    ));
    assert!(matches!(
        JobConfig::parse(&job("master host0-host1\nworker host2")),
        Err(ConfigError::MasterCount(2))
    ));
    assert!(matches!(JobConfig::parse(&job("master host0")), Err(ConfigError::NoWorkers)));
}

#[test]
fn invalid_values_are_config_errors() {
    assert!(matches!(
        JobConfig::parse("master m\nworker w\nreducers four\ninput_size_in_mb 1\nhdfs_chunk_size_in_mb 1\n"),
        Err(ConfigError::InvalidNumber { line: 3, .. })
    ));
    assert!(matches!(
        JobConfig::parse("master m\nworker w\ninput_size_in_mb 1\nhdfs_chunk_size_in_mb 1\n"),
        Err(ConfigError::MissingKey("reducers"))
    ));
    assert!(matches!(
        JobConfig::parse("master m\nworker w\nreducers 0\ninput_size_in_mb 1\nhdfs_chunk_size_in_mb 1\n"),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert!(matches!(
        JobConfig::parse("master\n"),
        Err(ConfigError::MalformedLine { line: 1, .. })
    ));
    assert!(matches!(
        JobConfig::parse(&job("master host0\nworker host0")),
        Err(ConfigError::DuplicateHost(_))
    ));
}

#[test]
fn config_and_platform_are_read_from_files() {
    let mut config_file = tempfile::NamedTempFile::new().unwrap();
    config_file
        .write_all(job("master host0\nworker host1-host2").as_bytes())
        .unwrap();
    let mut platform_file = tempfile::NamedTempFile::new().unwrap();
    platform_file.write_all(PLATFORM.as_bytes()).unwrap();

    let config = JobConfig::from_file(config_file.path()).unwrap();
    let platform = PlatformConfig::from_yaml(platform_file.path()).unwrap();
    assert_eq!(config.workers().count(), 2);
    assert_eq!(platform.hosts.len(), 4);
    assert!(matches!(platform.network, NetworkConfig::Star { .. }));
    let host2 = platform.host("host2").unwrap();
    assert_eq!((host2.speed, host2.cores, host2.rack), (2e9, 1, 0));
    assert!(platform.host("host3").is_none());

    assert!(matches!(
        JobConfig::from_file(config_file.path().with_extension("missing")),
        Err(ConfigError::Io { .. })
    ));
}

#[test]
fn platform_rejects_hosts_without_cores() {
    let text = PLATFORM.replace("cores: 1", "cores: 0");
    assert!(matches!(
        PlatformConfig::from_yaml_str(&text),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert!(matches!(
        PlatformConfig::from_yaml_str("hosts: []"),
        Err(ConfigError::Platform(_))
    ));
}

#[test]
fn registry_assigns_ids_in_platform_order() {
    let config = JobConfig::parse(&job("master host0\nworker host2\nworker host1")).unwrap();
    let platform = PlatformConfig::from_yaml_str(PLATFORM).unwrap();
    let registry = HostRegistry::from_config(&config, &platform).unwrap();

    let master = registry.master().unwrap().borrow();
    assert_eq!((master.name(), master.id(), master.is_master()), ("host0", 0, true));
    drop(master);

    let workers = registry
        .workers()
        .map(|host| (host.borrow().name().to_string(), host.borrow().id(), host.borrow().cores()))
        .collect::<Vec<_>>();
    assert_eq!(
        workers,
        vec![("host1".to_string(), 1, 2), ("host2".to_string(), 2, 1)]
    );
    assert_eq!(registry.lookup("host2").unwrap().borrow().speed(), 2e9);
}

#[test]
fn undeclared_platform_hosts_are_excluded() {
    let config = JobConfig::parse(&job("master host0\nworker host1-host2")).unwrap();
    let platform = PlatformConfig::from_yaml_str(PLATFORM).unwrap();
    let registry = HostRegistry::from_config(&config, &platform).unwrap();
    assert_eq!(registry.worker_count(), 2);
    assert_eq!(registry.lookup("spare").unwrap_err(), RegistryError::NotFound("spare".to_string()));
    assert!(platform.host("spare").is_some());

    let roles = registry
        .hosts()
        .map(|host| (host.borrow().name().to_string(), host.borrow().role()))
        .collect::<Vec<_>>();
    assert_eq!(
        roles,
        vec![
            ("host0".to_string(), HostRole::Master),
            ("host1".to_string(), HostRole::Worker),
            ("host2".to_string(), HostRole::Worker)
        ]
    );
}

#[test]
fn declared_hosts_must_exist_in_platform() {
    let config = JobConfig::parse(&job("master host0\nworker host1-host3")).unwrap();
    let platform = PlatformConfig::from_yaml_str(PLATFORM).unwrap();
    assert!(matches!(
        HostRegistry::from_config(&config, &platform),
        Err(ConfigError::UnknownHost(name)) if name == "host3"
    ));
}

#[test]
fn registry_rejects_second_master() {
    let mut registry = HostRegistry::new();
    let spec = |name: &str, role| HostSpec {
        name: name.to_string(),
        role,
        speed: 1.,
        cores: 1,
    };
    registry.register(spec("m1", HostRole::Master)).unwrap();
    assert!(matches!(
        registry.register(spec("m2", HostRole::Master)),
        Err(ConfigError::MasterCount(2))
    ));
    assert!(matches!(
        registry.register(spec("m1", HostRole::Worker)),
        Err(ConfigError::DuplicateHost(_))
    ));
    assert!(matches!(registry.validate(), Err(ConfigError::NoWorkers)));

    let worker = registry.register(spec("w", HostRole::Worker)).unwrap();
    assert_eq!(worker.borrow().id(), 1);
    let mut visited = Vec::new();
    registry.for_each_worker(|host| visited.push(host.borrow().name().to_string()));
    assert_eq!(visited, vec!["w"]);
}

#[test]
fn host_queues_are_fifo() {
    let mut registry = HostRegistry::new();
    let host = registry
        .register(HostSpec {
            name: "w".to_string(),
            role: HostRole::Worker,
            speed: 2.,
            cores: 1,
        })
        .unwrap();
    let mut host = host.borrow_mut();
    host.push_map_task(Task::map(10.));
    host.push_map_task(Task::map(20.));
    assert_eq!(host.assigned_map_tasks(), 2);
    assert_eq!(host.pop_map_task().unwrap().execution_time(host.speed()), 5.);
    assert_eq!(host.map_queue_len(), 1);

    host.push_shuffle_tasks([Task::shuffle(1., "a".to_string()), Task::shuffle(2., "b".to_string())]);
    let task = host.pop_shuffle_task().unwrap();
    assert_eq!(task.kind, TaskKind::Shuffle);
    assert_eq!(task.destination.as_deref(), Some("a"));

    host.add_mapper("w-mapper-0".to_string());
    host.add_mapper("w-mapper-1".to_string());
    assert_eq!(host.mapper_exited(), 1);
    assert_eq!(host.mappers().len(), 2);
}
