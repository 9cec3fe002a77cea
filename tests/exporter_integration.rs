mod common;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use common::{body_string, build_app, get, sample, samples, test_config};
use prometheus::IntCounter;
use serde_json::Value;
use sysmond::metrics::MetricRegistryBuilder;
use sysmond::probes::test_probe::TestProbe;
use sysmond::probes::{Probe, ProbeConfig, ProbeError, ProcProbeConfig};
use sysmond::scheduler::{poll_once, PollScheduler};
use sysmond::startup::{build_exporter, run, StartupError};
use sysmond::utils::log_throttle::LogThrottle;
use tempfile::TempDir;
use tower::ServiceExt;

fn register(probe: &Arc<TestProbe>) -> (Arc<sysmond::metrics::MetricRegistry>, IntCounter) {
    let mut builder = MetricRegistryBuilder::new();
    let errors = builder
        .register_probe(probe.clone())
        .expect("registration should succeed");
    (Arc::new(builder.finish()), errors)
}

#[tokio::test]
async fn disk_scenario_end_to_end() {
    let mut disk = TestProbe::new("disk", &["free_pct"]);
    disk.init().expect("init");
    let disk = Arc::new(disk);
    let (metrics, errors) = register(&disk);
    let app = build_app(metrics);
    let probe: Arc<dyn Probe> = disk.clone();
    let mut throttle = LogThrottle::new(Duration::from_secs(60));

    // Visible before the first update, at the probe's initial state.
    let response = app.clone().oneshot(get("/metrics")).await.expect("scrape");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/plain")));
    let text = body_string(response).await;
    assert_eq!(sample(&text, "disk_free_pct"), Some(0.0));
    assert_eq!(sample(&text, "disk_errors"), Some(0.0));

    disk.stage("free_pct", 87.5);
    assert!(poll_once(&probe, &errors, &mut throttle).await);
    let text = body_string(app.clone().oneshot(get("/metrics")).await.expect("scrape")).await;
    assert!(text.contains("disk_free_pct 87.5\n"));

    disk.set_failing(true);
    assert!(!poll_once(&probe, &errors, &mut throttle).await);
    let text = body_string(app.clone().oneshot(get("/metrics")).await.expect("scrape")).await;
    assert!(text.contains("disk_errors 1\n"));
    assert!(text.contains("disk_free_pct 87.5\n"));
}

#[tokio::test]
async fn failures_only_move_the_error_counter() {
    let mut disk = TestProbe::new("disk", &["free_pct", "used_pct"]);
    disk.init().expect("init");
    let disk = Arc::new(disk);
    let (metrics, errors) = register(&disk);
    let probe: Arc<dyn Probe> = disk.clone();
    let mut throttle = LogThrottle::new(Duration::from_secs(60));

    disk.stage("free_pct", 40.0);
    disk.stage("used_pct", 60.0);
    poll_once(&probe, &errors, &mut throttle).await;

    disk.set_failing(true);
    for _ in 0..4 {
        poll_once(&probe, &errors, &mut throttle).await;
    }

    let text = metrics.render().expect("render");
    assert_eq!(sample(&text, "disk_errors"), Some(4.0));
    assert_eq!(sample(&text, "disk_free_pct"), Some(40.0));
    assert_eq!(sample(&text, "disk_used_pct"), Some(60.0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_scrapes_get_complete_renderings() {
    let fields = ["a", "b", "c", "d", "e"];
    let probes: Vec<Box<dyn Probe>> = vec![
        Box::new(TestProbe::new("alpha", &fields)),
        Box::new(TestProbe::new("beta", &fields)),
    ];
    let exporter = build_exporter(probes).expect("exporter");
    let mut expected: Vec<String> = exporter.registry().metric_names().to_vec();
    expected.sort();

    let scheduler = PollScheduler::new(Duration::from_millis(1), Duration::from_secs(60))
        .expect("non-zero interval");
    let (metrics, units) = exporter.start_polling(&scheduler);
    let app = build_app(metrics);

    let scrapes: Vec<_> = (0..32)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move {
                let response = app.oneshot(get("/metrics")).await.expect("scrape");
                assert_eq!(response.status(), StatusCode::OK);
                body_string(response).await
            })
        })
        .collect();

    for scrape in scrapes {
        let text = scrape.await.expect("scrape task");
        let mut names: Vec<String> = samples(&text).into_iter().map(|(n, _)| n).collect();
        names.sort();
        assert_eq!(names, expected);
    }

    for unit in units {
        unit.abort();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn polled_values_and_uptime_advance() {
    let probes: Vec<Box<dyn Probe>> = vec![Box::new(TestProbe::new("ticker", &["count"]))];
    let exporter = build_exporter(probes).expect("exporter");
    let scheduler = PollScheduler::new(Duration::from_millis(10), Duration::from_secs(60))
        .expect("non-zero interval");
    let (metrics, units) = exporter.start_polling(&scheduler);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let first = metrics.render().expect("render");
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = metrics.render().expect("render");

    let count = |text: &str| sample(text, "ticker_count").expect("count sample");
    let uptime = |text: &str| sample(text, "ticker_uptime").expect("uptime sample");
    assert!(count(&second) > count(&first));
    assert!(uptime(&second) > uptime(&first));

    for unit in units {
        unit.abort();
    }
}

#[tokio::test]
async fn probes_endpoint_lists_registered_probes() {
    let mut disk = TestProbe::new("disk", &["free_pct"]);
    disk.init().expect("init");
    let disk = Arc::new(disk);
    let (metrics, _errors) = register(&disk);
    let app = build_app(metrics);

    let response = app.oneshot(get("/probes")).await.expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_string(response).await).expect("json");

    assert_eq!(body["poll_interval_ms"], 10);
    assert_eq!(body["probes"][0]["name"], "disk");
    assert_eq!(body["probes"][0]["type"], "test");
    assert_eq!(body["probes"][0]["fields"][0], "free_pct");
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let (metrics, _errors) = register(&Arc::new(TestProbe::new("disk", &[])));
    let response = build_app(metrics)
        .oneshot(get("/health"))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "OK");
}

fn proc_probe(kind: &str, root: &TempDir) -> ProbeConfig {
    let cfg = ProcProbeConfig {
        name: None,
        proc_root: root.path().to_path_buf(),
    };
    match kind {
        "cpu" => ProbeConfig::Cpu(cfg),
        "memory" => ProbeConfig::Memory(cfg),
        _ => ProbeConfig::Load(cfg),
    }
}

#[tokio::test]
async fn init_failure_never_reaches_serving() {
    let empty = TempDir::new().expect("tempdir");
    // Holding the port proves run() never tried to bind it.
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let config = sysmond::config::ConfigV1 {
        bind_address: occupied.local_addr().expect("addr").to_string(),
        probes: vec![proc_probe("load", &empty)],
        ..test_config()
    };

    let err = run(Arc::new(config)).await.expect_err("init must fail");
    assert!(matches!(err, StartupError::Init(ProbeError::Init { .. })));
}

#[tokio::test]
async fn bind_failure_is_fatal() {
    let root = TempDir::new().expect("tempdir");
    fs::write(root.path().join("loadavg"), "0.10 0.20 0.30 1/100 42\n").expect("write");
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let config = sysmond::config::ConfigV1 {
        bind_address: occupied.local_addr().expect("addr").to_string(),
        probes: vec![proc_probe("load", &root)],
        ..test_config()
    };

    let err = run(Arc::new(config)).await.expect_err("bind must fail");
    assert!(matches!(err, StartupError::Bind { .. }));
}

#[tokio::test]
async fn procfs_probes_export_their_fields() {
    let root = TempDir::new().expect("tempdir");
    fs::write(root.path().join("stat"), "cpu  10 0 10 80 0 0 0 0\n").expect("write");
    fs::write(
        root.path().join("meminfo"),
        "MemTotal: 1000 kB\nMemFree: 500 kB\nMemAvailable: 600 kB\n",
    )
    .expect("write");
    fs::write(root.path().join("loadavg"), "0.10 0.20 0.30 1/100 42\n").expect("write");

    let probes = ["cpu", "memory", "load"]
        .iter()
        .map(|kind| sysmond::probes::create_probe(&proc_probe(kind, &root)))
        .collect();
    let exporter = build_exporter(probes).expect("exporter");
    let names = exporter.registry().metric_names().to_vec();

    for name in [
        "cpu_usage_pct",
        "cpu_errors",
        "memory_used_pct",
        "memory_uptime",
        "load_load1",
        "load_total_tasks",
    ] {
        assert!(names.iter().any(|n| n == name), "missing {}", name);
    }
    let text = exporter.registry().render().expect("render");
    assert_eq!(samples(&text).len(), names.len());
}
