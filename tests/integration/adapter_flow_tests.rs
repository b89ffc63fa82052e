//! End-to-end: line transport → ingress queue → AppService → line
//! transport, with the file store underneath.

use std::fs;
use std::time::{Duration, SystemTime};

use edgewatch::adapters::json_store::{FileHeartbeat, JsonlConnector};
use edgewatch::adapters::line_bus::{LineBus, read_lines};
use edgewatch::app::service::AppService;
use edgewatch::config::SystemConfig;
use edgewatch::dispatch;
use edgewatch::health::{CloudStatus, cloud_status};
use edgewatch::persistence::PersistenceSidecar;

use crate::mock_bus::FixedClock;

const INPUT: &str = "\
deepstream/person_count {\"count\": 2}
deepstream/person_count {\"count\": 4}
unrelated/topic {\"value\": 1}
jetson/internal/temperature {\"celsius\": 72}
jetson/internal/gpu_usage garbage
";

#[test]
fn stdin_to_stdout_with_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = SystemConfig::default();
    config.persistence.enabled = true;
    config.persistence.data_dir = dir.path().join("ddb");
    config.persistence.heartbeat_path = dir.path().join("ddb_heartbeat.json");

    let p = &config.persistence;
    let persistence = PersistenceSidecar::new(
        p,
        &config.source_tag,
        JsonlConnector::new(&p.data_dir),
        FileHeartbeat::new(&p.heartbeat_path),
    );
    let heartbeat_path = p.heartbeat_path.clone();
    let metrics_path = p.data_dir.join("metrics.jsonl");
    let mut svc = AppService::new(config, persistence);

    let mut bus = LineBus::new(Vec::new());
    svc.subscribe_all(&mut bus).unwrap();

    let (tx, rx) = dispatch::ingress(4);
    let filters = bus.subscriptions().to_vec();
    let reader = std::thread::spawn(move || read_lines(INPUT.as_bytes(), &filters, &tx));

    let clock = FixedClock::at(500);
    let n = dispatch::drain(&rx, |m| {
        svc.handle_message(&m, &mut bus, &clock);
    });
    assert_eq!(reader.join().unwrap().unwrap(), 4);
    assert_eq!(n, 4);

    let out = String::from_utf8(bus.into_inner()).unwrap();
    let topics: Vec<&str> = out.lines().map(|l| l.split_once(' ').unwrap().0).collect();
    assert_eq!(
        topics,
        [
            "actuator/led_toggle",
            "actuator/led_toggle",
            "ui/metrics/temperature",
            "ui/alarms",
            "actuator/relay",
            "ui/metrics/person_count",
            "actuator/led_toggle",
        ]
    );
    assert!(out.contains(r#"ui/metrics/person_count {"count":3,"ts":500,"type":"person_count"}"#));

    assert_eq!(fs::read_to_string(metrics_path).unwrap().lines().count(), 2);
    assert_eq!(
        cloud_status(true, &heartbeat_path, Duration::from_secs(30), SystemTime::now()),
        CloudStatus::On
    );
    assert_eq!(svc.stats().dropped, 1);
}
