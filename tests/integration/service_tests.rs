//! Integration tests: inbound message → AppService → bus publishes.

use edgewatch::actuation::{LedState, RelayPolicy, RelayState};
use edgewatch::alarm::AlarmLevel;
use edgewatch::app::inbound::Disposition;
use edgewatch::config::SystemConfig;
use edgewatch::metrics::MetricType;
use serde_json::json;

use crate::mock_bus::{FixedClock, GPU, MockBus, MockConnector, PERSON, TEMP, msg, service, service_with};

const ALARMS: &str = "ui/alarms";
const RELAY: &str = "actuator/relay";
const LED: &str = "actuator/led_toggle";

// ── Subscription ──────────────────────────────────────────────

#[test]
fn subscribes_to_all_inbound_topics() {
    let svc = service();
    let mut bus = MockBus::new();
    svc.subscribe_all(&mut bus).unwrap();
    assert_eq!(bus.subscriptions, [PERSON, TEMP, GPU]);
}

// ── Person count sampling ─────────────────────────────────────

#[test]
fn person_counts_average_on_gpu_message() {
    let mut svc = service();
    let mut bus = MockBus::new();
    let clock = FixedClock::at(1_000);

    svc.handle_message(&msg(PERSON, r#"{"count": 2}"#), &mut bus, &clock);
    svc.handle_message(&msg(PERSON, r#"{"count": 4}"#), &mut bus, &clock);
    assert!(bus.on("ui/metrics/person_count").is_empty());
    assert_eq!(svc.pending_samples().count(), 2);

    svc.handle_message(&msg(GPU, r#"{"percent": 10}"#), &mut bus, &clock);

    assert_eq!(
        bus.on("ui/metrics/person_count"),
        [&json!({"type": "person_count", "count": 3, "ts": 1_000})]
    );
    let leds = bus.on(LED);
    assert_eq!(leds.len(), 3, "two raw counts and one flush");
    assert!(leds.iter().all(|v| v["state"] == "toggle"));
    assert_eq!(leds[2]["source"], "data_manager");
    assert!(svc.pending_samples().is_empty());
}

#[test]
fn flush_order_follows_metric_and_alarm() {
    let mut svc = service();
    let mut bus = MockBus::new();
    let clock = FixedClock::at(0);

    svc.handle_message(&msg(PERSON, r#"{"count": 1}"#), &mut bus, &clock);
    bus.clear();
    svc.handle_message(&msg(TEMP, r#"{"celsius": 75}"#), &mut bus, &clock);

    assert_eq!(
        bus.topics(),
        [
            "ui/metrics/temperature",
            ALARMS,
            RELAY,
            "ui/metrics/person_count",
            LED
        ]
    );
}

#[test]
fn temperature_also_flushes() {
    let mut svc = service();
    let mut bus = MockBus::new();
    let clock = FixedClock::at(0);

    svc.handle_message(&msg(PERSON, r#"{"count": 5}"#), &mut bus, &clock);
    svc.handle_message(&msg(TEMP, r#"{"celsius": 40}"#), &mut bus, &clock);
    svc.handle_message(&msg(GPU, r#"{"percent": 10}"#), &mut bus, &clock);

    assert_eq!(bus.on("ui/metrics/person_count").len(), 1, "second flush is empty");
}

#[test]
fn flush_rounds_half_down() {
    let mut svc = service();
    let mut bus = MockBus::new();
    let clock = FixedClock::at(0);

    for c in [1, 2] {
        svc.handle_message(&msg(PERSON, &format!(r#"{{"count": {c}}}"#)), &mut bus, &clock);
    }
    svc.handle_message(&msg(GPU, r#"{"percent": 1}"#), &mut bus, &clock);

    for c in [0, 1] {
        svc.handle_message(&msg(PERSON, &format!(r#"{{"count": {c}}}"#)), &mut bus, &clock);
    }
    svc.handle_message(&msg(GPU, r#"{"percent": 1}"#), &mut bus, &clock);

    let counts: Vec<_> = bus.on("ui/metrics/person_count").iter().map(|v| v["count"].clone()).collect();
    assert_eq!(counts, [json!(1), json!(0)]);
    assert_eq!(bus.on(LED).last().unwrap()["state"], "idle");
    assert_eq!(svc.actuation().led(), Some(LedState::Idle));
}

#[test]
fn empty_window_publishes_nothing_for_people() {
    let mut svc = service();
    let mut bus = MockBus::new();
    let clock = FixedClock::at(0);

    svc.handle_message(&msg(GPU, r#"{"percent": 50}"#), &mut bus, &clock);

    assert_eq!(bus.topics(), ["ui/metrics/gpu_usage"]);
}

#[test]
fn led_follows_raw_count() {
    let mut svc = service();
    let mut bus = MockBus::new();
    let clock = FixedClock::at(9);

    svc.handle_message(&msg(PERSON, r#"{"person_count": "0"}"#), &mut bus, &clock);
    svc.handle_message(&msg(PERSON, r#"{"value": 3}"#), &mut bus, &clock);

    let leds = bus.on(LED);
    assert_eq!(leds[0], &json!({"state": "idle", "source": "data_manager", "ts": 9}));
    assert_eq!(leds[1]["state"], "toggle");
}

#[test]
fn negative_person_count_is_dropped() {
    let mut svc = service();
    let mut bus = MockBus::new();
    let clock = FixedClock::at(0);

    let d = svc.handle_message(&msg(PERSON, r#"{"count": -4}"#), &mut bus, &clock);
    assert_eq!(d, Disposition::Malformed);
    assert!(svc.pending_samples().is_empty());
    assert_eq!(svc.pending_samples().sum(), 0.0);
    assert!(bus.on(LED).is_empty());
    assert_eq!(svc.actuation().led(), None);

    svc.handle_message(&msg(PERSON, r#"{"count": 2}"#), &mut bus, &clock);
    svc.handle_message(&msg(GPU, r#"{"percent": 1}"#), &mut bus, &clock);
    assert_eq!(bus.on("ui/metrics/person_count")[0]["count"], 2);
}

// ── Alarms and relay ──────────────────────────────────────────

#[test]
fn temperature_alarm_sequence() {
    let mut svc = service();
    let mut bus = MockBus::new();
    let clock = FixedClock::at(100);

    for t in [65, 72, 85] {
        svc.handle_message(&msg(TEMP, &format!(r#"{{"celsius": {t}}}"#)), &mut bus, &clock);
    }

    assert_eq!(
        bus.on(ALARMS),
        [
            &json!({"type": "temperature", "level": "warning", "value": 72.0, "threshold": 70.0, "ts": 100}),
            &json!({"type": "temperature", "level": "alarm", "value": 85.0, "threshold": 80.0, "ts": 100}),
        ]
    );
    assert_eq!(bus.on("ui/metrics/temperature").len(), 3);
    assert_eq!(svc.alarm_level(MetricType::Temperature), AlarmLevel::Alarm);
}

#[test]
fn return_to_normal_reports_warn_threshold() {
    let mut svc = service();
    let mut bus = MockBus::new();
    let clock = FixedClock::at(0);

    svc.handle_message(&msg(GPU, r#"{"percent": 99}"#), &mut bus, &clock);
    svc.handle_message(&msg(GPU, r#"{"percent": 10}"#), &mut bus, &clock);

    let alarms = bus.on(ALARMS);
    assert_eq!(alarms.len(), 2);
    assert_eq!(alarms[1]["level"], "normal");
    assert_eq!(alarms[1]["threshold"], 85.0);
}

#[test]
fn repeated_level_is_not_republished() {
    let mut svc = service();
    let mut bus = MockBus::new();
    let clock = FixedClock::at(0);

    for p in [90, 91, 92] {
        svc.handle_message(&msg(GPU, &format!(r#"{{"percent": {p}}}"#)), &mut bus, &clock);
    }
    assert_eq!(bus.on(ALARMS).len(), 1);
    assert_eq!(bus.on(RELAY).len(), 1);
}

#[test]
fn relay_warning_policy() {
    let mut svc = service();
    let mut bus = MockBus::new();
    let clock = FixedClock::at(5);

    for t in [65, 72, 85, 75, 50] {
        svc.handle_message(&msg(TEMP, &format!(r#"{{"celsius": {t}}}"#)), &mut bus, &clock);
    }

    assert_eq!(
        bus.on(RELAY),
        [
            &json!({"state": "on", "source": "data_manager", "ts": 5}),
            &json!({"state": "off", "source": "data_manager", "ts": 5}),
        ]
    );
    assert_eq!(svc.actuation().relay(), RelayState::Off);
}

#[test]
fn relay_alarm_policy() {
    let config = SystemConfig {
        relay_on_level: RelayPolicy::Alarm,
        ..SystemConfig::default()
    };
    let mut svc = service_with(config, MockConnector::default());
    let mut bus = MockBus::new();
    let clock = FixedClock::at(0);

    svc.handle_message(&msg(TEMP, r#"{"celsius": 72}"#), &mut bus, &clock);
    assert!(bus.on(RELAY).is_empty(), "warning does not energise under alarm policy");

    svc.handle_message(&msg(TEMP, r#"{"celsius": 85}"#), &mut bus, &clock);
    assert_eq!(bus.on(RELAY).len(), 1);
    assert_eq!(bus.on(RELAY)[0]["state"], "on");
}

#[test]
fn relay_combines_both_metrics() {
    let mut svc = service();
    let mut bus = MockBus::new();
    let clock = FixedClock::at(0);

    svc.handle_message(&msg(TEMP, r#"{"celsius": 75}"#), &mut bus, &clock);
    svc.handle_message(&msg(GPU, r#"{"percent": 90}"#), &mut bus, &clock);
    svc.handle_message(&msg(TEMP, r#"{"celsius": 20}"#), &mut bus, &clock);
    assert_eq!(bus.on(RELAY).len(), 1, "gpu still in warning keeps relay on");

    svc.handle_message(&msg(GPU, r#"{"percent": 20}"#), &mut bus, &clock);
    let relay = bus.on(RELAY);
    assert_eq!(relay.len(), 2);
    assert_eq!(relay[1]["state"], "off");
}

// ── Normalisation at the edge ─────────────────────────────────

#[test]
fn payload_timestamp_is_forwarded() {
    let mut svc = service();
    let mut bus = MockBus::new();
    let clock = FixedClock::at(999);

    svc.handle_message(&msg(TEMP, r#"{"temp": "71.5", "ts": 1234.9}"#), &mut bus, &clock);

    assert_eq!(
        bus.on("ui/metrics/temperature"),
        [&json!({"type": "temperature", "celsius": 71.5, "ts": 1234})]
    );
    assert_eq!(bus.on(ALARMS)[0]["ts"], 999);
}

#[test]
fn malformed_and_unknown_are_dropped() {
    let mut svc = service();
    let mut bus = MockBus::new();
    let clock = FixedClock::at(0);

    let cases = [
        (TEMP, "not json", Disposition::Malformed),
        (TEMP, "[72]", Disposition::Malformed),
        (TEMP, r#"{"celsius": null}"#, Disposition::Malformed),
        (GPU, r#"{"percent": "  "}"#, Disposition::Malformed),
        (GPU, r#"{"percent": true}"#, Disposition::Malformed),
        (PERSON, r#"{"people": 3}"#, Disposition::Malformed),
        ("some/other/topic", r#"{"value": 1}"#, Disposition::UnknownTopic),
    ];
    for (topic, payload, expected) in cases {
        assert_eq!(svc.handle_message(&msg(topic, payload), &mut bus, &clock), expected, "{payload}");
    }

    assert!(bus.published.is_empty());
    let stats = svc.stats();
    assert_eq!(stats.dropped, cases.len() as u64);
    assert_eq!(stats.processed, 0);
}

#[test]
fn malformed_system_metric_does_not_flush() {
    let mut svc = service();
    let mut bus = MockBus::new();
    let clock = FixedClock::at(0);

    svc.handle_message(&msg(PERSON, r#"{"count": 2}"#), &mut bus, &clock);
    svc.handle_message(&msg(GPU, r#"{"percent": "n/a"}"#), &mut bus, &clock);

    assert_eq!(svc.pending_samples().count(), 1);
    assert!(bus.on("ui/metrics/person_count").is_empty());
}

// ── Transport failures ────────────────────────────────────────

#[test]
fn publish_failures_do_not_stop_processing() {
    let mut svc = service();
    let mut bus = MockBus {
        fail: true,
        ..MockBus::new()
    };
    let clock = FixedClock::at(0);

    svc.handle_message(&msg(TEMP, r#"{"celsius": 90}"#), &mut bus, &clock);
    bus.fail = false;
    svc.handle_message(&msg(TEMP, r#"{"celsius": 90}"#), &mut bus, &clock);

    assert_eq!(svc.alarm_level(MetricType::Temperature), AlarmLevel::Alarm);
    assert_eq!(svc.actuation().relay(), RelayState::On);
    assert!(bus.on(RELAY).is_empty(), "relay state is not republished after a lost publish");
    assert_eq!(svc.stats().publish_failures, 3);
    assert_eq!(svc.stats().processed, 2);
}
