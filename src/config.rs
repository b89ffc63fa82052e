//! System configuration parameters
//!
//! All tunable parameters for the data manager.  Values are layered:
//! built-in defaults, then an optional JSON file, then environment
//! variables (the names the rest of the Jetson stack already exports).
//! CLI flags are applied last by the binary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::actuation::RelayPolicy;
use crate::alarm::Thresholds;
use crate::error::ConfigError;
use crate::metrics::MetricType;
use crate::metrics::normalize::{FieldCandidates, parse_field_list};

/// Bus topics, inbound and outbound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    // --- Inbound ---
    pub person_count: String,
    pub temperature: String,
    pub gpu_usage: String,

    // --- UI ---
    /// Forwarded metrics go to `<metrics_prefix>/<metric>`.
    pub metrics_prefix: String,
    pub alarms: String,

    // --- Actuators ---
    pub relay_command: String,
    pub led_toggle: String,
    /// Where the relay emulator reports its state.
    pub relay_status: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            person_count: "deepstream/person_count".into(),
            temperature: "jetson/internal/temperature".into(),
            gpu_usage: "jetson/internal/gpu_usage".into(),
            metrics_prefix: "ui/metrics".into(),
            alarms: "ui/alarms".into(),
            relay_command: "actuator/relay".into(),
            led_toggle: "actuator/led_toggle".into(),
            relay_status: "actuator/relay_status".into(),
        }
    }
}

impl TopicConfig {
    /// Inbound topic carrying `metric`.
    pub fn inbound(&self, metric: MetricType) -> &str {
        match metric {
            MetricType::PersonCount => &self.person_count,
            MetricType::Temperature => &self.temperature,
            MetricType::GpuUsage => &self.gpu_usage,
        }
    }

    /// Reverse lookup of [`inbound`](Self::inbound).
    pub fn metric_for(&self, topic: &str) -> Option<MetricType> {
        MetricType::ALL.into_iter().find(|m| self.inbound(*m) == topic)
    }

    /// UI topic a normalised `metric` is forwarded to.
    pub fn forwarded(&self, metric: MetricType) -> String {
        format!("{}/{}", self.metrics_prefix, metric.as_str())
    }
}

/// Warn/alarm thresholds per metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// °C
    pub temperature: Thresholds,
    /// Percent
    pub gpu_usage: Thresholds,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            temperature: Thresholds::new(70.0, 80.0),
            gpu_usage: Thresholds::new(85.0, 95.0),
        }
    }
}

/// Persistence sidecar settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Master switch; off by default.
    pub enabled: bool,
    pub metrics_table: String,
    pub alarms_table: String,
    /// Liveness artifact rewritten after every successful write.
    pub heartbeat_path: PathBuf,
    /// Heartbeat age beyond which the cloud status reports an error.
    pub heartbeat_ttl_secs: u64,
    /// Directory of the file-backed store.
    pub data_dir: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            metrics_table: "metrics".into(),
            alarms_table: "alarms".into(),
            heartbeat_path: PathBuf::from("data/ddb_heartbeat.json"),
            heartbeat_ttl_secs: 30,
            data_dir: PathBuf::from("data/ddb"),
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub topics: TopicConfig,
    pub thresholds: ThresholdConfig,
    /// Which alarm level energises the relay.
    pub relay_on_level: RelayPolicy,
    /// Ordered payload field candidates per metric.
    pub candidates: FieldCandidates,
    pub persistence: PersistenceConfig,

    // --- Transport ---
    /// QoS for every publish (0–2).
    pub qos: u8,
    /// `source` tag on actuator commands and heartbeats.
    pub source_tag: String,
    /// Bounded ingress queue depth between the reader and the dispatcher.
    pub queue_capacity: usize,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            topics: TopicConfig::default(),
            thresholds: ThresholdConfig::default(),
            relay_on_level: RelayPolicy::Warning,
            candidates: FieldCandidates::default(),
            persistence: PersistenceConfig::default(),
            qos: 0,
            source_tag: "data_manager".into(),
            queue_capacity: 64,
        }
    }
}

impl SystemConfig {
    /// Defaults → optional JSON file → environment, then validate.
    pub fn load(
        file: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file.  Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read(path)
            .map_err(|e| ConfigError::File(format!("{}: {e}", path.display())))?;
        serde_json::from_slice(&raw)
            .map_err(|e| ConfigError::File(format!("{}: {e}", path.display())))
    }

    /// Apply environment overrides.  `env` returns the raw value of a
    /// variable if set (tests pass a map lookup, the binary `std::env::var`).
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let t = &mut self.topics;
        set_string(&env, "PERSON_COUNT_TOPIC", &mut t.person_count);
        set_string(&env, "TEMPERATURE_TOPIC", &mut t.temperature);
        set_string(&env, "GPU_USAGE_TOPIC", &mut t.gpu_usage);
        set_string(&env, "UI_METRICS_PREFIX", &mut t.metrics_prefix);
        set_string(&env, "UI_ALARM_TOPIC", &mut t.alarms);
        set_string(&env, "RELAY_COMMAND_TOPIC", &mut t.relay_command);
        set_string(&env, "LED_TOGGLE_TOPIC", &mut t.led_toggle);
        set_string(&env, "RELAY_STATUS_TOPIC", &mut t.relay_status);

        let th = &mut self.thresholds;
        set_parsed(&env, "TEMP_WARN_C", &mut th.temperature.warn)?;
        set_parsed(&env, "TEMP_ALARM_C", &mut th.temperature.alarm)?;
        set_parsed(&env, "GPU_WARN_PCT", &mut th.gpu_usage.warn)?;
        set_parsed(&env, "GPU_ALARM_PCT", &mut th.gpu_usage.alarm)?;
        set_parsed(&env, "RELAY_ON_LEVEL", &mut self.relay_on_level)?;

        for (var, metric) in [
            ("PERSON_COUNT_FIELDS", MetricType::PersonCount),
            ("TEMPERATURE_FIELDS", MetricType::Temperature),
            ("GPU_USAGE_FIELDS", MetricType::GpuUsage),
        ] {
            if let Some(raw) = env(var) {
                let list = parse_field_list(&raw)
                    .ok_or(ConfigError::InvalidEnv { var, value: raw })?;
                *self.candidates.for_metric_mut(metric) = list;
            }
        }

        set_parsed(&env, "MQTT_QOS", &mut self.qos)?;

        let p = &mut self.persistence;
        if let Some(raw) = env("DDB_ENABLED") {
            p.enabled = raw.trim() == "1";
        }
        set_string(&env, "DDB_METRICS_TABLE", &mut p.metrics_table);
        set_string(&env, "DDB_ALARMS_TABLE", &mut p.alarms_table);
        set_parsed(&env, "DDB_HEARTBEAT_TTL_SECONDS", &mut p.heartbeat_ttl_secs)?;
        if let Some(raw) = env("DDB_HEARTBEAT_PATH") {
            p.heartbeat_path = PathBuf::from(raw);
        }
        if let Some(raw) = env("DDB_DATA_DIR") {
            p.data_dir = PathBuf::from(raw);
        }
        Ok(())
    }

    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.thresholds.temperature.is_valid() {
            return Err(ConfigError::ValidationFailed(
                "temperature thresholds must be finite with warn < alarm",
            ));
        }
        if !self.thresholds.gpu_usage.is_valid() {
            return Err(ConfigError::ValidationFailed(
                "gpu_usage thresholds must be finite with warn < alarm",
            ));
        }
        let t = &self.topics;
        let topics = [
            &t.person_count,
            &t.temperature,
            &t.gpu_usage,
            &t.metrics_prefix,
            &t.alarms,
            &t.relay_command,
            &t.led_toggle,
            &t.relay_status,
        ];
        if topics.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::ValidationFailed("topics must not be empty"));
        }
        if t.person_count == t.temperature
            || t.person_count == t.gpu_usage
            || t.temperature == t.gpu_usage
        {
            return Err(ConfigError::ValidationFailed("inbound topics must be distinct"));
        }
        if MetricType::ALL
            .iter()
            .any(|m| self.candidates.for_metric(*m).is_empty())
        {
            return Err(ConfigError::ValidationFailed("candidate field lists must not be empty"));
        }
        if self.qos > 2 {
            return Err(ConfigError::ValidationFailed("qos must be 0, 1 or 2"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ValidationFailed("queue_capacity must be > 0"));
        }
        let p = &self.persistence;
        if p.metrics_table.trim().is_empty() || p.alarms_table.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("table names must not be empty"));
        }
        if p.heartbeat_ttl_secs == 0 {
            return Err(ConfigError::ValidationFailed("heartbeat_ttl_secs must be > 0"));
        }
        Ok(())
    }
}

fn set_string(env: &impl Fn(&str) -> Option<String>, var: &'static str, slot: &mut String) {
    if let Some(raw) = env(var) {
        *slot = raw;
    }
}

fn set_parsed<T: std::str::FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    slot: &mut T,
) -> Result<(), ConfigError> {
    if let Some(raw) = env(var) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { var, value: raw })?;
    }
    Ok(())
}
