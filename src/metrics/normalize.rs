//! Metric normaliser.
//!
//! Publishers disagree on field names: DeepStream sends `count`, older
//! bridges send `person_count`, ad-hoc scripts send `value`.  Each metric
//! has an ordered candidate list; the first candidate that coerces to a
//! finite number wins.  The lists are configuration data
//! ([`FieldCandidates`]) so they can be tested and overridden without
//! touching this code.

use heapless::{String as HString, Vec as HVec};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{MetricRecord, MetricType};

/// Maximum number of candidate fields per metric.
pub const MAX_FIELDS: usize = 4;
/// Maximum length of a single candidate field name.
pub const MAX_FIELD_LEN: usize = 32;

pub type FieldName = HString<MAX_FIELD_LEN>;
pub type FieldList = HVec<FieldName, MAX_FIELDS>;

/// Ordered candidate field names for every metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCandidates {
    pub person_count: FieldList,
    pub temperature: FieldList,
    pub gpu_usage: FieldList,
}

impl Default for FieldCandidates {
    fn default() -> Self {
        Self {
            person_count: field_list(&["count", "person_count", "value"]),
            temperature: field_list(&["celsius", "temp", "value"]),
            gpu_usage: field_list(&["percent", "usage", "value"]),
        }
    }
}

impl FieldCandidates {
    pub fn for_metric(&self, metric: MetricType) -> &FieldList {
        match metric {
            MetricType::PersonCount => &self.person_count,
            MetricType::Temperature => &self.temperature,
            MetricType::GpuUsage => &self.gpu_usage,
        }
    }

    pub fn for_metric_mut(&mut self, metric: MetricType) -> &mut FieldList {
        match metric {
            MetricType::PersonCount => &mut self.person_count,
            MetricType::Temperature => &mut self.temperature,
            MetricType::GpuUsage => &mut self.gpu_usage,
        }
    }
}

/// Build a [`FieldList`] from string slices.
///
/// Names longer than [`MAX_FIELD_LEN`] and entries beyond [`MAX_FIELDS`]
/// are dropped; use [`parse_field_list`] when the input is untrusted.
pub fn field_list(names: &[&str]) -> FieldList {
    let mut list = FieldList::new();
    for name in names {
        if let Ok(n) = FieldName::try_from(*name) {
            let _ = list.push(n);
        }
    }
    list
}

/// Parse a comma-separated candidate list (e.g. from an environment
/// variable).  Returns `None` if the list is empty, has too many entries
/// or contains an over-long name.
pub fn parse_field_list(raw: &str) -> Option<FieldList> {
    let mut list = FieldList::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let n = FieldName::try_from(name).ok()?;
        list.push(n).ok()?;
    }
    (!list.is_empty()).then_some(list)
}

/// Coerce a JSON value to a finite `f64`.
///
/// Accepts JSON numbers and non-blank numeric strings.  Booleans, `null`,
/// containers and non-finite results (`"NaN"`, `"inf"`) are rejected.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn first_number(doc: &Map<String, Value>, candidates: &FieldList) -> Option<f64> {
    candidates
        .iter()
        .find_map(|field| doc.get(field.as_str()).and_then(coerce_number))
}

/// Maps raw payloads to [`MetricRecord`]s.  Pure: no state, no I/O.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    candidates: FieldCandidates,
}

impl Normalizer {
    pub fn new(candidates: FieldCandidates) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &FieldCandidates {
        &self.candidates
    }

    /// Normalise one payload.
    ///
    /// `received_ms` is used as the timestamp unless the payload carries a
    /// numeric `ts`.  Returns `None` when the payload is not a JSON object
    /// or no candidate field holds a finite number.
    pub fn normalize(
        &self,
        metric: MetricType,
        payload: &[u8],
        received_ms: i64,
    ) -> Option<MetricRecord> {
        let doc: Value = serde_json::from_slice(payload).ok()?;
        let obj = doc.as_object()?;
        let value = first_number(obj, self.candidates.for_metric(metric))?;
        let timestamp_ms = obj
            .get("ts")
            .and_then(coerce_number)
            .map_or(received_ms, |ts| ts as i64);
        Some(MetricRecord::new(metric, value, timestamp_ms))
    }
}
