//! Fuzz target: `Normalizer::normalize` and `parse_raw_line`
//!
//! Drives arbitrary bytes through the line parser and the payload
//! normaliser for every metric, asserting that neither panics and that
//! every accepted record carries a finite value.
//!
//! cargo fuzz run fuzz_normalize

#![no_main]

use edgewatch::adapters::line_bus::parse_raw_line;
use edgewatch::metrics::MetricType;
use edgewatch::metrics::normalize::{FieldCandidates, Normalizer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let norm = Normalizer::new(FieldCandidates::default());

    for metric in MetricType::ALL {
        if let Some(record) = norm.normalize(metric, data, 0) {
            assert!(record.value().is_finite(), "non-finite value accepted");
            assert_eq!(record.metric(), metric);
        }
    }

    if let Some(msg) = parse_raw_line(data) {
        assert!(!msg.topic.is_empty(), "parsed an empty topic");
        assert!(!msg.topic.contains(' '));
    }
});
