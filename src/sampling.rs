//! Event-driven person-count averaging.
//!
//! Person-count samples are summed as they arrive and flushed into a
//! single averaged value when a temperature or GPU message is processed.
//! The window length is therefore whatever the gap between system
//! telemetry messages happens to be, not a wall-clock period.

/// Round to the nearest integer, ties toward negative infinity.
///
/// `2.5 → 2`, `-2.5 → -3`, `2.6 → 3`.
pub fn round_half_down(value: f64) -> f64 {
    let floor = value.floor();
    // `value - floor` is exact; `value - 0.5` is not once the ulp reaches 1.
    if value - floor > 0.5 { floor + 1.0 } else { floor }
}

/// Running sum/count for one flush window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleAccumulator {
    sum: f64,
    count: u32,
}

impl SampleAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count = self.count.saturating_add(1);
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Close the window: returns the rounded mean and resets, or `None`
    /// (and no reset needed) if nothing was accumulated.
    pub fn flush(&mut self) -> Option<i64> {
        if self.count == 0 {
            return None;
        }
        let average = self.sum / f64::from(self.count);
        self.sum = 0.0;
        self.count = 0;
        Some(round_half_down(average) as i64)
    }
}
