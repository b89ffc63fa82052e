//! Actuation decisions for the relay and the status LED.
//!
//! The relay follows the combined alarm state of temperature and GPU load
//! and is edge-triggered: a command is produced only when the derived
//! on/off differs from the last one produced.  The LED follows the most
//! recent person count and is re-asserted on every contributing event.

use core::fmt;
use core::str::FromStr;

use log::info;
use serde::{Deserialize, Serialize};

use crate::alarm::AlarmLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayState {
    On,
    #[default]
    Off,
}

impl RelayState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedState {
    Idle,
    Toggle,
}

impl LedState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Toggle => "toggle",
        }
    }

    /// `Toggle` iff at least one person is present.
    pub fn for_count(count: f64) -> Self {
        if count >= 1.0 { Self::Toggle } else { Self::Idle }
    }
}

impl fmt::Display for LedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which alarm level energises the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayPolicy {
    /// On while either metric is at `Warning` or above.
    #[default]
    Warning,
    /// On only while either metric is at `Alarm`.
    Alarm,
}

impl RelayPolicy {
    pub fn relay_for(self, temperature: AlarmLevel, gpu: AlarmLevel) -> RelayState {
        let on = match self {
            Self::Alarm => temperature == AlarmLevel::Alarm || gpu == AlarmLevel::Alarm,
            Self::Warning => temperature != AlarmLevel::Normal || gpu != AlarmLevel::Normal,
        };
        if on { RelayState::On } else { RelayState::Off }
    }
}

impl FromStr for RelayPolicy {
    type Err = ();

    /// `"alarm"` selects [`RelayPolicy::Alarm`]; any other value keeps the
    /// default warning policy.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("alarm") {
            Ok(Self::Alarm)
        } else {
            Ok(Self::Warning)
        }
    }
}

/// Holds the last published actuator state.
#[derive(Debug, Clone)]
pub struct ActuationDecider {
    policy: RelayPolicy,
    relay: RelayState,
    led: Option<LedState>,
}

impl ActuationDecider {
    pub fn new(policy: RelayPolicy) -> Self {
        Self {
            policy,
            relay: RelayState::Off,
            led: None,
        }
    }

    /// Re-derive the relay.  Returns `Some` only if it changed.
    pub fn decide_relay(&mut self, temperature: AlarmLevel, gpu: AlarmLevel) -> Option<RelayState> {
        let next = self.policy.relay_for(temperature, gpu);
        if next == self.relay {
            return None;
        }
        info!("RELAY | {} -> {} (temp={} gpu={})", self.relay, next, temperature, gpu);
        self.relay = next;
        Some(next)
    }

    /// Derive the LED from a count.  Always returns a state to publish.
    pub fn decide_led(&mut self, count: f64) -> LedState {
        let next = LedState::for_count(count);
        self.led = Some(next);
        next
    }

    pub fn relay(&self) -> RelayState {
        self.relay
    }

    /// `None` until the first person-count event.
    pub fn led(&self) -> Option<LedState> {
        self.led
    }

    pub fn policy(&self) -> RelayPolicy {
        self.policy
    }
}
