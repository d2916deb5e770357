use serde::{Deserialize, Serialize};

use crate::config::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ControlMode {
    Auto,
    Manual,
}

impl ControlMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::Manual => "MANUAL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("AUTO") {
            Some(Self::Auto)
        } else if value.eq_ignore_ascii_case("MANUAL") {
            Some(Self::Manual)
        } else {
            None
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Auto => Self::Manual,
            Self::Manual => Self::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelaySignal {
    On,
    Off,
}

impl RelaySignal {
    pub fn from_state(on: bool) -> Self {
        if on {
            Self::On
        } else {
            Self::Off
        }
    }

    pub fn is_on(self) -> bool {
        self == Self::On
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("ON") {
            Some(Self::On)
        } else if value.eq_ignore_ascii_case("OFF") {
            Some(Self::Off)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatePayload {
    pub state: &'static str,
    pub mode: &'static str,
    pub target_temp: f32,
    pub current_temp: Option<f32>,
    pub delta_temp: f32,
    pub start_hour: u8,
    pub start_min: u8,
    pub end_hour: u8,
    pub end_min: u8,
    pub frost_protection_temp: f32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusView {
    pub state: &'static str,
    pub relay_on: bool,
    pub mode: &'static str,
    pub current_temp: Option<f32>,
    pub sensor_valid: bool,
    pub settings: Settings,
    pub window_active: bool,
    pub window_wraps_midnight: bool,
    pub last_on_epoch: Option<i64>,
    pub last_off_epoch: Option<i64>,
    pub last_on_period_secs: u64,
    pub current_run_secs: u64,
    pub mqtt_connected: bool,
    pub reconnects: u32,
    pub now_epoch: i64,
    pub utc_offset_secs: i32,
    pub timezone: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parse_ignores_case() {
        assert_eq!(ControlMode::parse("manual"), Some(ControlMode::Manual));
        assert_eq!(ControlMode::parse(" Auto "), Some(ControlMode::Auto));
        assert_eq!(ControlMode::parse("heat"), None);
    }

    #[test]
    fn toggling_mode_twice_restores_it() {
        assert_eq!(ControlMode::Auto.toggled().toggled(), ControlMode::Auto);
        assert_eq!(ControlMode::Auto.toggled(), ControlMode::Manual);
    }

    #[test]
    fn relay_signal_round_trips_labels() {
        assert_eq!(RelaySignal::parse("on"), Some(RelaySignal::On));
        assert_eq!(RelaySignal::parse("OFF"), Some(RelaySignal::Off));
        assert_eq!(RelaySignal::parse("toggle"), None);
        assert_eq!(RelaySignal::from_state(true).as_str(), "ON");
    }
}
