use serde::{Deserialize, Serialize};

use crate::window::OperatingWindow;

pub const SENSOR_MIN_C: f32 = -55.0;
pub const SENSOR_MAX_C: f32 = 125.0;
/// Hysteresis must lie in the open interval (0, DELTA_MAX_C).
pub const DELTA_MAX_C: f32 = 10.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub sample_interval_ms: u64,
    pub publish_interval_ms: u64,
    pub reconnect_interval_ms: u64,
    pub time_resync_interval_ms: u64,
    pub settle_ms: u64,
    pub max_payload_bytes: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 2_000,
            publish_interval_ms: 30_000,
            reconnect_interval_ms: 5_000,
            time_resync_interval_ms: 3_600_000,
            settle_ms: 500,
            max_payload_bytes: 512,
        }
    }
}

impl ControllerConfig {
    pub fn sanitize(&mut self) {
        self.sample_interval_ms = self.sample_interval_ms.clamp(250, 60_000);
        self.publish_interval_ms = self.publish_interval_ms.clamp(1_000, 3_600_000);
        self.reconnect_interval_ms = self.reconnect_interval_ms.clamp(500, 300_000);
        self.time_resync_interval_ms = self.time_resync_interval_ms.max(60_000);
        self.settle_ms = self.settle_ms.min(5_000);
        self.max_payload_bytes = self.max_payload_bytes.clamp(64, 4_096);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
    pub client_id: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mqtt_host: "192.168.1.100".to_string(),
            mqtt_port: 1883,
            mqtt_user: String::new(),
            mqtt_pass: String::new(),
            client_id: "thermorelay".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RfHardwareConfig {
    pub tx_pin: i32,
    pub protocol: u8,
    pub pulse_length_us: u16,
    pub repeat: u8,
    pub code_bits: u8,
    pub on_code: u32,
    pub off_code: u32,
}

impl Default for RfHardwareConfig {
    fn default() -> Self {
        Self {
            tx_pin: 10,
            protocol: 1,
            pulse_length_us: 350,
            repeat: 10,
            code_bits: 24,
            on_code: 0x055155,
            off_code: 0x055154,
        }
    }
}

impl RfHardwareConfig {
    pub fn sanitize(&mut self) {
        if self.tx_pin < 0 {
            self.tx_pin = 10;
        }

        if !(1..=6).contains(&self.protocol) {
            self.protocol = 1;
        }

        self.pulse_length_us = self.pulse_length_us.clamp(100, 1_000);
        self.repeat = self.repeat.clamp(1, 20);
        self.code_bits = self.code_bits.clamp(1, 32);
    }

    pub fn code_for(&self, on: bool) -> u32 {
        if on {
            self.on_code
        } else {
            self.off_code
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub initial_temp_c: f32,
    pub ambient_temp_c: f32,
    pub heating_rate_c_per_min: f32,
    pub cooling_time_constant_s: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_temp_c: 18.0,
            ambient_temp_c: 12.0,
            heating_rate_c_per_min: 0.5,
            cooling_time_constant_s: 3_600.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub controller: ControllerConfig,
    pub network: NetworkConfig,
    pub rf: RfHardwareConfig,
    pub timezone: String,
    pub simulation: SimulationConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            network: NetworkConfig::default(),
            rf: RfHardwareConfig::default(),
            timezone: "Europe/Berlin".to_string(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn sanitize(&mut self) {
        self.controller.sanitize();
        self.rf.sanitize();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub target_temp: f32,
    pub delta_temp: f32,
    pub frost_protection_temp: f32,
    pub start_hour: u8,
    pub start_min: u8,
    pub end_hour: u8,
    pub end_min: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_temp: 21.0,
            delta_temp: 0.5,
            frost_protection_temp: 5.0,
            start_hour: 6,
            start_min: 0,
            end_hour: 22,
            end_min: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingField {
    TargetTemp,
    DeltaTemp,
    FrostProtectionTemp,
    StartHour,
    StartMin,
    EndHour,
    EndMin,
}

impl SettingField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TargetTemp => "target_temp",
            Self::DeltaTemp => "delta_temp",
            Self::FrostProtectionTemp => "frost_protection_temp",
            Self::StartHour => "start_hour",
            Self::StartMin => "start_min",
            Self::EndHour => "end_hour",
            Self::EndMin => "end_min",
        }
    }
}

/// A single incoming field value, not yet validated. Clock fields arrive as
/// plain JSON numbers; only whole values are accepted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingUpdate {
    TargetTemp(f32),
    DeltaTemp(f32),
    FrostProtectionTemp(f32),
    StartHour(f64),
    StartMin(f64),
    EndHour(f64),
    EndMin(f64),
}

impl SettingUpdate {
    pub fn field(self) -> SettingField {
        match self {
            Self::TargetTemp(_) => SettingField::TargetTemp,
            Self::DeltaTemp(_) => SettingField::DeltaTemp,
            Self::FrostProtectionTemp(_) => SettingField::FrostProtectionTemp,
            Self::StartHour(_) => SettingField::StartHour,
            Self::StartMin(_) => SettingField::StartMin,
            Self::EndHour(_) => SettingField::EndHour,
            Self::EndMin(_) => SettingField::EndMin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Changed,
    Unchanged,
    Rejected,
}

pub fn valid_target_temp(value: f32) -> bool {
    value.is_finite() && value > SENSOR_MIN_C && value < SENSOR_MAX_C
}

pub fn valid_delta_temp(value: f32) -> bool {
    value.is_finite() && value > 0.0 && value < DELTA_MAX_C
}

pub fn valid_frost_temp(value: f32) -> bool {
    value.is_finite() && (SENSOR_MIN_C..=SENSOR_MAX_C).contains(&value)
}

impl Settings {
    pub fn window(&self) -> OperatingWindow {
        OperatingWindow {
            start_hour: self.start_hour,
            start_min: self.start_min,
            end_hour: self.end_hour,
            end_min: self.end_min,
        }
    }

    pub fn apply(&mut self, update: SettingUpdate) -> UpdateOutcome {
        match update {
            SettingUpdate::TargetTemp(value) => {
                update_temp(&mut self.target_temp, value, valid_target_temp(value))
            }
            SettingUpdate::DeltaTemp(value) => {
                update_temp(&mut self.delta_temp, value, valid_delta_temp(value))
            }
            SettingUpdate::FrostProtectionTemp(value) => update_temp(
                &mut self.frost_protection_temp,
                value,
                valid_frost_temp(value),
            ),
            SettingUpdate::StartHour(value) => update_clock(&mut self.start_hour, value, 23),
            SettingUpdate::StartMin(value) => update_clock(&mut self.start_min, value, 59),
            SettingUpdate::EndHour(value) => update_clock(&mut self.end_hour, value, 23),
            SettingUpdate::EndMin(value) => update_clock(&mut self.end_min, value, 59),
        }
    }

    /// Builds settings from stored field values, replacing each out-of-range
    /// field with its default independently of the others.
    pub fn repair(stored: impl IntoIterator<Item = SettingUpdate>) -> (Self, Vec<SettingField>) {
        let mut settings = Self::default();
        let mut repaired = Vec::new();
        for update in stored {
            if settings.apply(update) == UpdateOutcome::Rejected {
                repaired.push(update.field());
            }
        }
        (settings, repaired)
    }
}

fn update_temp(slot: &mut f32, value: f32, valid: bool) -> UpdateOutcome {
    if !valid {
        return UpdateOutcome::Rejected;
    }
    if (*slot - value).abs() > f32::EPSILON {
        *slot = value;
        UpdateOutcome::Changed
    } else {
        UpdateOutcome::Unchanged
    }
}

fn update_clock(slot: &mut u8, value: f64, max: u8) -> UpdateOutcome {
    if !value.is_finite() || value.fract() != 0.0 || !(0.0..=f64::from(max)).contains(&value) {
        return UpdateOutcome::Rejected;
    }
    let value = value as u8;
    if *slot != value {
        *slot = value;
        UpdateOutcome::Changed
    } else {
        UpdateOutcome::Unchanged
    }
}
