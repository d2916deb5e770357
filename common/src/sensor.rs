use crate::config::{SENSOR_MAX_C, SENSOR_MIN_C};

/// Value a DS18B20 driver reports when the probe is missing.
pub const DISCONNECTED_C: f32 = -127.0;

pub trait TemperatureSensor {
    fn read_celsius(&mut self) -> Option<f32>;
}

pub fn plausible(reading: Option<f32>) -> Option<f32> {
    reading.filter(|celsius| {
        celsius.is_finite()
            && *celsius != DISCONNECTED_C
            && (SENSOR_MIN_C..=SENSOR_MAX_C).contains(celsius)
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveReading {
    pub celsius: f32,
    pub sampled_at_ms: u64,
}

impl LiveReading {
    pub fn is_fresh(&self, now_ms: u64, window_ms: u64) -> bool {
        now_ms.saturating_sub(self.sampled_at_ms) <= window_ms
    }
}
