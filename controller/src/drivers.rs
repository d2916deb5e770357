//! Host stand-ins for the DS18B20 probe and the 433 MHz transmitter.
//!
//! Both share a heater flag: the transmitter sets it when it sends ON, and the
//! simulated room warms up while it is set.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use thermorelay_common::{
    config::{RfHardwareConfig, SimulationConfig},
    RelaySignal, RfTransmitter, TemperatureSensor,
};
use tracing::{debug, info, warn};

/// DS18B20 resolution at 12 bits.
const PROBE_STEP_C: f32 = 0.0625;

pub struct SimulatedRoom {
    temp_c: f32,
    ambient_c: f32,
    heating_c_per_s: f32,
    cooling_time_constant_s: f32,
    heater: Arc<AtomicBool>,
    last_read: Option<Instant>,
}

impl SimulatedRoom {
    pub fn new(config: &SimulationConfig, heater: Arc<AtomicBool>) -> Self {
        Self {
            temp_c: config.initial_temp_c,
            ambient_c: config.ambient_temp_c,
            heating_c_per_s: config.heating_rate_c_per_min / 60.0,
            cooling_time_constant_s: config.cooling_time_constant_s.max(1.0),
            heater,
            last_read: None,
        }
    }

    pub fn temp_c(&self) -> f32 {
        self.temp_c
    }

    pub fn step(&mut self, elapsed: Duration) {
        let secs = elapsed.as_secs_f32();
        if self.heater.load(Ordering::Relaxed) {
            self.temp_c += self.heating_c_per_s * secs;
        } else {
            let decay = (-secs / self.cooling_time_constant_s).exp();
            self.temp_c = self.ambient_c + (self.temp_c - self.ambient_c) * decay;
        }
    }
}

impl TemperatureSensor for SimulatedRoom {
    fn read_celsius(&mut self) -> Option<f32> {
        let now = Instant::now();
        if let Some(last) = self.last_read {
            self.step(now.duration_since(last));
        }
        self.last_read = Some(now);

        let reading = (self.temp_c() / PROBE_STEP_C).round() * PROBE_STEP_C;
        debug!("[sim] room temperature {reading:.2}°C");
        Some(reading)
    }
}

pub struct LoggingTransmitter {
    rf: RfHardwareConfig,
    heater: Arc<AtomicBool>,
    armed: bool,
    arm_count: u64,
    sent_frames: u64,
}

impl LoggingTransmitter {
    pub fn new(rf: RfHardwareConfig, heater: Arc<AtomicBool>) -> Self {
        info!(
            "RF transmitter on GPIO{} (protocol {}, pulse {}us, repeat {})",
            rf.tx_pin, rf.protocol, rf.pulse_length_us, rf.repeat
        );
        Self {
            rf,
            heater,
            armed: false,
            arm_count: 0,
            sent_frames: 0,
        }
    }

    pub fn sent_frames(&self) -> u64 {
        self.sent_frames
    }

    pub fn arm_count(&self) -> u64 {
        self.arm_count
    }
}

impl RfTransmitter for LoggingTransmitter {
    fn enable_transmit(&mut self) {
        self.armed = true;
        self.arm_count = self.arm_count.saturating_add(1);
    }

    fn send(&mut self, signal: RelaySignal) {
        if !self.armed {
            warn!("RF send without enable_transmit, arming now");
            self.enable_transmit();
        }

        let code = self.rf.code_for(signal.is_on());
        info!(
            "RF send {} code={:#08x}/{} bits x{}",
            signal.as_str(),
            code,
            self.rf.code_bits,
            self.rf.repeat
        );

        self.heater.store(signal.is_on(), Ordering::Relaxed);
        self.sent_frames = self.sent_frames.saturating_add(u64::from(self.rf.repeat));
        self.armed = false;
    }
}
