use std::{thread, time::Duration};

use serde::Serialize;

use crate::types::RelaySignal;

/// RF transmitter driver. Sends are fire-and-forget; the driver may drop its
/// armed state between calls, so it is re-armed before every send.
pub trait RfTransmitter {
    fn enable_transmit(&mut self);
    fn send(&mut self, signal: RelaySignal);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelayHistory {
    pub last_on: Option<i64>,
    pub last_off: Option<i64>,
    pub on_since: Option<i64>,
    pub last_on_period_secs: u64,
}

pub struct RelayActuator<T> {
    transmitter: T,
    is_on: bool,
    history: RelayHistory,
    settle: Duration,
}

impl<T: RfTransmitter> RelayActuator<T> {
    pub fn new(transmitter: T, settle: Duration) -> Self {
        Self {
            transmitter,
            is_on: false,
            history: RelayHistory::default(),
            settle,
        }
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    pub fn history(&self) -> &RelayHistory {
        &self.history
    }

    pub fn transmitter(&self) -> &T {
        &self.transmitter
    }

    pub fn current_run_secs(&self, now_epoch: i64) -> u64 {
        match self.history.on_since {
            Some(start) if self.is_on => now_epoch.saturating_sub(start).max(0) as u64,
            _ => 0,
        }
    }

    /// Drives the relay to `desired`. Returns `false` without touching history
    /// or the transmitter when the relay is already there.
    ///
    /// The call blocks for the settle delay after transmitting so the RF burst
    /// completes before anything else is sent.
    pub fn set_relay(&mut self, desired: bool, now_epoch: i64) -> bool {
        if desired == self.is_on {
            return false;
        }

        self.is_on = desired;
        if desired {
            self.history.last_on = Some(now_epoch);
            self.history.on_since = Some(now_epoch);
        } else {
            self.history.last_off = Some(now_epoch);
            if let Some(start) = self.history.on_since.take() {
                self.history.last_on_period_secs = now_epoch.saturating_sub(start).max(0) as u64;
            }
        }

        self.transmitter.enable_transmit();
        self.transmitter.send(RelaySignal::from_state(desired));

        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }

        true
    }
}
