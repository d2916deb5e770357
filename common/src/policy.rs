//! Relay policy. [`desired_relay_state`] is the entry point: given the
//! temperature, local time, settings, current relay state and mode it returns
//! whether the relay should be on. [`decide`] is the same rule before the
//! current relay state is folded in.

use crate::{config::Settings, types::ControlMode, window::TimeOfDay};

/// Outcome of one policy evaluation. `Hold` keeps whatever state the relay is
/// already in, which is what stops chatter inside the dead band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    ForceOn,
    ForceOff,
    Hold,
}

impl Decision {
    pub fn resolve(self, relay_on: bool) -> bool {
        match self {
            Self::ForceOn => true,
            Self::ForceOff => false,
            Self::Hold => relay_on,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ForceOn => "FORCE_ON",
            Self::ForceOff => "FORCE_OFF",
            Self::Hold => "HOLD",
        }
    }
}

/// Frost protection wins over everything else and ignores the operating
/// window. Inside the window the relay switches on at `target - delta` and off
/// at `target + delta`, both bounds inclusive. Outside the window the relay is
/// switched off. Under [`ControlMode::Manual`] the policy never forces anything.
pub fn decide(
    current_temp: f32,
    now: TimeOfDay,
    settings: &Settings,
    mode: ControlMode,
) -> Decision {
    if mode == ControlMode::Manual {
        return Decision::Hold;
    }

    if current_temp <= settings.frost_protection_temp {
        return Decision::ForceOn;
    }

    if !settings.window().contains(now) {
        return Decision::ForceOff;
    }

    if current_temp <= settings.target_temp - settings.delta_temp {
        Decision::ForceOn
    } else if current_temp >= settings.target_temp + settings.delta_temp {
        Decision::ForceOff
    } else {
        Decision::Hold
    }
}

pub fn desired_relay_state(
    current_temp: f32,
    now: TimeOfDay,
    settings: &Settings,
    relay_on: bool,
    mode: ControlMode,
) -> bool {
    decide(current_temp, now, settings, mode).resolve(relay_on)
}
