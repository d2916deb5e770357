use crate::{
    command::Command,
    config::{SettingField, Settings, UpdateOutcome},
    link::Connectivity,
    policy::{decide, Decision},
    relay::{RelayActuator, RfTransmitter},
    sensor::{plausible, LiveReading},
    types::{ControlMode, RelaySignal, StatePayload, StatusView},
    window::WallTime,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    PersistSettings,
    PublishState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    Manual,
    NoReading,
    Evaluated(Decision),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub status: TickStatus,
    pub relay_changed: bool,
}

impl TickOutcome {
    pub fn effects(&self) -> Vec<Effect> {
        if self.relay_changed {
            vec![Effect::PublishState]
        } else {
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub mode_accepted: bool,
    pub mode_changed: bool,
    pub relay_changed: bool,
    pub relay_ignored: usize,
    pub settings_changed: bool,
    pub rejected: Vec<SettingField>,
}

impl BatchOutcome {
    /// At most one write and one publish per batch, however many fields it
    /// touched.
    pub fn effects(&self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.settings_changed {
            effects.push(Effect::PersistSettings);
        }
        if self.mode_accepted || self.relay_changed || self.settings_changed {
            effects.push(Effect::PublishState);
        }
        effects
    }
}

/// Owns configuration, relay, mode and the live reading. Every mutation goes
/// through [`Controller::tick`] or [`Controller::apply`].
pub struct Controller<T> {
    settings: Settings,
    relay: RelayActuator<T>,
    mode: ControlMode,
    reading: Option<LiveReading>,
    stale_after_ms: u64,
}

impl<T: RfTransmitter> Controller<T> {
    pub fn new(settings: Settings, relay: RelayActuator<T>, stale_after_ms: u64) -> Self {
        Self {
            settings,
            relay,
            mode: ControlMode::Auto,
            reading: None,
            stale_after_ms,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn relay(&self) -> &RelayActuator<T> {
        &self.relay
    }

    pub fn reading(&self) -> Option<LiveReading> {
        self.reading
    }

    pub fn is_sensor_data_valid(&self, now_ms: u64) -> bool {
        self.reading
            .map(|reading| reading.is_fresh(now_ms, self.stale_after_ms))
            .unwrap_or(false)
    }

    /// One scheduler cycle: store the fresh sample, then run the policy on it.
    /// A missing sample keeps the previous reading, which goes stale, and
    /// leaves the relay alone.
    pub fn tick(&mut self, sample: Option<f32>, now: WallTime, now_ms: u64) -> TickOutcome {
        let sample = plausible(sample);
        if let Some(celsius) = sample {
            self.reading = Some(LiveReading {
                celsius,
                sampled_at_ms: now_ms,
            });
        }

        if self.mode == ControlMode::Manual {
            return TickOutcome {
                status: TickStatus::Manual,
                relay_changed: false,
            };
        }

        let Some(celsius) = sample else {
            return TickOutcome {
                status: TickStatus::NoReading,
                relay_changed: false,
            };
        };

        let decision = decide(celsius, now.time, &self.settings, self.mode);
        let desired = decision.resolve(self.relay.is_on());
        let relay_changed = self.relay.set_relay(desired, now.epoch);

        TickOutcome {
            status: TickStatus::Evaluated(decision),
            relay_changed,
        }
    }

    pub fn apply(&mut self, commands: &[Command], now: WallTime) -> BatchOutcome {
        let mut ordered: Vec<&Command> = commands.iter().collect();
        ordered.sort_by_key(|command| command.rank());

        let mut outcome = BatchOutcome::default();
        for command in ordered {
            match *command {
                Command::SetMode(mode) => {
                    outcome.mode_accepted = true;
                    if self.mode != mode {
                        self.mode = mode;
                        outcome.mode_changed = true;
                    }
                }
                Command::ToggleMode => {
                    self.mode = self.mode.toggled();
                    outcome.mode_accepted = true;
                    outcome.mode_changed = true;
                }
                Command::SetRelay(signal) => {
                    self.manual_relay(signal.is_on(), now, &mut outcome);
                }
                Command::ToggleRelay => {
                    let desired = !self.relay.is_on();
                    self.manual_relay(desired, now, &mut outcome);
                }
                Command::Setting(update) => match self.settings.apply(update) {
                    UpdateOutcome::Changed => outcome.settings_changed = true,
                    UpdateOutcome::Unchanged => {}
                    UpdateOutcome::Rejected => outcome.rejected.push(update.field()),
                },
            }
        }

        outcome
    }

    pub fn state_payload(&self) -> StatePayload {
        StatePayload {
            state: RelaySignal::from_state(self.relay.is_on()).as_str(),
            mode: self.mode.as_str(),
            target_temp: self.settings.target_temp,
            current_temp: self.reading.map(|reading| reading.celsius),
            delta_temp: self.settings.delta_temp,
            start_hour: self.settings.start_hour,
            start_min: self.settings.start_min,
            end_hour: self.settings.end_hour,
            end_min: self.settings.end_min,
            frost_protection_temp: self.settings.frost_protection_temp,
        }
    }

    pub fn temperature_payload(&self) -> Option<String> {
        self.reading
            .map(|reading| format!("{:.2}", reading.celsius))
    }

    pub fn status(
        &self,
        now: WallTime,
        now_ms: u64,
        link: &Connectivity,
        timezone: &str,
    ) -> StatusView {
        let history = self.relay.history();
        let window = self.settings.window();
        StatusView {
            state: RelaySignal::from_state(self.relay.is_on()).as_str(),
            relay_on: self.relay.is_on(),
            mode: self.mode.as_str(),
            current_temp: self.reading.map(|reading| reading.celsius),
            sensor_valid: self.is_sensor_data_valid(now_ms),
            settings: self.settings,
            window_active: window.contains(now.time),
            window_wraps_midnight: window.wraps_midnight(),
            last_on_epoch: history.last_on,
            last_off_epoch: history.last_off,
            last_on_period_secs: history.last_on_period_secs,
            current_run_secs: self.relay.current_run_secs(now.epoch),
            mqtt_connected: link.is_connected(),
            reconnects: link.reconnects(),
            now_epoch: now.epoch,
            utc_offset_secs: now.utc_offset_secs,
            timezone: timezone.to_string(),
        }
    }

    fn manual_relay(&mut self, desired: bool, now: WallTime, outcome: &mut BatchOutcome) {
        if self.mode != ControlMode::Manual {
            outcome.relay_ignored += 1;
            return;
        }
        if self.relay.set_relay(desired, now.epoch) {
            outcome.relay_changed = true;
        }
    }
}
