use serde::Deserialize;

use crate::{
    config::SettingUpdate,
    error::CommandError,
    types::{ControlMode, RelaySignal},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    SetMode(ControlMode),
    ToggleMode,
    SetRelay(RelaySignal),
    ToggleRelay,
    Setting(SettingUpdate),
}

impl Command {
    /// Application order inside one batch: mode first, then relay, then
    /// settings, so `{"mode":"MANUAL","state":"ON"}` switches the relay.
    pub fn rank(&self) -> u8 {
        match self {
            Self::SetMode(_) | Self::ToggleMode => 0,
            Self::SetRelay(_) | Self::ToggleRelay => 1,
            Self::Setting(_) => 2,
        }
    }
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct RemoteCommand {
    pub mode: Option<String>,
    pub state: Option<String>,
    pub target_temp: Option<f32>,
    pub delta_temp: Option<f32>,
    pub frost_protection_temp: Option<f32>,
    /// Short form of `frost_protection_temp`; the long key wins when both are sent.
    pub frost_protection: Option<f32>,
    pub start_hour: Option<f64>,
    pub start_min: Option<f64>,
    pub end_hour: Option<f64>,
    pub end_min: Option<f64>,
}

impl RemoteCommand {
    pub fn parse(payload: &[u8], max_bytes: usize) -> Result<Self, CommandError> {
        if payload.len() > max_bytes {
            return Err(CommandError::Oversized {
                len: payload.len(),
                max: max_bytes,
            });
        }
        Ok(serde_json::from_slice(payload)?)
    }

    pub fn into_commands(self) -> Vec<Command> {
        let mut commands = Vec::new();

        if let Some(mode) = self.mode.as_deref().and_then(ControlMode::parse) {
            commands.push(Command::SetMode(mode));
        }
        if let Some(signal) = self.state.as_deref().and_then(RelaySignal::parse) {
            commands.push(Command::SetRelay(signal));
        }

        let updates = [
            self.target_temp.map(SettingUpdate::TargetTemp),
            self.delta_temp.map(SettingUpdate::DeltaTemp),
            self.frost_protection_temp
                .or(self.frost_protection)
                .map(SettingUpdate::FrostProtectionTemp),
            self.start_hour.map(SettingUpdate::StartHour),
            self.start_min.map(SettingUpdate::StartMin),
            self.end_hour.map(SettingUpdate::EndHour),
            self.end_min.map(SettingUpdate::EndMin),
        ];
        commands.extend(updates.into_iter().flatten().map(Command::Setting));

        commands
    }
}
