pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod link;
pub mod policy;
pub mod record;
pub mod relay;
pub mod sensor;
pub mod topics;
pub mod types;
pub mod window;

pub use command::{Command, RemoteCommand};
pub use config::{RuntimeConfig, SettingField, SettingUpdate, Settings};
pub use controller::{BatchOutcome, Controller, Effect, TickOutcome, TickStatus};
pub use error::{CommandError, StoreError};
pub use link::{Connectivity, LinkAction, LinkState};
pub use policy::{decide, desired_relay_state, Decision};
pub use record::{ConfigStore, LoadedSettings, RecordStore};
pub use relay::{RelayActuator, RelayHistory, RfTransmitter};
pub use sensor::{LiveReading, TemperatureSensor};
pub use topics::*;
pub use types::{ControlMode, RelaySignal, StatePayload, StatusView};
pub use window::{is_operating_time, OperatingWindow, TimeOfDay, WallTime};
