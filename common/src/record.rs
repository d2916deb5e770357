//! Positional binary layout of the persisted settings.
//!
//! Fields are written back to back in little-endian order:
//! `target_temp: f32`, `delta_temp: f32`, `frost_protection_temp: f32`,
//! `start_hour: i32`, `start_min: i32`, `end_hour: i32`, `end_min: i32`.
//! There is no version tag, so reordering or resizing a field invalidates
//! every record already written.

use crate::{
    config::{SettingField, SettingUpdate, Settings},
    error::StoreError,
};

pub const RECORD_LEN: usize = 28;
/// Bytes reserved for the record in device storage.
pub const STORAGE_BUDGET: usize = 64;

const _: () = assert!(RECORD_LEN <= STORAGE_BUDGET);

pub trait RecordStore {
    fn get(&mut self) -> Result<Option<Vec<u8>>, StoreError>;
    fn put(&mut self, record: &[u8; RECORD_LEN]) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoredSettings {
    pub target_temp: f32,
    pub delta_temp: f32,
    pub frost_protection_temp: f32,
    pub start_hour: i32,
    pub start_min: i32,
    pub end_hour: i32,
    pub end_min: i32,
}

impl StoredSettings {
    pub fn updates(&self) -> [SettingUpdate; 7] {
        [
            SettingUpdate::TargetTemp(self.target_temp),
            SettingUpdate::DeltaTemp(self.delta_temp),
            SettingUpdate::FrostProtectionTemp(self.frost_protection_temp),
            SettingUpdate::StartHour(self.start_hour.into()),
            SettingUpdate::StartMin(self.start_min.into()),
            SettingUpdate::EndHour(self.end_hour.into()),
            SettingUpdate::EndMin(self.end_min.into()),
        ]
    }
}

pub fn encode(settings: &Settings) -> [u8; RECORD_LEN] {
    let mut record = [0_u8; RECORD_LEN];
    let fields: [[u8; 4]; 7] = [
        settings.target_temp.to_le_bytes(),
        settings.delta_temp.to_le_bytes(),
        settings.frost_protection_temp.to_le_bytes(),
        i32::from(settings.start_hour).to_le_bytes(),
        i32::from(settings.start_min).to_le_bytes(),
        i32::from(settings.end_hour).to_le_bytes(),
        i32::from(settings.end_min).to_le_bytes(),
    ];
    for (chunk, field) in record.chunks_exact_mut(4).zip(fields) {
        chunk.copy_from_slice(&field);
    }
    record
}

/// Reads the leading `RECORD_LEN` bytes; anything after them is ignored.
pub fn decode(bytes: &[u8]) -> Result<StoredSettings, StoreError> {
    if bytes.len() < RECORD_LEN {
        return Err(StoreError::Truncated {
            len: bytes.len(),
            expected: RECORD_LEN,
        });
    }

    let word = |index: usize| -> [u8; 4] {
        let mut word = [0_u8; 4];
        word.copy_from_slice(&bytes[index * 4..index * 4 + 4]);
        word
    };

    Ok(StoredSettings {
        target_temp: f32::from_le_bytes(word(0)),
        delta_temp: f32::from_le_bytes(word(1)),
        frost_protection_temp: f32::from_le_bytes(word(2)),
        start_hour: i32::from_le_bytes(word(3)),
        start_min: i32::from_le_bytes(word(4)),
        end_hour: i32::from_le_bytes(word(5)),
        end_min: i32::from_le_bytes(word(6)),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSettings {
    pub settings: Settings,
    pub repaired: Vec<SettingField>,
    pub found: bool,
}

pub struct ConfigStore<S> {
    backend: S,
    writes: u64,
}

impl<S: RecordStore> ConfigStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend, writes: 0 }
    }

    pub fn load(&mut self) -> Result<LoadedSettings, StoreError> {
        let Some(bytes) = self.backend.get()? else {
            return Ok(LoadedSettings {
                settings: Settings::default(),
                repaired: Vec::new(),
                found: false,
            });
        };

        let stored = decode(&bytes)?;
        let (settings, repaired) = Settings::repair(stored.updates());
        Ok(LoadedSettings {
            settings,
            repaired,
            found: true,
        })
    }

    pub fn persist(&mut self, settings: &Settings) -> Result<(), StoreError> {
        self.backend.put(&encode(settings))?;
        self.writes += 1;
        Ok(())
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }
}
