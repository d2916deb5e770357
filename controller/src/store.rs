use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Context;
use thermorelay_common::{
    record::{RecordStore, RECORD_LEN, STORAGE_BUDGET},
    RuntimeConfig, StoreError,
};

#[derive(Debug, Clone)]
pub struct AppStore {
    runtime_path: PathBuf,
    settings_path: PathBuf,
}

impl AppStore {
    pub fn new() -> Self {
        let data_dir = std::env::var("THERMORELAY_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.thermorelay"));
        Self::in_dir(&data_dir)
    }

    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            runtime_path: data_dir.join("runtime.json"),
            settings_path: data_dir.join("settings.bin"),
        }
    }

    pub async fn load_runtime_config(&self) -> anyhow::Result<RuntimeConfig> {
        match tokio::fs::read(&self.runtime_path).await {
            Ok(raw) => serde_json::from_slice::<RuntimeConfig>(&raw)
                .with_context(|| format!("invalid {}", self.runtime_path.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn settings_store(&self) -> FileRecordStore {
        FileRecordStore::new(self.settings_path.clone())
    }
}

/// Settings record kept in a single file, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    path: PathBuf,
}

impl FileRecordStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl RecordStore for FileRecordStore {
    fn get(&mut self) -> Result<Option<Vec<u8>>, StoreError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        if raw.len() > STORAGE_BUDGET {
            return Err(StoreError::OverBudget {
                len: raw.len(),
                budget: STORAGE_BUDGET,
            });
        }
        Ok(Some(raw))
    }

    fn put(&mut self, record: &[u8; RECORD_LEN]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let staging = self.path.with_extension("bin.tmp");
        std::fs::write(&staging, record)?;
        std::fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use thermorelay_common::{ConfigStore, Settings};

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "thermorelay-store-{}-{name}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = scratch_dir("missing");
        let mut store = AppStore::in_dir(&dir).settings_store();

        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn settings_survive_a_restart() {
        let dir = scratch_dir("restart");
        let settings = Settings {
            target_temp: 18.5,
            start_hour: 7,
            ..Settings::default()
        };

        let mut first = ConfigStore::new(AppStore::in_dir(&dir).settings_store());
        first.persist(&settings).unwrap();

        let mut second = ConfigStore::new(AppStore::in_dir(&dir).settings_store());
        let loaded = second.load().unwrap();

        assert!(loaded.found);
        assert_eq!(loaded.settings, settings);
        assert_eq!(
            std::fs::metadata(dir.join("settings.bin")).unwrap().len(),
            RECORD_LEN as u64
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn oversized_file_is_rejected() {
        let dir = scratch_dir("oversized");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("settings.bin"), vec![0_u8; STORAGE_BUDGET + 1]).unwrap();

        let mut store = AppStore::in_dir(&dir).settings_store();

        assert!(matches!(
            store.get(),
            Err(StoreError::OverBudget { len: 65, budget: 64 })
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn runtime_config_defaults_when_absent() {
        let dir = scratch_dir("runtime-absent");

        let runtime = AppStore::in_dir(&dir).load_runtime_config().await.unwrap();

        assert_eq!(runtime.timezone, "Europe/Berlin");
        assert_eq!(runtime.controller.sample_interval_ms, 2_000);
    }

    #[tokio::test]
    async fn runtime_config_keeps_defaults_for_missing_sections() {
        let dir = scratch_dir("runtime-partial");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("runtime.json"),
            br#"{"network":{"mqtt_host":"broker.local"},"timezone":"Europe/Vienna"}"#,
        )
        .unwrap();

        let runtime = AppStore::in_dir(&dir).load_runtime_config().await.unwrap();

        assert_eq!(runtime.network.mqtt_host, "broker.local");
        assert_eq!(runtime.network.mqtt_port, 1883);
        assert_eq!(runtime.timezone, "Europe/Vienna");
        assert_eq!(runtime.controller.publish_interval_ms, 30_000);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
