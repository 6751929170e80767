//! Desktop settings persistence.

use thiserror::Error;
use tracing::info;

use crate::models::{DesktopConfig, BACKUP_INTERVAL_OPTIONS, VALIDITY_MONTH_OPTIONS};
use crate::storage::{keys, KeyValueStore, LocalStorage, StorageError};

/// Settings errors.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Invalid option for {field}: {value}")]
    InvalidOption { field: &'static str, value: u32 },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Reads and writes [`DesktopConfig`] in the `sismed-desktop-config` slot.
pub struct SettingsStore<'a, S> {
    storage: &'a mut LocalStorage<S>,
}

impl<'a, S: KeyValueStore> SettingsStore<'a, S> {
    pub fn new(storage: &'a mut LocalStorage<S>) -> Self {
        Self { storage }
    }

    /// Current settings, defaults when nothing valid is stored.
    pub fn load(&self) -> DesktopConfig {
        self.storage.read(keys::DESKTOP_CONFIG, DesktopConfig::default())
    }

    /// Validate and store `config`.
    pub fn save(&mut self, config: &DesktopConfig) -> SettingsResult<()> {
        validate(config)?;
        self.storage.write(keys::DESKTOP_CONFIG, config)?;
        info!("Desktop settings saved");
        Ok(())
    }

    /// Load, apply `f`, save. Returns the saved settings.
    pub fn update<F>(&mut self, f: F) -> SettingsResult<DesktopConfig>
    where
        F: FnOnce(&mut DesktopConfig),
    {
        let mut config = self.load();
        f(&mut config);
        self.save(&config)?;
        Ok(config)
    }
}

/// Check the fields the UI offers as fixed choices.
pub fn validate(config: &DesktopConfig) -> SettingsResult<()> {
    let months = config.prescriptions.validity_months;
    if !VALIDITY_MONTH_OPTIONS.contains(&months) {
        return Err(SettingsError::InvalidOption {
            field: "receitas.validadeMeses",
            value: months,
        });
    }

    let interval = config.backup.backup_interval;
    if !BACKUP_INTERVAL_OPTIONS.contains(&interval) {
        return Err(SettingsError::InvalidOption {
            field: "backup.backupInterval",
            value: interval,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Theme;
    use crate::storage::MemoryStore;

    #[test]
    fn test_load_defaults_when_empty() {
        let mut storage = LocalStorage::new(MemoryStore::new());
        let settings = SettingsStore::new(&mut storage);
        assert_eq!(settings.load(), DesktopConfig::default());
    }

    #[test]
    fn test_update_persists() {
        let mut storage = LocalStorage::new(MemoryStore::new());

        {
            let mut settings = SettingsStore::new(&mut storage);
            let saved = settings
                .update(|c| {
                    c.theme = Theme::Dark;
                    c.institution_name = "UBS Centro".into();
                    c.prescriptions.validity_months = 12;
                })
                .unwrap();
            assert_eq!(saved.theme, Theme::Dark);
        }

        let settings = SettingsStore::new(&mut storage);
        let loaded = settings.load();
        assert_eq!(loaded.institution_name, "UBS Centro");
        assert_eq!(loaded.prescriptions.validity_months, 12);
    }

    #[test]
    fn test_invalid_option_rejected_and_not_saved() {
        let mut storage = LocalStorage::new(MemoryStore::new());
        let mut settings = SettingsStore::new(&mut storage);

        let result = settings.update(|c| c.backup.backup_interval = 5);

        assert!(matches!(
            result,
            Err(SettingsError::InvalidOption { field: "backup.backupInterval", value: 5 })
        ));
        assert_eq!(settings.load().backup.backup_interval, 24);
    }

    #[test]
    fn test_corrupt_config_loads_defaults() {
        let mut store = MemoryStore::new();
        store.set_item(keys::DESKTOP_CONFIG, "[1,2,3]").unwrap();
        let mut storage = LocalStorage::new(store);

        let settings = SettingsStore::new(&mut storage);
        assert_eq!(settings.load(), DesktopConfig::default());
    }
}
