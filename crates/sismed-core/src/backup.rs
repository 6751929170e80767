//! Local backup export and data maintenance.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::DesktopConfig;
use crate::storage::{keys, KeyValueStore, LocalStorage, StorageResult};

/// Version stamped on every backup document.
pub const BACKUP_VERSION: &str = "4.0";

/// Full backup of every collection the desktop application keeps.
///
/// Record collections are exported exactly as stored, so a record this crate
/// cannot decode still reaches the backup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupExport {
    pub patients: Vec<serde_json::Value>,
    pub medications: Vec<serde_json::Value>,
    pub prescriptions: Vec<serde_json::Value>,
    pub config: ExportedConfig,
    /// ISO 8601 UTC timestamp
    pub export_date: String,
    pub version: String,
}

/// Settings as exported: typed when they decode, otherwise the stored JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ExportedConfig {
    Settings(DesktopConfig),
    Stored(serde_json::Value),
}

impl ExportedConfig {
    fn collect<S: KeyValueStore>(storage: &LocalStorage<S>) -> Self {
        match storage.read_strict::<serde_json::Value>(keys::DESKTOP_CONFIG) {
            Ok(Some(raw)) => match serde_json::from_value(raw.clone()) {
                Ok(config) => Self::Settings(config),
                Err(e) => {
                    warn!(error = %e, "Exporting settings as stored");
                    Self::Stored(raw)
                }
            },
            Ok(None) | Err(_) => Self::Settings(DesktopConfig::default()),
        }
    }
}

impl BackupExport {
    /// Snapshot all slots at `now`.
    pub fn collect_at<S: KeyValueStore>(storage: &LocalStorage<S>, now: DateTime<Utc>) -> Self {
        Self {
            patients: storage.read_or_default(keys::PATIENTS),
            medications: storage.read_or_default(keys::MEDICATIONS),
            prescriptions: storage.read_or_default(keys::PRESCRIPTIONS),
            config: ExportedConfig::collect(storage),
            export_date: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            version: BACKUP_VERSION.to_string(),
        }
    }

    /// Snapshot all slots now.
    pub fn collect<S: KeyValueStore>(storage: &LocalStorage<S>) -> Self {
        Self::collect_at(storage, Utc::now())
    }

    /// Export to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Download name, `sismed-backup-YYYY-MM-DD.json`.
    pub fn file_name(&self) -> String {
        let day = self.export_date.get(..10).unwrap_or("unknown");
        format!("sismed-backup-{}.json", day)
    }
}

/// Record counts shown on the dashboard and the settings page.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct SystemSummary {
    pub patients: usize,
    pub medications: usize,
    pub prescriptions: usize,
}

impl SystemSummary {
    pub fn collect<S: KeyValueStore>(storage: &LocalStorage<S>) -> Self {
        let count = |key: &str| storage.read_or_default::<Vec<serde_json::Value>>(key).len();
        Self {
            patients: count(keys::PATIENTS),
            medications: count(keys::MEDICATIONS),
            prescriptions: count(keys::PRESCRIPTIONS),
        }
    }
}

/// Remove every stored slot, settings included.
pub fn clear_all_data<S: KeyValueStore>(storage: &mut LocalStorage<S>) -> StorageResult<()> {
    let slots = storage.keys()?;
    warn!(count = slots.len(), ?slots, "Clearing all stored data");
    storage.clear()?;
    info!("All stored data removed");
    Ok(())
}
