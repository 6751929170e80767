//! SISMED Core Library
//!
//! Local-first record keeping for a single clinic: patient registry with CNS
//! validation, desktop settings and local backup, exported to the desktop
//! shell through UniFFI.
//!
//! # Architecture
//!
//! ```text
//!   Desktop shell (WebView)
//!            │
//!            ▼
//!   ┌─────────────────────┐
//!   │  SismedCore (FFI)   │
//!   └─────────┬───────────┘
//!             │
//!   listing ──┤── settings ── backup
//!             ▼
//!   PatientRepository ──► cns (pure)
//!             │
//!             ▼
//!   LocalStorage<S: KeyValueStore>
//!             │
//!      ┌──────┴──────┐
//!   SqliteStore   MemoryStore
//! ```
//!
//! # Modules
//!
//! - [`storage`]: key-value port, typed JSON adapter, SQLite and in-memory stores
//! - [`cns`]: CNS checksum validation and display formatting
//! - [`models`]: domain types (Patient, DesktopConfig)
//! - [`repository`]: patient CRUD with validation and uniqueness
//! - [`listing`]: search, pagination, age and form state for the patient list
//! - [`settings`]: desktop settings persistence
//! - [`backup`]: backup export, counts and data wipe
//! - [`config`], [`logging`]: process configuration and tracing setup

pub mod backup;
pub mod cns;
pub mod config;
pub mod listing;
pub mod logging;
pub mod models;
pub mod repository;
pub mod settings;
pub mod storage;

// Re-export commonly used types
pub use backup::{BackupExport, ExportedConfig, SystemSummary};
pub use config::AppConfig;
pub use listing::{PatientListView, PatientPage, PAGE_SIZE};
pub use models::{DesktopConfig, Patient, PatientFields};
pub use repository::{PatientError, PatientRepository, ValidationError};
pub use settings::SettingsStore;
pub use storage::{KeyValueStore, LocalStorage, MemoryStore, SqliteStore};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use tracing::info;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum SismedError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<storage::StorageError> for SismedError {
    fn from(e: storage::StorageError) -> Self {
        SismedError::StorageError(e.to_string())
    }
}

impl From<PatientError> for SismedError {
    fn from(e: PatientError) -> Self {
        match e {
            PatientError::Validation(_) => SismedError::ValidationError(e.user_message()),
            PatientError::NotFound(id) => SismedError::NotFound(id),
            PatientError::Storage(inner) => inner.into(),
        }
    }
}

impl From<settings::SettingsError> for SismedError {
    fn from(e: settings::SettingsError) -> Self {
        match e {
            settings::SettingsError::InvalidOption { .. } => {
                SismedError::InvalidInput(e.to_string())
            }
            settings::SettingsError::Storage(inner) => inner.into(),
        }
    }
}

impl From<config::ConfigError> for SismedError {
    fn from(e: config::ConfigError) -> Self {
        SismedError::ConfigError(e.to_string())
    }
}

impl From<serde_json::Error> for SismedError {
    fn from(e: serde_json::Error) -> Self {
        SismedError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for SismedError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        SismedError::StorageError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a store at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<SismedCore>, SismedError> {
    let store = SqliteStore::open(&path)?;
    Ok(SismedCore::with_store(store))
}

/// Create an in-memory store (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<SismedCore>, SismedError> {
    let store = SqliteStore::open_in_memory()?;
    Ok(SismedCore::with_store(store))
}

/// Load configuration, install logging, and open the configured store.
#[uniffi::export]
pub fn open_with_config(config_path: Option<String>) -> Result<Arc<SismedCore>, SismedError> {
    let config = AppConfig::load_from(config_path.map(Into::into))?;
    logging::init_with_filter(&config.logging.filter);

    let path = config.database_path();
    info!("Opening SISMED store at {}", path.display());
    let store = SqliteStore::open(&path)?;
    Ok(SismedCore::with_store(store))
}

/// Install the log subscriber.
#[uniffi::export]
pub fn init_logging(verbose: bool) {
    let verbosity = if verbose {
        logging::Verbosity::Verbose
    } else {
        logging::Verbosity::Normal
    };
    logging::init_logging(verbosity);
}

/// Check a CNS number.
#[uniffi::export]
pub fn is_valid_cns(raw: String) -> bool {
    cns::is_valid(&raw)
}

/// Format a CNS number for display.
#[uniffi::export]
pub fn format_cns(raw: String) -> String {
    cns::format(&raw)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe store wrapper for FFI.
#[derive(uniffi::Object)]
pub struct SismedCore {
    storage: Arc<Mutex<LocalStorage<SqliteStore>>>,
}

impl SismedCore {
    fn with_store(store: SqliteStore) -> Arc<Self> {
        Arc::new(Self {
            storage: Arc::new(Mutex::new(LocalStorage::new(store))),
        })
    }
}

#[uniffi::export]
impl SismedCore {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// All patients in registration order.
    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, SismedError> {
        let mut storage = self.storage.lock()?;
        let repo = PatientRepository::open(&mut *storage);
        Ok(repo.list().iter().map(FfiPatient::from).collect())
    }

    /// Get a patient by id.
    pub fn get_patient(&self, id: String) -> Result<Option<FfiPatient>, SismedError> {
        let mut storage = self.storage.lock()?;
        let repo = PatientRepository::open(&mut *storage);
        Ok(repo.get(&id).map(FfiPatient::from))
    }

    /// Register a new patient.
    pub fn create_patient(&self, input: FfiPatientInput) -> Result<FfiPatient, SismedError> {
        let mut storage = self.storage.lock()?;
        let mut repo = PatientRepository::open(&mut *storage);
        let patient = repo.create(input.into())?;
        Ok(FfiPatient::from(&patient))
    }

    /// Replace a patient's fields.
    pub fn update_patient(
        &self,
        id: String,
        input: FfiPatientInput,
    ) -> Result<FfiPatient, SismedError> {
        let mut storage = self.storage.lock()?;
        let mut repo = PatientRepository::open(&mut *storage);
        let patient = repo.update(&id, input.into())?;
        Ok(FfiPatient::from(&patient))
    }

    /// Delete a patient. Unknown ids are ignored.
    pub fn delete_patient(&self, id: String) -> Result<(), SismedError> {
        let mut storage = self.storage.lock()?;
        let mut repo = PatientRepository::open(&mut *storage);
        repo.delete(&id)?;
        Ok(())
    }

    /// One page of patients matching `term` (page is 1-indexed and clamped).
    pub fn search_patients(&self, term: String, page: u32) -> Result<FfiPatientPage, SismedError> {
        let mut storage = self.storage.lock()?;
        let repo = PatientRepository::open(&mut *storage);

        let mut view = PatientListView::new();
        view.set_search_term(term);
        view.go_to_page(page as usize, repo.list());

        Ok(view.page(repo.list()).into())
    }

    // =========================================================================
    // Settings Operations
    // =========================================================================

    /// Current desktop settings as JSON.
    pub fn load_settings_json(&self) -> Result<String, SismedError> {
        let mut storage = self.storage.lock()?;
        let settings = SettingsStore::new(&mut *storage);
        Ok(serde_json::to_string(&settings.load())?)
    }

    /// Replace the desktop settings from JSON.
    pub fn save_settings_json(&self, json: String) -> Result<(), SismedError> {
        let config: DesktopConfig = serde_json::from_str(&json)?;
        let mut storage = self.storage.lock()?;
        let mut settings = SettingsStore::new(&mut *storage);
        settings.save(&config)?;
        Ok(())
    }

    // =========================================================================
    // Backup Operations
    // =========================================================================

    /// Export every collection as a backup document.
    pub fn export_backup(&self) -> Result<FfiBackup, SismedError> {
        let storage = self.storage.lock()?;
        let export = BackupExport::collect(&*storage);
        Ok(FfiBackup {
            file_name: export.file_name(),
            json: export.to_json()?,
        })
    }

    /// Record counts per collection.
    pub fn system_summary(&self) -> Result<FfiSystemSummary, SismedError> {
        let storage = self.storage.lock()?;
        Ok(SystemSummary::collect(&*storage).into())
    }

    /// Remove all stored data.
    pub fn clear_all_data(&self) -> Result<(), SismedError> {
        let mut storage = self.storage.lock()?;
        backup::clear_all_data(&mut *storage)?;
        Ok(())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: String,
    pub name: String,
    pub birth_date: String,
    pub cns: String,
    pub formatted_cns: String,
    pub phone: String,
    pub address: String,
    /// Age today, `None` when the birth date does not parse
    pub age: Option<i32>,
}

impl From<&Patient> for FfiPatient {
    fn from(patient: &Patient) -> Self {
        Self {
            id: patient.id.clone(),
            name: patient.name.clone(),
            birth_date: patient.birth_date.clone(),
            cns: patient.cns.clone(),
            formatted_cns: patient.formatted_cns(),
            phone: patient.phone.clone(),
            address: patient.address.clone(),
            age: listing::age_today(&patient.birth_date),
        }
    }
}

/// FFI-safe patient form input.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientInput {
    pub name: String,
    pub birth_date: String,
    pub cns: String,
    pub phone: String,
    pub address: String,
}

impl From<FfiPatientInput> for PatientFields {
    fn from(input: FfiPatientInput) -> Self {
        PatientFields {
            name: input.name,
            birth_date: input.birth_date,
            cns: input.cns,
            phone: input.phone,
            address: input.address,
        }
    }
}

/// FFI-safe page of patients.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientPage {
    pub items: Vec<FfiPatient>,
    pub page: u32,
    pub total_pages: u32,
    pub total_count: u32,
    pub first_index: u32,
    pub last_index: u32,
}

impl From<PatientPage> for FfiPatientPage {
    fn from(page: PatientPage) -> Self {
        Self {
            items: page.items.iter().map(FfiPatient::from).collect(),
            page: page.page as u32,
            total_pages: page.total_pages as u32,
            total_count: page.total_count as u32,
            first_index: page.first_index as u32,
            last_index: page.last_index as u32,
        }
    }
}

/// FFI-safe record counts.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSystemSummary {
    pub patients: u32,
    pub medications: u32,
    pub prescriptions: u32,
}

impl From<SystemSummary> for FfiSystemSummary {
    fn from(summary: SystemSummary) -> Self {
        Self {
            patients: summary.patients as u32,
            medications: summary.medications as u32,
            prescriptions: summary.prescriptions as u32,
        }
    }
}

/// FFI-safe backup document.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBackup {
    pub file_name: String,
    pub json: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, cns: &str) -> FfiPatientInput {
        FfiPatientInput {
            name: name.into(),
            birth_date: "2000-06-15".into(),
            cns: cns.into(),
            phone: String::new(),
            address: String::new(),
        }
    }

    #[test]
    fn test_ffi_patient_crud() {
        let core = open_database_in_memory().unwrap();

        let created = core.create_patient(input("ana", "100000000000007")).unwrap();
        assert_eq!(created.name, "ANA");
        assert_eq!(created.formatted_cns, "100 0000 0000 0007");
        assert!(created.age.is_some());

        let updated = core
            .update_patient(created.id.clone(), input("ana maria", "100000000000007"))
            .unwrap();
        assert_eq!(updated.name, "ANA MARIA");

        core.delete_patient(created.id.clone()).unwrap();
        core.delete_patient(created.id).unwrap();
        assert!(core.list_patients().unwrap().is_empty());
    }

    #[test]
    fn test_ffi_validation_errors() {
        let core = open_database_in_memory().unwrap();

        let invalid = core.create_patient(input("ana", "123456789012345"));
        assert!(matches!(invalid, Err(SismedError::ValidationError(_))));

        core.create_patient(input("ana", "100000000000007")).unwrap();
        let duplicate = core.create_patient(input("bia", "100000000000007"));
        assert!(matches!(duplicate, Err(SismedError::ValidationError(_))));

        let missing = core.update_patient("nope".into(), input("x", "700000000000005"));
        assert!(matches!(missing, Err(SismedError::NotFound(_))));
    }

    #[test]
    fn test_ffi_search_page() {
        let core = open_database_in_memory().unwrap();
        core.create_patient(input("ana", "100000000000007")).unwrap();
        core.create_patient(input("bia", "700000000000005")).unwrap();

        let page = core.search_patients("bia".into(), 1).unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].name, "BIA");

        let clamped = core.search_patients(String::new(), 9).unwrap();
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.items.len(), 2);
    }

    #[test]
    fn test_ffi_settings_and_backup() {
        let core = open_database_in_memory().unwrap();
        core.create_patient(input("ana", "100000000000007")).unwrap();

        let mut config: DesktopConfig =
            serde_json::from_str(&core.load_settings_json().unwrap()).unwrap();
        config.institution_name = "UBS Norte".into();
        core.save_settings_json(serde_json::to_string(&config).unwrap())
            .unwrap();

        let backup = core.export_backup().unwrap();
        assert!(backup.file_name.starts_with("sismed-backup-"));
        assert!(backup.json.contains("UBS Norte"));

        assert_eq!(core.system_summary().unwrap().patients, 1);
        core.clear_all_data().unwrap();
        assert_eq!(core.system_summary().unwrap().patients, 0);
    }

    #[test]
    fn test_ffi_init_logging_is_repeatable() {
        init_logging(false);
        init_logging(true);
    }

    #[test]
    fn test_ffi_cns_helpers() {
        assert!(is_valid_cns("898 0000 0000 0002".into()));
        assert_eq!(format_cns("898000000000002".into()), "898 0000 0000 0002");
    }
}
