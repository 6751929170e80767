//! Patient repository.
//!
//! Owns the canonical patient list. The list is loaded from the
//! `sismed-patients` slot when the repository is opened and rewritten in full
//! after every successful mutation, before control returns to the caller.
//!
//! A slot that exists but cannot be loaded is never rewritten: the repository
//! opens empty and every mutation fails with [`StorageError::Unloaded`].

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cns;
use crate::models::{Patient, PatientFields};
use crate::storage::{keys, KeyValueStore, LocalStorage, StorageError};

/// Rejections raised before any state changes.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid CNS: must be 15 digits passing the checksum")]
    InvalidCns,

    #[error("a patient with this CNS is already registered")]
    DuplicateCns,
}

/// Patient repository errors.
#[derive(Error, Debug)]
pub enum PatientError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Patient not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl PatientError {
    /// Message shown to clinic staff at the point of the failed action.
    pub fn user_message(&self) -> String {
        match self {
            PatientError::Validation(ValidationError::InvalidCns) => {
                "CNS inválido. Deve ter 15 dígitos válidos.".to_string()
            }
            PatientError::Validation(ValidationError::DuplicateCns) => {
                "Já existe um paciente cadastrado com este CNS.".to_string()
            }
            PatientError::NotFound(_) => "Paciente não encontrado.".to_string(),
            PatientError::Storage(e) => format!("Falha ao salvar os dados: {}", e),
        }
    }
}

pub type PatientResult<T> = Result<T, PatientError>;

/// CRUD over the persisted patient list.
pub struct PatientRepository<'a, S> {
    storage: &'a mut LocalStorage<S>,
    patients: Vec<Patient>,
    /// Why the stored list could not be loaded, if it could not
    load_error: Option<String>,
}

impl<'a, S: KeyValueStore> PatientRepository<'a, S> {
    /// Load the current list from storage.
    pub fn open(storage: &'a mut LocalStorage<S>) -> Self {
        let (patients, load_error) = match storage.read_strict::<Vec<Patient>>(keys::PATIENTS) {
            Ok(list) => (list.unwrap_or_default(), None),
            Err(e) => {
                warn!(error = %e, "Patient list could not be loaded, writes disabled");
                (Vec::new(), Some(e.to_string()))
            }
        };
        debug!(count = patients.len(), "Patient list loaded");
        Self {
            storage,
            patients,
            load_error,
        }
    }

    /// Whether the stored list failed to load. Mutations are refused until
    /// the slot is repaired.
    pub fn is_read_only(&self) -> bool {
        self.load_error.is_some()
    }

    /// All patients in insertion order.
    pub fn list(&self) -> &[Patient] {
        &self.patients
    }

    /// Get a patient by id.
    pub fn get(&self, id: &str) -> Option<&Patient> {
        self.patients.iter().find(|p| p.id == id)
    }

    /// Number of registered patients.
    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    /// Register a new patient.
    pub fn create(&mut self, fields: PatientFields) -> PatientResult<Patient> {
        let fields = fields.normalized();
        self.validate(&fields, None)?;

        let patient = Patient::from_fields(self.next_id(), fields);
        self.patients.push(patient.clone());
        if let Err(e) = self.persist() {
            self.patients.pop();
            return Err(e.into());
        }

        info!(id = %patient.id, "Patient created");
        Ok(patient)
    }

    /// Replace every field of patient `id` except the id itself.
    pub fn update(&mut self, id: &str, fields: PatientFields) -> PatientResult<Patient> {
        let index = self
            .patients
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| PatientError::NotFound(id.to_string()))?;

        let fields = fields.normalized();
        self.validate(&fields, Some(id))?;

        let updated = Patient::from_fields(id.to_string(), fields);
        let previous = std::mem::replace(&mut self.patients[index], updated.clone());
        if let Err(e) = self.persist() {
            self.patients[index] = previous;
            return Err(e.into());
        }

        info!(id, "Patient updated");
        Ok(updated)
    }

    /// Remove patient `id`. Removing an unknown id succeeds without writing.
    pub fn delete(&mut self, id: &str) -> PatientResult<()> {
        let Some(index) = self.patients.iter().position(|p| p.id == id) else {
            debug!(id, "Delete of unknown patient ignored");
            return Ok(());
        };

        let removed = self.patients.remove(index);
        if let Err(e) = self.persist() {
            self.patients.insert(index, removed);
            return Err(e.into());
        }

        info!(id, "Patient deleted");
        Ok(())
    }

    /// Check CNS validity and uniqueness, ignoring the record `exclude_id`.
    fn validate(&self, fields: &PatientFields, exclude_id: Option<&str>) -> PatientResult<()> {
        if !cns::is_valid(&fields.cns) {
            debug!("Rejected patient with invalid CNS");
            return Err(ValidationError::InvalidCns.into());
        }

        let duplicate = self
            .patients
            .iter()
            .any(|p| Some(p.id.as_str()) != exclude_id && cns::digits_only(&p.cns) == fields.cns);
        if duplicate {
            debug!("Rejected patient with duplicate CNS");
            return Err(ValidationError::DuplicateCns.into());
        }

        Ok(())
    }

    /// Fresh id not held by any current record.
    fn next_id(&self) -> String {
        loop {
            let id = uuid::Uuid::new_v4().to_string();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    fn persist(&mut self) -> Result<(), StorageError> {
        if let Some(reason) = &self.load_error {
            return Err(StorageError::Unloaded {
                key: keys::PATIENTS.to_string(),
                reason: reason.clone(),
            });
        }
        self.storage.write(keys::PATIENTS, &self.patients)
    }
}
