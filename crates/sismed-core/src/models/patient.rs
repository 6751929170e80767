//! Patient models.

use serde::{Deserialize, Deserializer, Serialize};

use crate::cns;

/// A registered patient, as persisted in the `sismed-patients` slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Opaque identifier, assigned once at creation
    pub id: String,
    /// Full name, upper case
    pub name: String,
    /// Birth date (ISO 8601, `YYYY-MM-DD`)
    pub birth_date: String,
    /// CNS, digits only
    pub cns: String,
    /// Phone number, free text
    #[serde(default, deserialize_with = "null_as_empty")]
    pub phone: String,
    /// Address, free text
    #[serde(default, deserialize_with = "null_as_empty")]
    pub address: String,
}

/// Every patient field except the id. Input for create and update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PatientFields {
    pub name: String,
    pub birth_date: String,
    pub cns: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub phone: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub address: String,
}

/// Older records store unset contact fields as `null`.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl PatientFields {
    /// Create fields with the required values and empty contact details.
    pub fn new(
        name: impl Into<String>,
        birth_date: impl Into<String>,
        cns: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            birth_date: birth_date.into(),
            cns: cns.into(),
            phone: String::new(),
            address: String::new(),
        }
    }

    /// Storage form: name trimmed and upper case, CNS digits only.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_uppercase(),
            cns: cns::digits_only(&self.cns),
            ..self
        }
    }
}

impl Patient {
    /// Build a patient from already normalized fields.
    pub fn from_fields(id: String, fields: PatientFields) -> Self {
        Self {
            id,
            name: fields.name,
            birth_date: fields.birth_date,
            cns: fields.cns,
            phone: fields.phone,
            address: fields.address,
        }
    }

    /// Copy of everything but the id, e.g. to seed an edit form.
    pub fn fields(&self) -> PatientFields {
        PatientFields {
            name: self.name.clone(),
            birth_date: self.birth_date.clone(),
            cns: self.cns.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
        }
    }

    /// CNS grouped for display.
    pub fn formatted_cns(&self) -> String {
        cns::format(&self.cns)
    }
}
