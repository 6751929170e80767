//! Desktop settings models.
//!
//! Field names on the wire follow the keys the desktop shell has always
//! written to `sismed-desktop-config`.

use serde::{Deserialize, Serialize};

/// Accepted prescription validity periods, in months.
pub const VALIDITY_MONTH_OPTIONS: [u32; 3] = [3, 6, 12];

/// Accepted automatic backup intervals, in hours.
pub const BACKUP_INTERVAL_OPTIONS: [u32; 3] = [1, 6, 24];

/// UI theme.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Auto,
}

/// Settings for the desktop application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DesktopConfig {
    pub theme: Theme,
    /// Institution printed on documents
    pub institution_name: String,
    pub logo_url: String,
    pub auto_save: bool,
    pub window_start_maximized: bool,
    pub notifications: bool,
    #[serde(rename = "receitas")]
    pub prescriptions: PrescriptionSettings,
    pub backup: BackupSettings,
}

/// Defaults applied to new prescriptions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PrescriptionSettings {
    #[serde(rename = "templatePadrao")]
    pub default_template: String,
    #[serde(rename = "observacoesPadrao")]
    pub default_notes: String,
    /// Validity in months (3, 6 or 12)
    #[serde(rename = "validadeMeses")]
    pub validity_months: u32,
    /// Print the ICD (CID) code
    #[serde(rename = "incluirCID")]
    pub include_icd: bool,
}

/// Automatic backup settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BackupSettings {
    pub auto_backup: bool,
    /// Hours between backups (1, 6 or 24)
    pub backup_interval: u32,
    pub backup_path: String,
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            institution_name: "Secretaria Municipal de Saúde de Perobal".to_string(),
            logo_url: "/lovable-uploads/b954f439-274b-409b-9378-b06f8008eb70.png".to_string(),
            auto_save: true,
            window_start_maximized: true,
            notifications: true,
            prescriptions: PrescriptionSettings::default(),
            backup: BackupSettings::default(),
        }
    }
}

impl Default for PrescriptionSettings {
    fn default() -> Self {
        Self {
            default_template: "Receita Médica Padrão".to_string(),
            default_notes: "Uso conforme orientação médica.".to_string(),
            validity_months: 6,
            include_icd: false,
        }
    }
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            auto_backup: true,
            backup_interval: 24,
            backup_path: "Documents/SISMED/Backups".to_string(),
        }
    }
}
