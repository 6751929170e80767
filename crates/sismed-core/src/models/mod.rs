//! Domain models for SISMED.

mod patient;
mod settings;

pub use patient::*;
pub use settings::*;
