//! Logging setup.
//!
//! Everything in the crate logs through `tracing`; the host decides whether a
//! subscriber is installed.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Info and above.
    #[default]
    Normal,
    /// Debug and above.
    Verbose,
}

impl Verbosity {
    pub fn level(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
        }
    }

    /// Default filter directive for this crate.
    pub fn directive(&self) -> String {
        format!("sismed_core={}", self.level())
    }
}

/// Install the global subscriber with a default filter for this crate.
///
/// `RUST_LOG` takes precedence. Calling this again is harmless.
pub fn init_logging(verbosity: Verbosity) {
    init_with_filter(&verbosity.directive());
}

/// Install the global subscriber with an explicit filter directive.
pub fn init_with_filter(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_thread_ids(false));

    // Already installed by the host or an earlier call
    let _ = subscriber.try_init();
}
