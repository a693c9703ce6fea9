//! Logging configuration for tedana-gear.
//!
//! Initialization for the tracing-based logging system. Gear logs are the
//! only place the platform surfaces tedana's own output, so the subscriber
//! prints targets and stays on stdout.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Suppress all output except errors.
    Quiet,
    /// Normal output level (info and above).
    #[default]
    Normal,
    /// Verbose output (debug and above).
    Verbose,
    /// Very verbose output (trace level).
    Trace,
}

impl Verbosity {
    /// Convert verbosity to a tracing level filter.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Raise the level when the gear's `debug` config flag is set.
    ///
    /// CLI flags still win: an explicit `-q` or `-v` is left untouched.
    #[must_use]
    pub fn with_debug_flag(self, debug: bool) -> Self {
        if debug && self == Self::Normal {
            Self::Verbose
        } else {
            self
        }
    }
}

/// Initialize the logging system.
///
/// This should be called once at startup. The level can be controlled via
/// the `verbosity` parameter or overridden entirely with `RUST_LOG`.
pub fn init_logging(verbosity: Verbosity) {
    let default_filter = format!("tedana_gear={}", verbosity.to_level_filter());

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    );

    // Ignore the error if a subscriber is already installed (tests).
    let _ = subscriber.try_init();
}
