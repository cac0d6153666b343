//! Logging setup for keyed-injector
//!
//! The container emits structured `tracing` events under the
//! `keyed_injector` target: registrations at debug, cache hits and
//! constructions at trace. This module bootstraps a subscriber for
//! applications that do not install their own.
//!
//! # Features
//!
//! - `logging` - emit events (default)
//! - `logging-json` - JSON output (production)
//! - `logging-pretty` - colorful output (development)
//!
//! # Example
//!
//! ```rust,ignore
//! use keyed_injector::logging;
//!
//! logging::init_pretty();
//!
//! // Or configure explicitly
//! logging::builder()
//!     .with_level(tracing::Level::TRACE)
//!     .di_only()
//!     .json()
//!     .init();
//! ```

#[cfg(feature = "logging")]
use tracing::Level;

/// Logging output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON structured output
    #[default]
    Json,
    /// Pretty colorful output
    Pretty,
    /// Compact single-line output
    Compact,
}

/// Builder for logging configuration
#[cfg(feature = "logging")]
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
    with_thread_ids: bool,
}

#[cfg(feature = "logging")]
impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Json,
            target: None,
            with_thread_ids: false,
        }
    }
}

#[cfg(feature = "logging")]
impl LoggingBuilder {
    /// Create a builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum log level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set log level to TRACE (most verbose)
    pub fn trace(mut self) -> Self {
        self.level = Level::TRACE;
        self
    }

    /// Set log level to DEBUG
    pub fn debug(mut self) -> Self {
        self.level = Level::DEBUG;
        self
    }

    /// Set log level to INFO
    pub fn info(mut self) -> Self {
        self.level = Level::INFO;
        self
    }

    /// Filter to a specific target
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    /// Only show keyed-injector events
    pub fn di_only(self) -> Self {
        self.with_target_filter("keyed_injector")
    }

    /// Include thread ids in output; useful when debugging thread-local
    /// lifetimes
    pub fn with_thread_ids(mut self) -> Self {
        self.with_thread_ids = true;
        self
    }

    /// Use JSON output
    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    /// Use pretty output
    pub fn pretty(mut self) -> Self {
        self.format = LogFormat::Pretty;
        self
    }

    /// Use compact output
    pub fn compact(mut self) -> Self {
        self.format = LogFormat::Compact;
        self
    }

    /// Install the subscriber
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn init(self) {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let filter = if let Some(target) = self.target {
            EnvFilter::new(format!("{}={}", target, self.level))
        } else {
            EnvFilter::new(self.level.to_string())
        };

        match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => {
                let layer = fmt::layer()
                    .json()
                    .with_thread_ids(self.with_thread_ids)
                    .with_target(true);
                tracing_subscriber::registry().with(filter).with(layer).init();
            }
            #[cfg(not(feature = "logging-json"))]
            LogFormat::Json => {
                let layer = fmt::layer()
                    .with_thread_ids(self.with_thread_ids)
                    .with_target(true);
                tracing_subscriber::registry().with(filter).with(layer).init();
            }
            LogFormat::Pretty => {
                let layer = fmt::layer()
                    .pretty()
                    .with_thread_ids(self.with_thread_ids)
                    .with_target(true);
                tracing_subscriber::registry().with(filter).with(layer).init();
            }
            LogFormat::Compact => {
                let layer = fmt::layer()
                    .compact()
                    .with_thread_ids(self.with_thread_ids)
                    .with_target(true);
                tracing_subscriber::registry().with(filter).with(layer).init();
            }
        }
    }

    /// Install the subscriber (no-op without a subscriber feature)
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn init(self) {
        // Requires logging-json or logging-pretty
    }
}

/// Create a logging builder
#[cfg(feature = "logging")]
pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Initialize JSON structured logging at debug level
#[cfg(feature = "logging")]
pub fn init_json() {
    builder().json().init();
}

/// Initialize pretty logging at debug level
#[cfg(feature = "logging")]
pub fn init_pretty() {
    builder().pretty().init();
}

/// Initialize logging for keyed-injector events only
#[cfg(feature = "logging")]
pub fn init_di_only() {
    builder().di_only().init();
}
