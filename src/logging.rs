//! Subscriber setup for the container's tracing output
//!
//! The container emits events under the `service_container` target whenever
//! the `logging` feature is on. Installing a subscriber to print them needs
//! `logging-json` or `logging-pretty`; without either, the `init` functions
//! do nothing.
//!
//! ```rust,ignore
//! use service_container::logging;
//!
//! logging::init_pretty();
//!
//! logging::builder()
//!     .trace()
//!     .container_only()
//!     .with_thread_names()
//!     .compact()
//!     .init();
//! ```

use tracing::Level;

/// Target used by every event the container emits
pub const TARGET: &str = "service_container";

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    /// Multi-line, colored
    Pretty,
    /// Single line per event
    Compact,
}

/// Builder for the subscriber installed by [`init`] and friends
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
    file: bool,
    line_number: bool,
    thread_names: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::default(),
            target: None,
            file: false,
            line_number: false,
            thread_names: false,
        }
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn trace(self) -> Self {
        self.with_level(Level::TRACE)
    }

    pub fn debug(self) -> Self {
        self.with_level(Level::DEBUG)
    }

    pub fn info(self) -> Self {
        self.with_level(Level::INFO)
    }

    /// Only let events from `target` through
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    /// Only let the container's own events through
    pub fn container_only(self) -> Self {
        self.with_target_filter(TARGET)
    }

    pub fn with_file(mut self) -> Self {
        self.file = true;
        self
    }

    pub fn with_line_number(mut self) -> Self {
        self.line_number = true;
        self
    }

    pub fn with_thread_names(mut self) -> Self {
        self.thread_names = true;
        self
    }

    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.format = LogFormat::Pretty;
        self
    }

    pub fn compact(mut self) -> Self {
        self.format = LogFormat::Compact;
        self
    }

    /// Filter directive this builder installs, in `EnvFilter` syntax
    pub fn directive(&self) -> String {
        match self.target {
            Some(target) => format!("{}={}", target, self.level),
            None => self.level.to_string(),
        }
    }

    /// Install the subscriber globally.
    ///
    /// Fails if a global subscriber is already set.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn try_init(self) -> Result<(), tracing_subscriber::util::TryInitError> {
        use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

        let filter = EnvFilter::new(self.directive());
        let base = fmt::layer()
            .with_file(self.file)
            .with_line_number(self.line_number)
            .with_thread_names(self.thread_names)
            .with_target(true);

        let layer: Box<dyn Layer<Registry> + Send + Sync> = match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => base.json().boxed(),
            // Plain text when JSON support is not compiled in
            #[cfg(not(feature = "logging-json"))]
            LogFormat::Json => base.boxed(),
            LogFormat::Pretty => base.pretty().boxed(),
            LogFormat::Compact => base.compact().boxed(),
        };

        tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init()
    }

    /// Install the subscriber globally, ignoring an already-installed one.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// No-op without a subscriber feature
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn init(self) {}
}

/// Create a new logging builder
pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Install a subscriber with default settings.
///
/// JSON when `logging-json` is enabled, pretty otherwise.
pub fn init() {
    #[cfg(feature = "logging-json")]
    init_json();
    #[cfg(not(feature = "logging-json"))]
    init_pretty();
}

/// Install a JSON subscriber at DEBUG.
///
/// ```json
/// {"timestamp":"2026-01-01T00:00:00.000Z","level":"DEBUG","fields":{"message":"Registering service","service":"app::Mailer","lifetime":"singleton"},"target":"service_container"}
/// ```
pub fn init_json() {
    builder().json().debug().init();
}

/// Install a pretty subscriber at DEBUG.
pub fn init_pretty() {
    builder().pretty().debug().init();
}

/// Install a subscriber that shows only the container's events.
pub fn init_container_only() {
    builder().container_only().debug().init();
}
