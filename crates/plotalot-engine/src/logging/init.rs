use std::sync::Once;

use log::LevelFilter;

/// How the global logger is set up by [`init_logging`].
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Explicit filter in `env_logger` syntax, e.g. `"plotalot_engine=debug,winit=warn"`.
    /// Takes precedence over `RUST_LOG`.
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    /// Level used when neither `env_filter` nor `RUST_LOG` is set.
    pub default_level: LevelFilter,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            default_level: LevelFilter::Info,
        }
    }
}

/// Where the effective filter came from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FilterSource {
    Config(String),
    Env(String),
    Level(LevelFilter),
}

impl LoggingConfig {
    fn filter_source(&self, rust_log: Option<String>) -> FilterSource {
        match (&self.env_filter, rust_log) {
            (Some(filter), _) => FilterSource::Config(filter.clone()),
            (None, Some(filter)) if !filter.trim().is_empty() => FilterSource::Env(filter),
            _ => FilterSource::Level(self.default_level),
        }
    }
}

static INIT: Once = Once::new();

/// Installs `env_logger` as the `log` backend.
///
/// Only the first call has any effect. If another logger is already installed
/// (a test harness, an embedding binary) it is left in place.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let source = config.filter_source(std::env::var("RUST_LOG").ok());

        let mut builder = env_logger::Builder::new();
        match &source {
            FilterSource::Config(filter) | FilterSource::Env(filter) => {
                builder.parse_filters(filter);
            }
            FilterSource::Level(level) => {
                builder.filter_level(*level);
            }
        }
        builder.write_style(config.write_style);

        if builder.try_init().is_ok() {
            log::debug!("logging initialized ({source:?})");
        }
    });
}
