use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

const LOG_FILE_PREFIX: &str = "lotto-backend";
const MAX_LOG_FILES: usize = 30;

/// Install the global subscriber: human-readable stdout, plus a daily-rolling
/// JSON file when `ENABLE_FILE_LOGS` is set. Safe to call more than once; a
/// later call leaves the already-installed subscriber in place.
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true));

    let installed = if config.enable_file_logs {
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix("log")
            .max_log_files(MAX_LOG_FILES)
            .build(&config.log_dir)
            .expect("Failed to create rolling file appender");
        registry
            .with(fmt::layer().with_writer(appender).with_ansi(false).json())
            .try_init()
    } else {
        registry.try_init()
    };

    if let Err(e) = installed {
        // A subscriber installed earlier (tests, embedding) is expected;
        // any other first-install failure is fatal.
        if !e.to_string().contains("already been set") {
            panic!("Failed to initialize tracing: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_leaves_existing_subscriber() {
        let config = Config::from_env();
        init_tracing(&config);
        init_tracing(&config);
    }
}
