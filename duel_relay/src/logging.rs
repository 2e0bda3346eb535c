// Tracing subscriber setup for the `relay` binary.
//
// `RUST_LOG` wins when set; otherwise the configured level is used as the
// filter. Library code only emits `tracing` events and never installs a
// subscriber, so embedding the relay (tests, other binaries) stays quiet
// unless the host opts in.

use tracing::info;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

use crate::config::LoggingSettings;

/// Install the global subscriber. Fails if one is already installed.
pub fn setup_logging(settings: &LoggingSettings) -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));
    let registry = tracing_subscriber::registry().with(filter);

    if settings.json_format {
        registry
            .with(fmt::layer().json().with_file(false).with_line_number(false))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_target(false).with_line_number(false))
            .try_init()?;
    }

    info!(level = %settings.level, json = settings.json_format, "logging initialized");
    Ok(())
}
