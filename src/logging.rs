// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fs::{OpenOptions, Permissions};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tracing::{event, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, EnvFilter, Layer, Registry,
};

use libghkeys::config::{Config, DEFAULT_GHKEYS_INIT_LOG_PATH};

/// Environment variable holding the `EnvFilter` directives for all layers.
pub const GHKEYS_INIT_LOG_ENV: &str = "GHKEYS_INIT_LOG";

fn env_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var(GHKEYS_INIT_LOG_ENV)
        .from_env_lossy()
}

/// Runs `f` with a scoped `stderr` subscriber.
///
/// Used for configuration loading, which has to happen before the global
/// subscriber can be built from the configured log path.
pub fn with_bootstrap_logging<T>(f: impl FnOnce() -> T) -> T {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter());
    let subscriber = Registry::default().with(stderr_layer);

    tracing::subscriber::with_default(subscriber, f)
}

/// Builds and installs the global `tracing` subscriber.
///
/// Events always go to `stderr`. They are also appended to a log file at
/// `config.log.path`, or `DEFAULT_GHKEYS_INIT_LOG_PATH` when no
/// configuration could be loaded; if that file cannot be opened, logging
/// continues on `stderr` only.
pub fn setup_layers(
    config: Option<&Config>,
) -> Result<(), Box<dyn std::error::Error>> {
    let stderr_layer = fmt::layer()
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .with_filter(env_filter());

    let log_path = config
        .map(|cfg| cfg.log.path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_GHKEYS_INIT_LOG_PATH));

    let mut deferred_warning = None;
    let file_layer = match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => {
            if let Err(e) = file.set_permissions(Permissions::from_mode(0o600))
            {
                deferred_warning = Some(format!(
                    "Failed to set permissions on {}: {}.",
                    log_path.display(),
                    e,
                ));
            }

            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
                    .with_writer(file)
                    .with_filter(env_filter()),
            )
        }
        Err(e) => {
            deferred_warning = Some(format!(
                "Could not open configured log file {}: {}. Continuing without file logging.",
                log_path.display(),
                e
            ));

            None
        }
    };

    let subscriber = Registry::default().with(stderr_layer).with(file_layer);

    tracing::subscriber::set_global_default(subscriber)?;

    if let Some(warning) = deferred_warning {
        event!(Level::WARN, "{}", warning);
    }

    Ok(())
}
