// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use libghkeys::{config::Config, config::FailurePolicy, parse_usernames, Provision};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT_HASH"),
    ")"
);

/// Create Unix accounts for GitHub users and install their public SSH keys
/// as authorized_keys.
#[derive(Parser, Debug)]
#[command(version = VERSION, about, long_about = None)]
struct Cli {
    /// GitHub usernames, either as one comma-separated list or as separate
    /// arguments.
    #[arg(value_name = "USERNAMES")]
    usernames: Vec<String>,

    /// Supplementary groups to add the new accounts to, comma-separated.
    /// Overrides `user.groups` from the configuration.
    #[arg(short = 'g', long, value_delimiter = ',')]
    groups: Option<Vec<String>>,

    /// Path to a configuration file or a directory containing
    /// ghkeys-init.toml and ghkeys-init.d/.
    #[arg(short = 'c', long, env = "GHKEYS_INIT_CONFIG")]
    config: Option<PathBuf>,

    /// Stop processing the remaining users after the first failure.
    #[arg(long)]
    fail_fast: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let opts = Cli::parse();

    let config =
        logging::with_bootstrap_logging(|| Config::load(opts.config.as_deref()));

    if let Err(error) = logging::setup_layers(config.as_ref().ok()) {
        eprintln!("Failed to set up logging: {error:?}");
    }

    tracing::info!("ghkeys-init version {VERSION}");

    let config = match config {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(?error, "Failed to load configuration");
            return ExitCode::from(exitcode::CONFIG as u8);
        }
    };

    let usernames = match parse_usernames(&opts.usernames) {
        Ok(usernames) => usernames,
        Err(error) => {
            tracing::error!("{error}");
            return ExitCode::from(exitcode::USAGE as u8);
        }
    };

    match provision(config, &opts, &usernames).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(exitcode::SOFTWARE as u8),
        Err(error) => {
            tracing::error!("Provisioning failed: {error:?}");
            ExitCode::from(exitcode::SOFTWARE as u8)
        }
    }
}

/// Provision every user; `Ok(false)` means at least one of them failed.
async fn provision(
    config: Config,
    opts: &Cli,
    usernames: &[String],
) -> Result<bool, anyhow::Error> {
    let mut provision = Provision::new(config);
    if let Some(groups) = &opts.groups {
        provision = provision.with_groups(groups.clone());
    }
    if opts.fail_fast {
        provision = provision.with_failure_policy(FailurePolicy::Abort);
    }

    let report = provision
        .run(usernames)
        .await
        .context("Failed to set up the HTTP client")?;

    println!(
        "{} provisioned, {} skipped, {} failed",
        report.provisioned(),
        report.skipped(),
        report.failed()
    );

    Ok(report.is_success())
}
