// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.
pub mod ssh;
pub mod user;

use crate::config::{Config, FailurePolicy, UserProvisioner};
use crate::error::Error;
use crate::github::KeyListing;
use crate::http;
use user::AccountOptions;
use tracing::instrument;

/// What happened to one username during a run.
#[derive(Debug)]
pub enum ProvisionOutcome {
    /// The account was created and its keys installed. `keys_complete` is
    /// false when copying the key listing failed part way.
    Provisioned { keys_complete: bool },
    /// GitHub did not answer with a key listing; nothing was done.
    Skipped,
    /// Provisioning stopped at the first failing step.
    Failed(Error),
}

/// Per-username outcomes of a run, in input order.
#[derive(Debug, Default)]
pub struct ProvisionReport {
    pub outcomes: Vec<(String, ProvisionOutcome)>,
}

impl ProvisionReport {
    pub fn provisioned(&self) -> usize {
        self.count(|o| matches!(o, ProvisionOutcome::Provisioned { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ProvisionOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ProvisionOutcome::Failed(_)))
    }

    /// True when no username failed. Skipped usernames are not failures.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn outcome(&self, username: &str) -> Option<&ProvisionOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == username)
            .map(|(_, outcome)| outcome)
    }

    fn count(&self, f: impl Fn(&ProvisionOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| f(o)).count()
    }
}

/// The interface for provisioning GitHub users on the host.
///
/// For every username, in order: check the key listing exists, create the
/// account, create its `.ssh` directory, fetch the key listing into
/// `authorized_keys`, and hand both over to the new account. Nothing is
/// undone when a step fails.
///
/// By default a failure only affects its own username and the run moves on
/// to the next one; with [`FailurePolicy::Abort`] the remaining usernames are
/// left untouched.
#[derive(Clone)]
pub struct Provision {
    config: Config,
    options: AccountOptions,
}

impl Provision {
    pub fn new(config: Config) -> Self {
        let options = AccountOptions::default()
            .with_create_home(config.user.create_home)
            .with_groups(config.user.groups.clone());
        Self { config, options }
    }

    /// Override the supplementary groups from the configuration.
    pub fn with_groups(mut self, groups: impl Into<Vec<String>>) -> Self {
        self.options = self.options.with_groups(groups);
        self
    }

    /// Override the failure policy from the configuration.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.provisioning.failure_policy = policy;
        self
    }

    /// Provision every username in turn and report what happened to each.
    ///
    /// Only a failure to build the HTTP client is returned as an error;
    /// everything else ends up in the report.
    #[instrument(skip_all)]
    pub async fn run(
        &self,
        usernames: &[String],
    ) -> Result<ProvisionReport, Error> {
        let client = http::client(self.config.github.request_timeout())?;
        let listing = KeyListing::new(client, &self.config.github.base_url);

        let mut report = ProvisionReport::default();
        for username in usernames {
            let outcome = match self.provision_user(&listing, username).await
            {
                Ok(outcome) => outcome,
                Err(error) => {
                    tracing::error!(
                        ?error,
                        "Failed to provision user {}",
                        username
                    );
                    ProvisionOutcome::Failed(error)
                }
            };

            let abort = matches!(outcome, ProvisionOutcome::Failed(_))
                && self.config.provisioning.failure_policy
                    == FailurePolicy::Abort;
            report.outcomes.push((username.clone(), outcome));

            if abort {
                tracing::warn!(
                    "Aborting; {} remaining user(s) not processed",
                    usernames.len() - report.outcomes.len()
                );
                break;
            }
        }

        tracing::info!(
            target: "libghkeys::provision::summary",
            provisioned = report.provisioned(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Provisioning finished"
        );
        for (username, outcome) in &report.outcomes {
            if let ProvisionOutcome::Failed(error) = outcome {
                tracing::info!(
                    target: "libghkeys::provision::summary",
                    "{}: {} ({})",
                    username,
                    error.reason(),
                    error
                );
            }
        }

        Ok(report)
    }

    /// Run the whole pipeline for one username.
    #[instrument(skip(self, listing))]
    pub async fn provision_user(
        &self,
        listing: &KeyListing,
        username: &str,
    ) -> Result<ProvisionOutcome, Error> {
        if !listing.check_username(username).await? {
            return Ok(ProvisionOutcome::Skipped);
        }

        let home_base = &self.config.ssh.home_base;
        let backend = self.create_user(username)?;

        let home = home_base.join(username);
        ssh::create_ssh_dir(&home)?;
        let keys_complete = listing
            .fetch_keys(username, &ssh::authorized_keys_path(&home))
            .await?;

        let account = backend.lookup(username, home_base)?;
        ssh::fix_permissions(&account)?;

        Ok(ProvisionOutcome::Provisioned { keys_complete })
    }

    /// Iterates through the configured user provisioners and creates the
    /// account with the first backend that succeeds, returning that backend.
    ///
    /// # Errors
    ///
    /// With a single backend its own error is returned. Returns
    /// [`Error::NoUserProvisioner`] if no backend is configured or if several
    /// were tried and all of them failed.
    #[instrument(skip(self))]
    fn create_user(&self, username: &str) -> Result<UserProvisioner, Error> {
        let home_base = &self.config.ssh.home_base;
        let mut last_error = None;
        let mut attempts = 0;

        for backend in &self.config.user_provisioners.backends {
            attempts += 1;
            match backend.create(username, &self.options, home_base) {
                Ok(()) => return Ok(*backend),
                Err(error) => {
                    tracing::warn!(
                        ?error,
                        ?backend,
                        "User provisioner failed"
                    );
                    last_error = Some(error);
                }
            }
        }

        match last_error {
            Some(error) if attempts == 1 => Err(error),
            _ => Err(Error::NoUserProvisioner),
        }
    }
}
