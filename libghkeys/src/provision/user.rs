// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

use tracing::instrument;

use crate::config::UserProvisioner;
use crate::error::Error;

/// Options passed to the account-creation facility along with the username.
///
/// By default the home directory is created and the user is not added to
/// any supplementary group.
///
/// # Example
///
/// ```
/// # use libghkeys::AccountOptions;
/// let options = AccountOptions::default().with_groups(["wheel".to_string()]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct AccountOptions {
    pub(crate) create_home: bool,
    pub(crate) groups: Vec<String>,
}

impl Default for AccountOptions {
    fn default() -> Self {
        Self {
            create_home: true,
            groups: vec![],
        }
    }
}

impl AccountOptions {
    /// Whether to ask the facility to create the home directory.
    pub fn with_create_home(mut self, create_home: bool) -> Self {
        self.create_home = create_home;
        self
    }

    /// A list of supplemental group names to add the user to.
    ///
    /// If any of the groups do not exist on the host, account creation will
    /// fail.
    pub fn with_groups(mut self, groups: impl Into<Vec<String>>) -> Self {
        self.groups = groups.into();
        self
    }
}

impl UserProvisioner {
    /// Create the account `username` using this backend.
    ///
    /// - `Useradd`: runs `useradd`, found on `PATH`, homing the account at
    ///   `<home_base>/<username>`. A missing executable,
    ///   a failure to spawn it, or a non-zero exit status are all errors. An
    ///   account that already exists is not special-cased; `useradd` rejects
    ///   it and that rejection is returned.
    /// - `FakeUseradd` (test only): creates the home directory under
    ///   `home_base` and succeeds.
    /// - `FailingUseradd` (test only): always fails like a rejected `useradd`.
    pub(crate) fn create(
        &self,
        username: &str,
        options: &AccountOptions,
        home_base: &Path,
    ) -> Result<(), Error> {
        match self {
            Self::Useradd => useradd(username, options, home_base),
            #[cfg(test)]
            Self::FakeUseradd => {
                if options.create_home {
                    std::fs::create_dir_all(home_base.join(username))?;
                }
                Ok(())
            }
            #[cfg(test)]
            Self::FailingUseradd => {
                use std::os::unix::process::ExitStatusExt;
                Err(Error::SubprocessFailed {
                    command: "useradd".to_string(),
                    status: std::process::ExitStatus::from_raw(9 << 8),
                })
            }
        }
    }

    /// Resolve the account `username` to its uid, gid and home directory.
    ///
    /// `FakeUseradd` resolves every name to the uid and gid of the current
    /// user, homed under `home_base`, so ownership changes succeed without
    /// privileges.
    pub(crate) fn lookup(
        &self,
        username: &str,
        #[allow(unused_variables)] home_base: &Path,
    ) -> Result<nix::unistd::User, Error> {
        match self {
            #[cfg(test)]
            Self::FakeUseradd | Self::FailingUseradd => {
                let mut user =
                    nix::unistd::User::from_uid(nix::unistd::getuid())?
                        .ok_or(Error::UserMissing {
                            user: username.to_string(),
                        })?;
                user.name = username.to_string();
                user.dir = home_base.join(username);
                Ok(user)
            }
            _ => nix::unistd::User::from_name(username)?.ok_or(
                Error::UserMissing {
                    user: username.to_string(),
                },
            ),
        }
    }
}

/// Build the `useradd` invocation for `username`, homed at
/// `<home_base>/<username>`.
fn useradd_command(
    path_useradd: &Path,
    username: &str,
    options: &AccountOptions,
    home_base: &Path,
) -> Command {
    let mut command = Command::new(path_useradd);
    command.arg("-d").arg(home_base.join(username));
    if options.create_home {
        command.arg("-m");
    }
    if !options.groups.is_empty() {
        command.arg("--groups").arg(options.groups.join(","));
    }
    command.arg(username);
    command
}

#[instrument(skip(options))]
fn useradd(
    username: &str,
    options: &AccountOptions,
    home_base: &Path,
) -> Result<(), Error> {
    tracing::info!(
        target: "libghkeys::user::add",
        "Adding Unix user {}",
        username
    );

    let path_useradd = Path::new(env!("PATH_USERADD"));
    run_useradd(useradd_command(path_useradd, username, options, home_base))
}

/// Run `command`, reporting a program missing from `PATH` as
/// [`Error::CommandNotFound`].
fn run_useradd(command: Command) -> Result<(), Error> {
    let program = command.get_program().to_string_lossy().to_string();
    crate::run(command).map_err(|error| match error {
        Error::Io(e) if e.kind() == ErrorKind::NotFound => {
            Error::CommandNotFound { command: program }
        }
        other => other,
    })
}
