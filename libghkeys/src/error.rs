// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Set of error codes that can be used by libghkeys.
///
/// # Example
///
/// ```rust
/// # use libghkeys::error::Error;
/// # use std::process::Command;
///
/// fn run_ls() -> Result<(), Error> {
///     let ls_status = Command::new("ls").arg("/tmp").status()?;
///     if !ls_status.success() {
///         Err(Error::SubprocessFailed {
///             command: "ls".to_string(),
///             status: ls_status,
///         })
///     } else {
///         Ok(())
///     }
/// }
///
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("HTTP client error occurred: {0}")]
    Http(#[from] reqwest::Error),
    #[error("An I/O error occurred: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP request did not succeed (HTTP {status} from {endpoint})")]
    HttpStatus {
        endpoint: String,
        status: reqwest::StatusCode,
    },
    #[error("executing {command} failed: {status}")]
    SubprocessFailed {
        command: String,
        status: std::process::ExitStatus,
    },
    #[error("unable to find {command} on PATH")]
    CommandNotFound { command: String },
    #[error("nix call failed: {0}")]
    Nix(#[from] nix::errno::Errno),
    #[error("The user {user} does not exist")]
    UserMissing { user: String },
    #[error("You must provide at least one GitHub username.  Usernames can be provided either as a comma-separated list or as separate arguments.")]
    NoUsernames,
    #[error(
        "Failed to create a user; none of the provided backends succeeded"
    )]
    NoUserProvisioner,
    #[error("Unable to load configuration: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl From<figment::Error> for Error {
    fn from(error: figment::Error) -> Self {
        Self::Config(Box::new(error))
    }
}

impl Error {
    /// Returns a concise, fixed string describing the failure, used in the
    /// end-of-run summary.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Http(_) => "HTTP error",
            Self::Io(_) => "I/O error",
            Self::HttpStatus { .. } => "http status error",
            Self::SubprocessFailed { .. } => "subprocess failed",
            Self::CommandNotFound { .. } => "command not found",
            Self::Nix(_) => "system call failed",
            Self::UserMissing { .. } => "user not found",
            Self::NoUsernames => "no usernames provided",
            Self::NoUserProvisioner => "failed to provision user",
            Self::Config(_) => "invalid configuration",
        }
    }
}
