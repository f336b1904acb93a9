// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::process::Command;

mod args;
pub use args::parse_usernames;

pub mod config;
pub mod error;
pub mod github;
pub(crate) mod http;

mod provision;
pub use provision::{
    user::AccountOptions, Provision, ProvisionOutcome, ProvisionReport,
};

#[cfg(test)]
mod unittest;

// Re-export as the Client is used in our API.
pub use reqwest;

/// Run a command to completion, returning an error if it exits unsuccessfully.
fn run(mut command: Command) -> Result<(), error::Error> {
    let program = command.get_program().to_string_lossy().to_string();
    let output = command.output()?;

    tracing::info!(
        target: "libghkeys::run",
        ?command,
        status = %output.status,
        stdout = %String::from_utf8_lossy(&output.stdout),
        stderr = %String::from_utf8_lossy(&output.stderr),
        "{} finished",
        program
    );

    if output.status.success() {
        Ok(())
    } else {
        Err(error::Error::SubprocessFailed {
            command: program,
            status: output.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::process::Command;

    use crate::error::Error;

    #[test]
    fn run_reports_exit_status() {
        assert!(super::run(Command::new("true")).is_ok());

        match super::run(Command::new("false")) {
            Err(Error::SubprocessFailed { command, status }) => {
                assert_eq!(command, "false");
                assert_eq!(status.code(), Some(1));
            }
            other => panic!("expected a subprocess failure, got {other:?}"),
        }
    }

    #[test]
    fn run_missing_program_is_io_error() {
        let result = super::run(Command::new("i_sure_hope_this_binary_doesnt_exist"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
